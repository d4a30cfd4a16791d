//! The in-memory session list.
//!
//! `SessionList` never holds two entries with the same id. Every insertion
//! path goes through the same first-seen-wins rule, so concurrent refreshes
//! from several views merge instead of duplicating rows.

use super::model::SessionSummary;
use crate::error::{Result, SyncError};
use std::collections::HashSet;

/// What `set_pinned` changed, so a failed server call can put it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinUndo {
    pub session_id: String,
    pub index: usize,
    pub pinned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionList {
    entries: Vec<SessionSummary>,
    next_page: u32,
    exhausted: bool,
}

impl SessionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SessionSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionSummary> {
        self.entries.iter().find(|s| s.session_id == session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.position(session_id).is_some()
    }

    /// Appends a batch, keeping the first-seen entry for every id.
    ///
    /// Duplicates within the batch itself are dropped the same way.
    /// Returns the number of entries actually added.
    pub fn merge(&mut self, batch: Vec<SessionSummary>) -> usize {
        let mut seen: HashSet<String> =
            self.entries.iter().map(|s| s.session_id.clone()).collect();
        let mut added = 0;
        for summary in batch {
            if seen.insert(summary.session_id.clone()) {
                self.entries.push(summary);
                added += 1;
            } else {
                tracing::debug!(
                    "[SessionList] Dropping duplicate entry for session {}",
                    summary.session_id
                );
            }
        }
        added
    }

    /// Merges a re-fetched first page into the list.
    ///
    /// Nothing already listed is dropped: pages loaded earlier, sessions a
    /// view listed, and local edits all survive. Sessions not listed yet are
    /// placed in server order after the leading placeholders and pinned
    /// entries. Returns the number of entries added.
    pub fn merge_first_page(&mut self, first_page: Vec<SessionSummary>, has_next: bool) -> usize {
        if self.next_page == 0 {
            return self.record_page(first_page, has_next);
        }
        let mut seen: HashSet<String> =
            self.entries.iter().map(|s| s.session_id.clone()).collect();
        let fresh: Vec<SessionSummary> = first_page
            .into_iter()
            .filter(|s| seen.insert(s.session_id.clone()))
            .collect();
        let at = self
            .entries
            .iter()
            .take_while(|s| s.is_placeholder() || s.pinned)
            .count();
        let added = fresh.len();
        let rest = self.entries.split_off(at);
        self.entries.extend(fresh);
        self.entries.extend(rest);
        added
    }

    /// Replaces the list with a fresh first page from the server.
    ///
    /// Placeholders for creations still in flight are kept at the front.
    pub fn reset_with(&mut self, first_page: Vec<SessionSummary>, has_next: bool) {
        self.entries.retain(SessionSummary::is_placeholder);
        self.next_page = 0;
        self.exhausted = false;
        self.record_page(first_page, has_next);
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Zero-based index of the next page to request.
    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    /// False once the server reported no more pages or returned an empty page.
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    /// Records that a page was fetched and merges its sessions.
    ///
    /// "No next page" and "empty page" are independent stop conditions, so an
    /// inconsistent `has_next = true` with no sessions still ends pagination.
    pub fn record_page(&mut self, sessions: Vec<SessionSummary>, has_next: bool) -> usize {
        let empty = sessions.is_empty();
        let added = self.merge(sessions);
        self.next_page += 1;
        if !has_next || empty {
            self.exhausted = true;
        }
        added
    }

    // ========================================================================
    // Optimistic create
    // ========================================================================

    /// Shows a locally fabricated entry at the top of the list.
    pub fn prepend_placeholder(&mut self, placeholder: SessionSummary) {
        if self.contains(&placeholder.session_id) {
            return;
        }
        self.entries.insert(0, placeholder);
    }

    /// Swaps a placeholder for the server-confirmed session, in place.
    ///
    /// If the confirmed id is already listed (a refresh raced the creation),
    /// the placeholder is dropped instead so the id stays unique. If the
    /// placeholder is gone, the confirmed session is listed at the front.
    /// Returns false in that last case.
    pub fn confirm_placeholder(&mut self, placeholder_id: &str, confirmed: SessionSummary) -> bool {
        let Some(index) = self.position(placeholder_id) else {
            self.upsert_front(confirmed);
            return false;
        };
        if self.contains(&confirmed.session_id) {
            self.entries.remove(index);
        } else {
            self.entries[index] = confirmed;
        }
        true
    }

    // ========================================================================
    // Local edits
    // ========================================================================

    /// Removes a session locally. Returns the removed entry.
    pub fn forget(&mut self, session_id: &str) -> Option<SessionSummary> {
        let index = self.position(session_id)?;
        Some(self.entries.remove(index))
    }

    /// Inserts a session at the front unless it is already listed.
    pub fn upsert_front(&mut self, summary: SessionSummary) -> bool {
        if self.contains(&summary.session_id) {
            return false;
        }
        self.entries.insert(0, summary);
        true
    }

    /// Sets the display name, returning the previous one.
    pub fn rename(
        &mut self,
        session_id: &str,
        display_name: Option<String>,
    ) -> Result<Option<String>> {
        let entry = self
            .entries
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| SyncError::not_found("Session", session_id))?;
        Ok(std::mem::replace(&mut entry.display_name, display_name))
    }

    /// Sets the pinned flag. Pinning also moves the entry to the front,
    /// keeping the relative order of all other entries.
    pub fn set_pinned(&mut self, session_id: &str, pinned: bool) -> Result<PinUndo> {
        let index = self
            .position(session_id)
            .ok_or_else(|| SyncError::not_found("Session", session_id))?;
        let undo = PinUndo {
            session_id: session_id.to_string(),
            index,
            pinned: self.entries[index].pinned,
        };
        self.entries[index].pinned = pinned;
        if pinned && index > 0 {
            let entry = self.entries.remove(index);
            self.entries.insert(0, entry);
        }
        Ok(undo)
    }

    /// Reverts a `set_pinned`. No-op if the entry disappeared meanwhile.
    pub fn restore_pin(&mut self, undo: PinUndo) {
        let Some(index) = self.position(&undo.session_id) else {
            return;
        };
        let mut entry = self.entries.remove(index);
        entry.pinned = undo.pinned;
        let target = undo.index.min(self.entries.len());
        self.entries.insert(target, entry);
    }

    fn position(&self, session_id: &str) -> Option<usize> {
        self.entries.iter().position(|s| s.session_id == session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    fn summary(id: &str, input: &str) -> SessionSummary {
        SessionSummary::new(id, SessionStatus::Completed, input)
    }

    fn ids(list: &SessionList) -> Vec<&str> {
        list.entries().iter().map(|s| s.session_id.as_str()).collect()
    }

    #[test]
    fn test_merge_keeps_first_seen() {
        let mut list = SessionList::new();
        let added = list.merge(vec![summary("a", "first"), summary("a", "second")]);

        assert_eq!(added, 1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.get("a").unwrap().user_input, "first");

        list.merge(vec![summary("b", "b"), summary("a", "third")]);
        assert_eq!(ids(&list), vec!["a", "b"]);
        assert_eq!(list.get("a").unwrap().user_input, "first");
    }

    #[test]
    fn test_pagination_stops_on_has_next_false() {
        let mut list = SessionList::new();
        list.record_page(vec![summary("a", "")], true);
        assert!(list.has_more());
        assert_eq!(list.next_page(), 1);

        list.record_page(vec![summary("b", "")], false);
        assert!(!list.has_more());
    }

    #[test]
    fn test_pagination_stops_on_empty_page() {
        let mut list = SessionList::new();
        list.record_page(vec![summary("a", "")], true);
        list.record_page(Vec::new(), true);
        assert!(!list.has_more());
    }

    #[test]
    fn test_optimistic_create_confirmed() {
        let mut list = SessionList::new();
        list.merge(vec![summary("old", "")]);
        let placeholder = SessionSummary::placeholder("new analysis");
        let placeholder_id = placeholder.session_id.clone();
        list.prepend_placeholder(placeholder);
        assert_eq!(list.entries()[0].session_id, placeholder_id);

        assert!(list.confirm_placeholder(&placeholder_id, summary("abc123", "new analysis")));

        assert_eq!(ids(&list), vec!["abc123", "old"]);
        assert!(list.entries().iter().all(|s| !s.is_placeholder()));
    }

    #[test]
    fn test_confirm_when_refresh_already_listed_real_id() {
        let mut list = SessionList::new();
        let placeholder = SessionSummary::placeholder("x");
        let placeholder_id = placeholder.session_id.clone();
        list.prepend_placeholder(placeholder);
        list.merge(vec![summary("abc123", "x")]);

        list.confirm_placeholder(&placeholder_id, summary("abc123", "x"));

        assert_eq!(ids(&list), vec!["abc123"]);
    }

    #[test]
    fn test_failed_create_removes_placeholder() {
        let mut list = SessionList::new();
        let placeholder = SessionSummary::placeholder("x");
        let placeholder_id = placeholder.session_id.clone();
        list.prepend_placeholder(placeholder);

        assert!(list.forget(&placeholder_id).is_some());
        assert!(list.is_empty());
    }

    #[test]
    fn test_pin_moves_to_front_stably() {
        let mut list = SessionList::new();
        list.merge(vec![
            summary("a", ""),
            summary("b", ""),
            summary("c", ""),
            summary("d", ""),
        ]);

        let undo = list.set_pinned("c", true).unwrap();

        assert_eq!(ids(&list), vec!["c", "a", "b", "d"]);
        assert!(list.get("c").unwrap().pinned);

        list.restore_pin(undo);
        assert_eq!(ids(&list), vec!["a", "b", "c", "d"]);
        assert!(!list.get("c").unwrap().pinned);
    }

    #[test]
    fn test_rename_returns_previous() {
        let mut list = SessionList::new();
        list.merge(vec![summary("a", "")]);

        let previous = list.rename("a", Some("Renamed".to_string())).unwrap();
        assert_eq!(previous, None);
        assert_eq!(list.get("a").unwrap().title(), "Renamed");

        assert!(list.rename("missing", None).unwrap_err().is_not_found());
    }

    #[test]
    fn test_reset_keeps_in_flight_placeholders() {
        let mut list = SessionList::new();
        list.record_page(vec![summary("a", ""), summary("b", "")], false);
        let placeholder = SessionSummary::placeholder("x");
        let placeholder_id = placeholder.session_id.clone();
        list.prepend_placeholder(placeholder);

        list.reset_with(vec![summary("b", "")], true);

        assert_eq!(ids(&list), vec![placeholder_id.as_str(), "b"]);
        assert_eq!(list.next_page(), 1);
        assert!(list.has_more());
    }

    #[test]
    fn test_first_page_merge_keeps_loaded_pages() {
        let mut list = SessionList::new();
        list.record_page(vec![summary("a", ""), summary("b", "")], true);
        list.record_page(vec![summary("c", "")], false);
        list.upsert_front(summary("v", ""));

        let added = list.merge_first_page(vec![summary("a", "changed"), summary("b", "")], true);

        assert_eq!(added, 0);
        assert_eq!(ids(&list), vec!["v", "a", "b", "c"]);
        assert_eq!(list.get("a").unwrap().user_input, "");
        assert_eq!(list.next_page(), 2);
        assert!(!list.has_more());
    }

    #[test]
    fn test_first_page_merge_lists_new_sessions_after_pins() {
        let mut list = SessionList::new();
        list.record_page(vec![summary("a", ""), summary("b", "")], false);
        list.set_pinned("b", true).unwrap();

        let added = list.merge_first_page(vec![summary("n", ""), summary("a", "")], false);

        assert_eq!(added, 1);
        assert_eq!(ids(&list), vec!["b", "n", "a"]);
    }

    #[test]
    fn test_first_page_merge_on_empty_list_records_page() {
        let mut list = SessionList::new();
        list.merge_first_page(vec![summary("a", "")], true);
        assert_eq!(list.next_page(), 1);
        assert!(list.has_more());
    }

    #[test]
    fn test_confirm_without_placeholder_still_lists_session() {
        let mut list = SessionList::new();
        list.merge(vec![summary("old", "")]);

        assert!(!list.confirm_placeholder("local-gone", summary("abc123", "x")));

        assert_eq!(ids(&list), vec!["abc123", "old"]);
    }

    #[test]
    fn test_upsert_front() {
        let mut list = SessionList::new();
        list.merge(vec![summary("a", "")]);
        assert!(list.upsert_front(summary("z", "")));
        assert!(!list.upsert_front(summary("a", "other")));
        assert_eq!(ids(&list), vec!["z", "a"]);
    }
}
