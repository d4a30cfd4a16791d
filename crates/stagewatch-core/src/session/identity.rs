//! Session id conventions.
//!
//! Two kinds of ids get special treatment on the client:
//! - placeholder ids fabricated locally while a new analysis is being created
//! - derived-session ids, for sessions the backend spawns asynchronously from a
//!   completed one and may still be materializing when first requested

use crate::error::Result;
use regex::Regex;

/// Prefix of locally fabricated placeholder ids.
pub const PLACEHOLDER_PREFIX: &str = "pending-";

/// Default pattern recognizing derived sessions (`<parent>-followup-<n>`).
pub const DEFAULT_DERIVED_PATTERN: &str = r"-followup-\d+$";

/// Creates a fresh placeholder id for an optimistic session entry.
pub fn new_placeholder_id() -> String {
    format!("{}{}", PLACEHOLDER_PREFIX, uuid::Uuid::new_v4())
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

/// Recognizes derived-session ids by naming convention.
#[derive(Debug, Clone)]
pub struct DerivedSessionRule {
    pattern: Regex,
}

impl DerivedSessionRule {
    /// Compiles a rule from a regular expression.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn is_derived(&self, session_id: &str) -> bool {
        self.pattern.is_match(session_id)
    }
}

impl Default for DerivedSessionRule {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_DERIVED_PATTERN).expect("default pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_ids_are_unique_and_recognizable() {
        let a = new_placeholder_id();
        let b = new_placeholder_id();
        assert_ne!(a, b);
        assert!(is_placeholder_id(&a));
        assert!(!is_placeholder_id("abc123"));
    }

    #[test]
    fn test_default_derived_rule() {
        let rule = DerivedSessionRule::default();
        assert!(rule.is_derived("abc123-followup-2"));
        assert!(!rule.is_derived("abc123"));
        assert!(!rule.is_derived("abc123-followup-x"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = DerivedSessionRule::new("(").unwrap_err();
        assert!(matches!(err, crate::SyncError::Config(_)));
    }
}
