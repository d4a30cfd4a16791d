pub mod sessions;
pub mod watch;
