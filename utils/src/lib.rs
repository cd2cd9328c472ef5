//! Shared utilities for the Agora protocol.

pub mod event_log;
pub mod time;

pub use event_log::EventLog;
pub use time::format_duration;
