//! Sink for notification records.

use agora_types::ProtocolEvent;

/// Append-only destination for [`ProtocolEvent`]s.
///
/// Engines call `record` only after an operation has committed.
pub trait EventSink: Send + Sync {
    fn record(&self, event: ProtocolEvent);
}
