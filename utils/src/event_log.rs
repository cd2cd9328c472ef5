//! Append-only notification log with synchronous fan-out.

use agora_gateway::EventSink;
use agora_types::ProtocolEvent;
use std::sync::{Mutex, RwLock};

type Listener = Box<dyn Fn(&ProtocolEvent) + Send + Sync>;

/// Append-only audit log of [`ProtocolEvent`]s.
///
/// Listeners are invoked inline on the recording thread, after the record is
/// appended; keep handlers fast to avoid stalling the engine that emitted it.
pub struct EventLog {
    records: Mutex<Vec<ProtocolEvent>>,
    listeners: RwLock<Vec<Listener>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Listener) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    /// A copy of every record so far, oldest first.
    pub fn records(&self) -> Vec<ProtocolEvent> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Records appended at or after `offset`, for incremental readers.
    pub fn records_since(&self, offset: usize) -> Vec<ProtocolEvent> {
        self.records
            .lock()
            .map(|r| r.get(offset..).map(<[_]>::to_vec).unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn record(&self, event: ProtocolEvent) {
        tracing::trace!(event = event.name(), "notification recorded");
        match self.records.lock() {
            Ok(mut records) => records.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(&event);
            }
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::{ProposalId, WalletAddress};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn canceled(n: u64) -> ProtocolEvent {
        ProtocolEvent::ProposalCanceled {
            proposal: ProposalId::new(n),
            actor: WalletAddress::new("agr_alice"),
        }
    }

    #[test]
    fn records_are_appended_in_order() {
        let log = EventLog::new();
        log.record(canceled(1));
        log.record(canceled(2));
        assert_eq!(log.records(), vec![canceled(1), canceled(2)]);
        assert_eq!(log.records_since(1), vec![canceled(2)]);
        assert!(log.records_since(5).is_empty());
    }

    #[test]
    fn listeners_see_every_record() {
        let log = EventLog::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        log.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        log.record(canceled(1));
        log.record(canceled(2));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
