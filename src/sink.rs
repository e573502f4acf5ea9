//! Event sinks: where a run's narration goes.
//! Every sink is `Send + Sync` so independent runs may share one.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::events::SimEvent;

/// One-way consumer of narration events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SimEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: &SimEvent) {
        (**self).emit(event)
    }
}

/// Default sink: one rendered line per event on stdout.
/// Holding the stdout lock per line keeps concurrent writers from tearing lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: &SimEvent) {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let _ = writeln!(out, "{event}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &SimEvent) {}
}

/// Adapts a plain text-message callback.
pub struct TextSink<F> {
    callback: F,
}

impl<F> TextSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EventSink for TextSink<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn emit(&self, event: &SimEvent) {
        (self.callback)(&event.to_string());
    }
}

/// Forwards narration into `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SimEvent) {
        let algorithm = event.algorithm.map(|a| a.name()).unwrap_or("-");
        tracing::info!(target: "schedsim::narration", algorithm, "{event}");
    }
}

/// Sends a copy of each event down an unbounded channel.
/// Clones share the receiver, so one host can drain many runs.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SimEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SimEvent>) -> Self {
        Self { tx }
    }

    /// Build a sink together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SimEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &SimEvent) {
        // A host that stopped listening does not affect the run.
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!("narration receiver dropped");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SimEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that panicked mid-push leaves the log intact, so keep reading.
    fn guard(&self) -> MutexGuard<'_, Vec<SimEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.guard().clone()
    }

    /// Rendered lines, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &SimEvent) {
        self.guard().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = Arc::new(MemorySink::new());
        sink.emit(&SimEvent::new(None, EventKind::CycleStarted { cycle: 1 }));

        let writer = sink.clone();
        let result = std::thread::spawn(move || {
            let _held = writer.events.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(sink.events.is_poisoned());

        sink.emit(&SimEvent::new(None, EventKind::CycleStarted { cycle: 2 }));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.lines()[1], "-- Cycle 2 --");
    }
}
