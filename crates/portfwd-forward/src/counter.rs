//! Per-forward connection counter.
//!
//! Every forwarded connection runs two pipes, one per direction, and each
//! pipe bumps the counter when it starts and when it ends. Counts are only
//! reported when the pipe count is even, halved, so the UI sees whole
//! connections.

use parking_lot::Mutex;

use portfwd_core::{RuntimeEvent, RuntimeSender};

#[derive(Debug, Default)]
struct CounterState {
    /// Open pipes.
    open: i64,
    /// Pipes ever started.
    total: i64,
    cancelled: bool,
}

pub struct Counter {
    index: i64,
    events: RuntimeSender,
    state: Mutex<CounterState>,
}

impl Counter {
    pub fn new(index: i64, events: RuntimeSender) -> Self {
        Self {
            index,
            events,
            state: Mutex::new(CounterState::default()),
        }
    }

    /// A pipe started.
    pub fn inc(&self) {
        let mut state = self.state.lock();
        if state.cancelled {
            return;
        }
        state.open += 1;
        state.total += 1;
        self.notify(&state);
    }

    /// A pipe ended.
    pub fn dec(&self) {
        let mut state = self.state.lock();
        if state.cancelled {
            return;
        }
        state.open -= 1;
        self.notify(&state);
    }

    /// Stop reporting. Later `inc`/`dec` calls are ignored.
    pub fn cancel(&self) {
        self.state.lock().cancelled = true;
    }

    /// Currently open connections.
    pub fn current(&self) -> i64 {
        self.state.lock().open / 2
    }

    fn notify(&self, state: &CounterState) {
        if state.open % 2 == 0 {
            RuntimeEvent::ConnectionCount {
                index: self.index,
                current: state.open / 2,
                total: state.total / 2,
            }
            .send(&self.events);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfwd_core::{runtime_channel, RuntimeReceiver};

    fn drain(rx: &mut RuntimeReceiver) -> Vec<RuntimeEvent> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(RuntimeEvent::from_message(&msg).unwrap().unwrap());
        }
        out
    }

    fn count(index: i64, current: i64, total: i64) -> RuntimeEvent {
        RuntimeEvent::ConnectionCount {
            index,
            current,
            total,
        }
    }

    #[test]
    fn test_reports_whole_connections() {
        let (tx, mut rx) = runtime_channel();
        let counter = Counter::new(3, tx);

        // one connection opens (two pipes)
        counter.inc();
        counter.inc();
        assert_eq!(counter.current(), 1);
        // a second one
        counter.inc();
        counter.inc();
        // first closes
        counter.dec();
        counter.dec();

        assert_eq!(
            drain(&mut rx),
            vec![count(3, 1, 1), count(3, 2, 2), count(3, 1, 2)]
        );
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn test_cancelled_counter_is_silent() {
        let (tx, mut rx) = runtime_channel();
        let counter = Counter::new(0, tx);

        counter.inc();
        counter.cancel();
        counter.inc();
        counter.dec();
        counter.dec();

        assert!(drain(&mut rx).is_empty());
        assert_eq!(counter.current(), 0);
    }
}
