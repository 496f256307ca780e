//! Matching reply frames to the request waiting for them.
//!
//! The reader thread publishes every reassembled frame into a single
//! "current frame" slot and hands it to the oldest waiter. Two locks guard
//! the state: the frame slot and the waiter queue. Every path takes the
//! frame slot first.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SyncSender};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// What a waiter receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A complete reply frame.
    Frame(Vec<u8>),
    /// The link went down before a reply arrived.
    Disconnected,
}

/// Completion queue shared by the reader thread and requesters.
#[derive(Debug, Default)]
pub struct Correlator {
    current: Mutex<Option<Vec<u8>>>,
    pending: Mutex<VecDeque<SyncSender<Reply>>>,
}

impl Correlator {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a waiter for the next frame. A frame nobody asked for is
    /// discarded here.
    pub fn register(&self) -> Receiver<Reply> {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut current = self.current.lock();
        if let Some(stale) = current.take() {
            debug!(len = stale.len(), "discarding unsolicited frame");
        }
        self.pending.lock().push_back(tx);
        rx
    }

    /// Publishes a frame and wakes the oldest waiter.
    pub fn complete(&self, frame: Vec<u8>) {
        let mut current = self.current.lock();
        *current = Some(frame);
        let mut pending = self.pending.lock();
        while let Some(tx) = pending.pop_front() {
            let Some(frame) = current.take() else { break };
            match tx.send(Reply::Frame(frame)) {
                Ok(()) => return,
                // waiter gave up; keep the frame for the next one
                Err(mpsc::SendError(Reply::Frame(frame))) => *current = Some(frame),
                Err(_) => {}
            }
        }
        if current.is_some() {
            trace!("frame arrived with no waiter");
        }
    }

    /// Drops queued waiters after a timeout. Late frames are then discarded.
    pub fn abandon(&self) {
        let _current = self.current.lock();
        self.pending.lock().clear();
    }

    /// Fails every waiter with [`Reply::Disconnected`] and clears the slot.
    pub fn cancel_all(&self) {
        let mut current = self.current.lock();
        *current = None;
        let waiters: Vec<_> = self.pending.lock().drain(..).collect();
        if !waiters.is_empty() {
            debug!(count = waiters.len(), "cancelling waiters");
        }
        for tx in waiters {
            let _ = tx.send(Reply::Disconnected);
        }
    }

    /// Number of queued waiters.
    pub fn pending(&self) -> usize {
        let _current = self.current.lock();
        self.pending.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_frame_goes_to_waiter() {
        let c = Correlator::new();
        let rx = c.register();
        c.complete(vec![1, 2, 3]);
        assert_eq!(rx.recv().unwrap(), Reply::Frame(vec![1, 2, 3]));
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn test_waiters_in_order() {
        let c = Correlator::new();
        let first = c.register();
        let second = c.register();
        c.complete(vec![1]);
        c.complete(vec![2]);
        assert_eq!(first.recv().unwrap(), Reply::Frame(vec![1]));
        assert_eq!(second.recv().unwrap(), Reply::Frame(vec![2]));
    }

    #[test]
    fn test_unsolicited_frame_is_dropped() {
        let c = Correlator::new();
        c.complete(vec![9]);
        let rx = c.register();
        c.complete(vec![1]);
        assert_eq!(rx.recv().unwrap(), Reply::Frame(vec![1]));
    }

    #[test]
    fn test_dead_waiter_is_skipped() {
        let c = Correlator::new();
        drop(c.register());
        let live = c.register();
        c.complete(vec![7]);
        assert_eq!(live.recv().unwrap(), Reply::Frame(vec![7]));
    }

    #[test]
    fn test_abandon() {
        let c = Correlator::new();
        let rx = c.register();
        c.abandon();
        assert_eq!(c.pending(), 0);
        c.complete(vec![1]);
        assert!(rx.recv().is_err());
    }

    #[test]
    fn test_cancel_all_unblocks() {
        let c = Arc::new(Correlator::new());
        let rx = c.register();
        let waiter = thread::spawn(move || rx.recv_timeout(Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(20));
        c.cancel_all();
        assert_eq!(waiter.join().unwrap().unwrap(), Reply::Disconnected);
        assert_eq!(c.pending(), 0);
    }
}
