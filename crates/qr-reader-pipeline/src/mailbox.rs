//! Bounded hand-off queue between the recognition thread and its consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::result::Recognition;

/// Counters describing mailbox traffic since construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxStats {
    pub published: u64,
    pub dropped: u64,
}

/// Fixed-capacity FIFO of [`Recognition`]s.
///
/// `publish` never blocks: when the queue is full the new item is dropped and
/// the queued ones are kept. `receive` may be called from any number of
/// threads at once; every item goes to exactly one caller.
#[derive(Debug)]
pub struct Mailbox {
    tx: Sender<Recognition>,
    rx: Receiver<Recognition>,
    capacity: usize,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl Mailbox {
    pub const DEFAULT_CAPACITY: usize = 10;

    /// A capacity of 0 is raised to 1; a rendezvous channel would drop every
    /// publish made while no consumer is waiting.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            capacity,
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue `item` without blocking. Returns `false` if it was dropped.
    pub fn publish(&self, item: Recognition) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::debug!("mailbox full ({}), result dropped ({dropped} total)", self.capacity);
                false
            }
            // Both ends live in `self`.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Wait up to `timeout` for the next result.
    pub fn receive(&self, timeout: Duration) -> Option<Recognition> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn try_receive(&self) -> Option<Recognition> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> MailboxStats {
        MailboxStats {
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Consumer handle onto a reader's mailbox.
///
/// Cheap to clone and `Send + Sync`; hand one to every consumer thread.
#[derive(Clone, Debug)]
pub struct ResultReceiver {
    mailbox: Arc<Mailbox>,
}

impl ResultReceiver {
    pub(crate) fn new(mailbox: Arc<Mailbox>) -> Self {
        Self { mailbox }
    }

    pub fn receive(&self, timeout: Duration) -> Option<Recognition> {
        self.mailbox.receive(timeout)
    }

    pub fn try_receive(&self) -> Option<Recognition> {
        self.mailbox.try_receive()
    }

    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    pub fn stats(&self) -> MailboxStats {
        self.mailbox.stats()
    }
}
