//! External cancellation for blocked channel operations.
//!
//! An [`Interrupt`] plays the role of a pending signal on the calling context:
//! any execution context holding a clone can [`raise`](Interrupt::raise) it,
//! and every read or write issued with that interrupt gives up its lock wait
//! or data wait with [`ChannelError::Interrupted`](crate::ChannelError).
//!
//! # Example
//!
//! ```
//! use revdev::{Interrupt, ReadMode, Session};
//! use std::thread;
//! use std::time::Duration;
//!
//! let session = Session::open(64).unwrap();
//! let interrupt = Interrupt::new();
//!
//! let reader = {
//!     let session = session.clone();
//!     let interrupt = interrupt.clone();
//!     thread::spawn(move || session.read_interruptible(64, ReadMode::Blocking, &interrupt))
//! };
//!
//! thread::sleep(Duration::from_millis(20));
//! interrupt.raise();
//! assert!(reader.join().unwrap().is_err());
//! ```

use crate::gate::WaitQueue;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Cloneable cancellation signal shared between execution contexts.
///
/// Raising is sticky until [`clear`](Interrupt::clear) is called, so a raised
/// interrupt also fails any later blocking call that uses it.
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

#[derive(Default)]
struct InterruptInner {
    raised: AtomicBool,
    next_watch: AtomicU64,
    /// Wait queues with a waiter currently parked on behalf of this interrupt.
    watchers: Mutex<Vec<(u64, Weak<WaitQueue>)>>,
}

impl Interrupt {
    /// Create an interrupt in the lowered state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the interrupt and wake every waiter parked under it.
    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);

        let watchers = self.inner.watchers.lock();
        for (_, queue) in watchers.iter() {
            if let Some(queue) = queue.upgrade() {
                queue.kick();
            }
        }
    }

    /// Lower the interrupt so it can be reused.
    pub fn clear(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
    }

    /// Whether the interrupt is currently raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    /// Register `queue` to be kicked on [`raise`](Interrupt::raise) for as long
    /// as the returned guard lives.
    ///
    /// Must be called before the waiter checks [`is_raised`](Interrupt::is_raised)
    /// under the queue lock, otherwise a raise can slip between the check and
    /// the park.
    pub(crate) fn watch(&self, queue: &Arc<WaitQueue>) -> WatchGuard<'_> {
        let id = self.inner.next_watch.fetch_add(1, Ordering::Relaxed);
        self.inner
            .watchers
            .lock()
            .push((id, Arc::downgrade(queue)));
        WatchGuard {
            interrupt: self,
            id,
        }
    }
}

impl std::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interrupt")
            .field("raised", &self.is_raised())
            .finish()
    }
}

/// Deregisters a wait queue from its interrupt on drop.
pub(crate) struct WatchGuard<'a> {
    interrupt: &'a Interrupt,
    id: u64,
}

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) {
        self.interrupt
            .inner
            .watchers
            .lock()
            .retain(|(id, _)| *id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_and_clear() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_raised());

        let clone = interrupt.clone();
        clone.raise();
        assert!(interrupt.is_raised());

        interrupt.clear();
        assert!(!clone.is_raised());
    }

    #[test]
    fn test_watch_guard_deregisters() {
        let interrupt = Interrupt::new();
        let queue = Arc::new(WaitQueue::new());

        {
            let _first = interrupt.watch(&queue);
            let _second = interrupt.watch(&queue);
            assert_eq!(interrupt.inner.watchers.lock().len(), 2);
        }
        assert!(interrupt.inner.watchers.lock().is_empty());
    }

    #[test]
    fn test_raise_with_dropped_queue_is_harmless() {
        let interrupt = Interrupt::new();
        let queue = Arc::new(WaitQueue::new());
        let guard = interrupt.watch(&queue);
        drop(queue);

        interrupt.raise();
        assert!(interrupt.is_raised());
        drop(guard);
    }
}
