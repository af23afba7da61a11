//! Fixed-capacity single-slot byte store.
//!
//! `BufferStore` owns one byte region plus two offsets into it:
//!
//! ```text
//! 0            cursor               valid_end          capacity
//! |---delivered---|----unread (READY)----|-----unused------|
//! ```
//!
//! The store is a plain value with no synchronization of its own; the
//! [`gate`](crate::gate) module is the only owner that mutates it, and always
//! does so while holding the exclusive lock.
//!
//! Invariant: `0 <= cursor <= valid_end <= capacity`.

use crate::error::{ChannelError, Result};
use crate::transform;
use tracing::{debug, warn};

/// Whether the store has unread bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Every byte of the last payload has been delivered (or none was written).
    Empty,
    /// Some bytes of the last payload are still unread.
    Ready,
}

/// Owned byte region with a valid-length marker and a read cursor.
#[derive(Debug)]
pub struct BufferStore {
    storage: Box<[u8]>,
    valid_end: usize,
    cursor: usize,
}

impl BufferStore {
    /// Allocate a zeroed store of exactly `capacity` bytes.
    ///
    /// Storage is reserved fallibly, so an impossible request surfaces as
    /// [`ChannelError::Allocation`] instead of aborting the process.
    ///
    /// # Errors
    ///
    /// Returns `Allocation` if `capacity` is zero or memory cannot be reserved.
    pub fn allocate(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ChannelError::Allocation { capacity });
        }

        let mut storage = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| ChannelError::Allocation { capacity })?;
        storage.resize(capacity, 0u8);

        debug!(capacity, "buffer allocated");
        Ok(Self {
            storage: storage.into_boxed_slice(),
            valid_end: 0,
            cursor: 0,
        })
    }

    /// Replace the contents with `payload`, reversed.
    ///
    /// The cursor is reset to the start, so any unread part of the previous
    /// payload is lost. Returns the number of bytes accepted.
    ///
    /// # Errors
    ///
    /// Returns `Overflow` if `payload` is longer than the capacity. The store is
    /// left exactly as it was.
    pub fn overwrite(&mut self, payload: &[u8]) -> Result<usize> {
        let capacity = self.capacity();
        if payload.len() > capacity {
            warn!(len = payload.len(), capacity, "rejecting oversize write");
            return Err(ChannelError::Overflow {
                len: payload.len(),
                capacity,
            });
        }

        let len = payload.len();
        self.storage[..len].copy_from_slice(payload);
        self.valid_end = len;
        self.cursor = 0;
        transform::reverse(&mut self.storage, len);
        Ok(len)
    }

    /// Take up to `max_len` unread bytes and advance the cursor past them.
    ///
    /// An empty slice means there is no unread data, not end of stream.
    pub fn take(&mut self, max_len: usize) -> &[u8] {
        let start = self.cursor;
        let end = self.chunk_end(max_len);
        self.cursor = end;
        &self.storage[start..end]
    }

    /// Hand up to `max_len` unread bytes to `deliver`, advancing the cursor
    /// only if delivery succeeds.
    ///
    /// Returns the number of bytes delivered. On error the cursor does not
    /// move, so the same bytes remain readable.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `deliver`.
    pub fn take_with<F>(&mut self, max_len: usize, deliver: F) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        let start = self.cursor;
        let end = self.chunk_end(max_len);
        deliver(&self.storage[start..end])?;
        self.cursor = end;
        Ok(end - start)
    }

    /// Drop the storage. The store reports zero capacity and stays empty.
    pub fn release(&mut self) {
        debug!(capacity = self.storage.len(), "buffer released");
        self.storage = Box::default();
        self.valid_end = 0;
        self.cursor = 0;
    }

    /// Current state derived from the offsets.
    #[must_use]
    pub fn state(&self) -> BufferState {
        if self.cursor == self.valid_end {
            BufferState::Empty
        } else {
            BufferState::Ready
        }
    }

    /// Shorthand for `state() == BufferState::Ready`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == BufferState::Ready
    }

    /// Size of the owned region in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Length of the most recent payload.
    #[must_use]
    pub fn valid_len(&self) -> usize {
        self.valid_end
    }

    /// Bytes of the current payload already delivered.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes of the current payload not yet delivered.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.valid_end - self.cursor
    }

    fn chunk_end(&self, max_len: usize) -> usize {
        self.cursor + max_len.min(self.pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_zero_capacity_fails() {
        let err = BufferStore::allocate(0).unwrap_err();
        assert!(matches!(err, ChannelError::Allocation { capacity: 0 }));
    }

    #[test]
    fn test_allocate_impossible_capacity_fails() {
        let err = BufferStore::allocate(usize::MAX).unwrap_err();
        assert!(matches!(err, ChannelError::Allocation { .. }));
    }

    #[test]
    fn test_new_store_is_empty() {
        let mut store = BufferStore::allocate(16).unwrap();
        assert_eq!(store.capacity(), 16);
        assert_eq!(store.state(), BufferState::Empty);
        assert!(store.take(16).is_empty());
    }

    #[test]
    fn test_overwrite_reverses_and_resets_cursor() {
        let mut store = BufferStore::allocate(8192).unwrap();
        assert_eq!(store.overwrite(b"hello").unwrap(), 5);
        assert_eq!(store.valid_len(), 5);
        assert_eq!(store.cursor(), 0);
        assert!(store.is_ready());
        assert_eq!(store.take(8192), b"olleh");
        assert_eq!(store.state(), BufferState::Empty);
    }

    #[test]
    fn test_overwrite_discards_unread_payload() {
        let mut store = BufferStore::allocate(64).unwrap();
        store.overwrite(b"ab").unwrap();
        store.overwrite(b"cdef").unwrap();
        assert_eq!(store.take(64), b"fedc");
        assert!(store.take(64).is_empty());
    }

    #[test]
    fn test_overwrite_at_exact_capacity() {
        let mut store = BufferStore::allocate(4).unwrap();
        assert_eq!(store.overwrite(b"wxyz").unwrap(), 4);
        assert_eq!(store.take(4), b"zyxw");
    }

    #[test]
    fn test_overflow_leaves_store_unchanged() {
        let mut store = BufferStore::allocate(4).unwrap();
        store.overwrite(b"abc").unwrap();
        let _ = store.take(1);

        let err = store.overwrite(b"too long").unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Overflow {
                len: 8,
                capacity: 4
            }
        ));
        assert_eq!(store.cursor(), 1);
        assert_eq!(store.valid_len(), 3);
        assert_eq!(store.take(4), b"ba");
    }

    #[test]
    fn test_partial_takes_concatenate_to_payload() {
        let mut store = BufferStore::allocate(32).unwrap();
        store.overwrite(b"partial delivery").unwrap();

        let mut collected = Vec::new();
        collected.extend_from_slice(store.take(5));
        assert_eq!(store.pending(), 11);
        collected.extend_from_slice(store.take(11));
        assert_eq!(collected, b"yreviled laitrap");
        assert_eq!(store.state(), BufferState::Empty);
    }

    #[test]
    fn test_empty_overwrite_leaves_store_empty() {
        let mut store = BufferStore::allocate(8).unwrap();
        store.overwrite(b"abc").unwrap();
        assert_eq!(store.overwrite(b"").unwrap(), 0);
        assert_eq!(store.state(), BufferState::Empty);
    }

    #[test]
    fn test_take_with_failure_keeps_cursor() {
        let mut store = BufferStore::allocate(8).unwrap();
        store.overwrite(b"abcd").unwrap();

        let err = store
            .take_with(2, |_| Err(ChannelError::Fault("sink rejected".into())))
            .unwrap_err();
        assert!(matches!(err, ChannelError::Fault(_)));
        assert_eq!(store.cursor(), 0);

        let mut seen = Vec::new();
        let n = store
            .take_with(2, |chunk| {
                seen.extend_from_slice(chunk);
                Ok(())
            })
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(seen, b"dc");
        assert_eq!(store.cursor(), 2);
    }

    #[test]
    fn test_release_drops_storage() {
        let mut store = BufferStore::allocate(8).unwrap();
        store.overwrite(b"abc").unwrap();
        store.release();
        assert_eq!(store.capacity(), 0);
        assert_eq!(store.state(), BufferState::Empty);
        assert!(matches!(
            store.overwrite(b"a"),
            Err(ChannelError::Overflow { .. })
        ));
    }
}
