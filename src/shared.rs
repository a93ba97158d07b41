use crate::queue::{ByteQueue, Take};
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable, thread-safe handle to a [`ByteQueue`].
///
/// A single mutex guards the buffered chunks and the waiter FIFO together, so
/// every operation (including the dispatch that follows a push) is atomic with
/// respect to the others.
#[derive(Clone, Debug, Default)]
pub struct SharedByteQueue {
    inner: Arc<Mutex<ByteQueue>>,
}

impl SharedByteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ByteQueue> {
        // Every operation leaves the queue consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, chunk: impl Into<Bytes>) {
        self.lock().push(chunk)
    }

    pub fn has(&self, n: usize) -> bool {
        self.lock().has(n)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().is_closed()
    }

    pub fn pending(&self) -> usize {
        self.lock().pending()
    }

    pub fn shift(&self, n: usize) -> Bytes {
        self.lock().shift(n)
    }

    pub fn drain(&self) -> Bytes {
        self.lock().drain()
    }

    pub fn empty(&self) {
        self.lock().empty()
    }

    pub fn close(&self) {
        self.lock().close()
    }

    /// Register a read of exactly `n` bytes. The lock is released before the
    /// returned future is awaited.
    pub fn take(&self, n: usize) -> Take {
        self.lock().take(n)
    }
}

impl From<ByteQueue> for SharedByteQueue {
    fn from(queue: ByteQueue) -> Self {
        Self {
            inner: Arc::new(Mutex::new(queue)),
        }
    }
}
