//! Chunked byte queue with head-of-line asynchronous reads.
//!
//! Producers [`push`](ByteQueue::push) chunks of arbitrary size. Consumers
//! either [`shift`](ByteQueue::shift) whatever is available right now, or
//! [`take`](ByteQueue::take) a future that resolves once exactly `n` bytes can
//! be handed out. Pending takes are served strictly in registration order.

use crate::error::Error;
use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Reply = Result<Bytes, Error>;

struct PendingRead {
    len: usize,
    tx: oneshot::Sender<Reply>,
}

/// Ordered buffer of byte chunks plus a FIFO of pending reads.
///
/// `len()` always equals the sum of the lengths of the buffered chunks.
#[derive(Default)]
pub struct ByteQueue {
    chunks: VecDeque<Bytes>,
    len: usize,
    waiters: VecDeque<PendingRead>,
    closed: bool,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether at least `n` bytes are buffered.
    pub fn has(&self, n: usize) -> bool {
        n <= self.len
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of registered reads still waiting for data.
    pub fn pending(&self) -> usize {
        self.waiters.iter().filter(|w| !w.tx.is_closed()).count()
    }

    /// Append a chunk to the end of the stream and serve any waiters it unblocks.
    ///
    /// The queue takes ownership of the chunk. Pushing to a closed queue is a no-op.
    pub fn push(&mut self, chunk: impl Into<Bytes>) {
        let chunk = chunk.into();
        if self.closed {
            warn!("Dropping {} bytes pushed to a closed queue", chunk.len());
            return;
        }
        trace!("push {} bytes ({} buffered)", chunk.len(), self.len);
        if !chunk.is_empty() {
            self.len += chunk.len();
            self.chunks.push_back(chunk);
        }
        self.dispatch();
    }

    /// Remove up to `n` bytes from the front of the stream.
    ///
    /// Returns fewer bytes than requested (possibly none) when not enough are
    /// buffered. Never blocks and never fails.
    pub fn shift(&mut self, n: usize) -> Bytes {
        let n = n.min(self.len);
        if n == 0 {
            return Bytes::new();
        }

        let first_len = self.chunks.front().map_or(0, Bytes::len);
        if n > first_len {
            return self.shift_merged(n);
        }

        let taken = if n == first_len {
            self.chunks.pop_front().unwrap_or_default()
        } else {
            // Both halves keep pointing into the same allocation.
            self.chunks
                .front_mut()
                .map(|front| front.split_to(n))
                .unwrap_or_default()
        };
        self.len -= taken.len();
        taken
    }

    /// Return every buffered byte as one chunk and leave the queue empty.
    ///
    /// Pending reads are left untouched.
    pub fn drain(&mut self) -> Bytes {
        if self.chunks.len() == 1 {
            self.len = 0;
            return self.chunks.pop_front().unwrap_or_default();
        }
        self.concat().freeze()
    }

    /// Discard every buffered byte. Pending reads are left untouched.
    pub fn empty(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Fail every pending read with [`Error::Closed`] and stop accepting data.
    ///
    /// Buffered bytes remain readable through `shift`, `drain` and `take`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(
            "Closing queue with {} bytes buffered, rejecting {} pending reads",
            self.len,
            self.waiters.len()
        );
        for waiter in self.waiters.drain(..) {
            let _ = waiter.tx.send(Err(Error::Closed));
        }
    }

    /// Register a read of exactly `n` bytes.
    ///
    /// The returned future resolves once the read reaches the head of the
    /// FIFO and `n` bytes are buffered. On a closed queue it resolves at once:
    /// with the bytes if they are already buffered, with [`Error::Closed`]
    /// otherwise. Dropping the future withdraws the read.
    pub fn take(&mut self, n: usize) -> Take {
        let (tx, rx) = oneshot::channel();
        if self.closed {
            // close() emptied the FIFO, so nothing is queued ahead of this read.
            let reply = if self.has(n) {
                Ok(self.shift(n))
            } else {
                Err(Error::Closed)
            };
            let _ = tx.send(reply);
            return Take { rx };
        }
        self.prune_withdrawn();
        self.waiters.push_back(PendingRead { len: n, tx });
        self.dispatch();
        Take { rx }
    }

    /// Serve waiters from the head of the FIFO while the head can be satisfied.
    fn dispatch(&mut self) {
        while let Some(head) = self.waiters.front() {
            if head.tx.is_closed() {
                trace!("Discarding withdrawn read of {} bytes", head.len);
                self.waiters.pop_front();
                continue;
            }
            if !self.has(head.len) {
                break;
            }
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            let data = self.shift(waiter.len);
            trace!("Fulfilled read of {} bytes ({} left)", data.len(), self.len);
            if let Err(Ok(data)) = waiter.tx.send(Ok(data)) {
                // Receiver dropped on another thread after the check above.
                self.unshift(data);
            }
        }
    }

    /// Forget reads whose `Take` was dropped, wherever they sit in the FIFO.
    fn prune_withdrawn(&mut self) {
        let before = self.waiters.len();
        self.waiters.retain(|w| !w.tx.is_closed());
        if self.waiters.len() < before {
            trace!("Pruned {} withdrawn reads", before - self.waiters.len());
        }
    }

    fn shift_merged(&mut self, n: usize) -> Bytes {
        let mut rest = self.concat();
        let front = rest.split_to(n).freeze();
        if !rest.is_empty() {
            self.len = rest.len();
            self.chunks.push_back(rest.freeze());
        }
        front
    }

    fn unshift(&mut self, data: Bytes) {
        if !data.is_empty() {
            self.len += data.len();
            self.chunks.push_front(data);
        }
    }

    fn concat(&mut self) -> BytesMut {
        let mut data = BytesMut::with_capacity(self.len);
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk);
        }
        self.len = 0;
        data
    }
}

impl fmt::Debug for ByteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteQueue")
            .field("len", &self.len)
            .field("chunks", &self.chunks.len())
            .field("waiters", &self.waiters.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Future returned by [`ByteQueue::take`].
///
/// Resolves with exactly the requested number of bytes, or with
/// [`Error::Closed`] if the queue is closed or dropped first.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct Take {
    rx: oneshot::Receiver<Reply>,
}

impl Future for Take {
    type Output = Reply;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(reply)) => Poll::Ready(reply),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
