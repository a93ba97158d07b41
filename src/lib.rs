//! Byte-stream buffering queue.
//!
//! [`ByteQueue`] decouples producers of arbitrarily sized byte chunks from
//! consumers that need exactly `n` bytes at a time. Reads are either
//! synchronous and possibly short ([`ByteQueue::shift`]) or asynchronous and
//! exact ([`ByteQueue::take`]); asynchronous reads are served strictly in the
//! order they were registered.
//!
//!```
//! use bytequeue::ByteQueue;
//! use futures::FutureExt;
//!
//! let mut queue = ByteQueue::new();
//! let record = queue.take(4);
//! queue.push(&b"ab"[..]);
//! queue.push(&b"cdef"[..]);
//!
//! assert_eq!(&record.now_or_never().unwrap().unwrap()[..], b"abcd");
//! assert_eq!(&queue.shift(10)[..], b"ef");
//!```
//!
//! [`SharedByteQueue`] wraps the same queue behind one mutex for use across
//! threads. The [`pump`] and [`sources`] modules drive a queue from async
//! readers and back out as fixed-size records.

pub mod config;
pub mod error;
pub mod pump;
pub mod queue;
pub mod shared;
pub mod sources;

pub use error::Error;
pub use queue::{ByteQueue, Take};
pub use shared::SharedByteQueue;
