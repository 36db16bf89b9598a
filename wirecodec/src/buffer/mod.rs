//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Buffer abstractions shared by every codec.
//!
//! Codecs never see the transport's concrete buffer types. They write into an
//! [`OutputBuf`] and read from an [`InputBuf`]:
//!
//! - **[`OutputBuf`]**: a writable stream view over an outbound buffer. It is
//!   implemented for [`bytes::BytesMut`] (a live network buffer), `Vec<u8>` and
//!   the per-thread [`ScratchBuf`].
//! - **[`InputBuf`]**: a readable view over an inbound buffer plus a `release`
//!   operation that hands the storage back to the transport.
//!
//! Inbound buffers are released exactly once per decode. [`ReleaseGuard`] owns
//! the buffer for the duration of the call and releases it when dropped, so the
//! release happens on success, on error, and during unwinding alike.
//!
//! # Example
//!
//! ```rust
//! use wirecodec::buffer::{InboundBuf, InputBuf, ReleaseGuard};
//!
//! let inbound = InboundBuf::from(vec![1, 2, 3]);
//! let guard = ReleaseGuard::new(inbound);
//! assert_eq!(guard.chunk(), &[1, 2, 3]);
//! // `guard` releases the buffer when it goes out of scope.
//! ```

pub mod pool;
pub mod scratch;

pub use pool::FramePool;
pub use scratch::{ScratchBuf, ScratchPool, ScratchStats};

use bytes::{BufMut, Bytes, BytesMut};
use std::io;
use std::sync::Arc;

/// A writable sink bound to an outbound buffer.
///
/// The writer returned by [`OutputBuf::writer`] borrows the buffer for the
/// duration of one encode call only; codecs must not keep it afterwards.
pub trait OutputBuf {
    /// Writer that appends to this buffer.
    type Writer<'a>: io::Write
    where
        Self: 'a;

    /// Returns a writer that appends to the end of the buffer.
    fn writer(&mut self) -> Self::Writer<'_>;

    /// Number of bytes currently held by the buffer.
    fn written(&self) -> usize;
}

impl OutputBuf for BytesMut {
    type Writer<'a> = bytes::buf::Writer<&'a mut BytesMut>;

    fn writer(&mut self) -> Self::Writer<'_> {
        BufMut::writer(self)
    }

    fn written(&self) -> usize {
        self.len()
    }
}

impl OutputBuf for Vec<u8> {
    type Writer<'a> = &'a mut Vec<u8>;

    fn writer(&mut self) -> Self::Writer<'_> {
        self
    }

    fn written(&self) -> usize {
        self.len()
    }
}

/// A readable source bound to an inbound buffer.
///
/// Implementations hand their storage back to the transport in
/// [`InputBuf::release`]. Codecs take input sources by value and call
/// `release` exactly once through a [`ReleaseGuard`].
pub trait InputBuf {
    /// The readable bytes of the buffer.
    fn chunk(&self) -> &[u8];

    /// Returns the underlying storage to its owner.
    fn release(&mut self);
}

impl InputBuf for Bytes {
    fn chunk(&self) -> &[u8] {
        self
    }

    fn release(&mut self) {
        // Dropping our handle is the release for reference-counted bytes.
        *self = Bytes::new();
    }
}

/// Scoped ownership of an [`InputBuf`] that releases it on drop.
pub struct ReleaseGuard<I: InputBuf> {
    inner: I,
}

impl<I: InputBuf> ReleaseGuard<I> {
    /// Takes ownership of `inner` until the guard is dropped.
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    /// The readable bytes of the guarded buffer.
    pub fn chunk(&self) -> &[u8] {
        self.inner.chunk()
    }
}

impl<I: InputBuf> Drop for ReleaseGuard<I> {
    fn drop(&mut self) {
        self.inner.release();
    }
}

/// An inbound frame body, optionally owned by a [`FramePool`].
///
/// Releasing a pooled buffer returns its storage to the pool so the next frame
/// read can reuse the allocation. Releasing twice is harmless; only the first
/// call has an effect. A buffer dropped without an explicit release is
/// released by its destructor.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use wirecodec::buffer::{FramePool, InboundBuf, InputBuf};
///
/// let pool = Arc::new(FramePool::new());
/// let mut inbound = InboundBuf::pooled(b"payload".to_vec(), Arc::clone(&pool));
/// assert_eq!(inbound.chunk(), b"payload");
/// inbound.release();
/// assert!(inbound.is_released());
/// ```
#[derive(Debug)]
pub struct InboundBuf {
    data: Vec<u8>,
    pool: Option<Arc<FramePool>>,
    released: bool,
}

impl InboundBuf {
    /// Wraps storage that should go back to `pool` when released.
    #[must_use]
    pub fn pooled(data: Vec<u8>, pool: Arc<FramePool>) -> Self {
        Self {
            data,
            pool: Some(pool),
            released: false,
        }
    }

    /// Returns `true` once the buffer has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Number of readable bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no readable bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Copies the readable bytes out and releases the buffer.
    pub fn into_bytes(mut self) -> Bytes {
        let bytes = Bytes::copy_from_slice(&self.data);
        self.release();
        bytes
    }
}

impl From<Vec<u8>> for InboundBuf {
    fn from(data: Vec<u8>) -> Self {
        Self {
            data,
            pool: None,
            released: false,
        }
    }
}

impl InputBuf for InboundBuf {
    fn chunk(&self) -> &[u8] {
        &self.data
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let data = std::mem::take(&mut self.data);
        if let Some(pool) = self.pool.take() {
            pool.recycle(data);
        }
    }
}

impl Drop for InboundBuf {
    fn drop(&mut self) {
        self.release();
    }
}
