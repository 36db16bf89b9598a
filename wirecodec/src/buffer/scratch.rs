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

//! Per-thread scratch buffers for standalone encodes.
//!
//! When a codec is asked for an owned byte vector rather than a write into a
//! network buffer, it encodes into the calling thread's scratch buffer and
//! copies the result out. The scratch buffer is then reset for the next call.
//!
//! # Retention policy
//!
//! - Every thread owns at most one scratch buffer, allocated lazily at
//!   [`ScratchConfig::default_size`](crate::config::ScratchConfig).
//! - After every use, success or failure, the buffer's length is reset to zero
//!   and its capacity is kept.
//! - If the capacity grew past [`ScratchConfig::max_retained`](crate::config::ScratchConfig),
//!   the buffer is replaced by a fresh one of the default size, so a single
//!   oversized payload cannot pin memory on a worker thread indefinitely.
//!
//! A nested encode on the same thread (for example a `Serialize` impl that
//! itself encodes a value) finds the slot empty and works on a temporary
//! buffer instead.
//!
//! # Example
//!
//! ```rust
//! use wirecodec::buffer::ScratchPool;
//! use wirecodec::config::ScratchConfig;
//! use std::io::Write;
//!
//! let pool = ScratchPool::new(ScratchConfig::default());
//! let bytes = pool
//!     .snapshot(|buf| buf.write_all(b"hello"))
//!     .unwrap();
//! assert_eq!(bytes, b"hello");
//! assert!(ScratchPool::retained_capacity() <= ScratchConfig::default().max_retained);
//! ```

use crate::buffer::OutputBuf;
use crate::config::ScratchConfig;
use std::cell::Cell;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static SCRATCH: Cell<Option<ScratchBuf>> = const { Cell::new(None) };
}

/// A reusable, growable byte region owned by one thread.
#[derive(Debug, Default)]
pub struct ScratchBuf {
    bytes: Vec<u8>,
}

impl ScratchBuf {
    /// Allocates an empty buffer with `capacity` bytes reserved.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// The bytes written since the last reset.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes written since the last reset.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing was written since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Physical capacity currently held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Empties the buffer and enforces the retention ceiling.
    ///
    /// Returns `true` if the storage was replaced because its capacity
    /// exceeded `config.max_retained`.
    pub fn reset(&mut self, config: &ScratchConfig) -> bool {
        self.bytes.clear();
        if self.bytes.capacity() > config.max_retained {
            self.bytes = Vec::with_capacity(config.default_size);
            true
        } else {
            false
        }
    }
}

impl io::Write for ScratchBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputBuf for ScratchBuf {
    type Writer<'a> = &'a mut ScratchBuf;

    fn writer(&mut self) -> Self::Writer<'_> {
        self
    }

    fn written(&self) -> usize {
        self.bytes.len()
    }
}

/// Counters describing how a [`ScratchPool`] has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScratchStats {
    /// Snapshots served from an existing thread buffer.
    pub reused: u64,
    /// Thread buffers allocated because the slot was empty.
    pub allocated: u64,
    /// Thread buffers discarded for exceeding the retention ceiling.
    pub replaced: u64,
}

/// Access point for the calling thread's scratch buffer.
///
/// The pool itself holds only the retention policy and counters; the buffers
/// live in thread-local storage and never cross threads.
#[derive(Debug)]
pub struct ScratchPool {
    config: ScratchConfig,
    reused: AtomicU64,
    allocated: AtomicU64,
    replaced: AtomicU64,
}

impl ScratchPool {
    /// Creates a pool applying `config` to every thread buffer it touches.
    ///
    /// A `max_retained` below `default_size` is raised to `default_size`, so a
    /// freshly allocated buffer is never discarded on its first reset.
    #[must_use]
    pub fn new(mut config: ScratchConfig) -> Self {
        if config.max_retained < config.default_size {
            tracing::warn!(
                default_size = config.default_size,
                max_retained = config.max_retained,
                "scratch max_retained below default_size, raising it"
            );
            config.max_retained = config.default_size;
        }
        Self {
            config,
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
            replaced: AtomicU64::new(0),
        }
    }

    /// The retention policy in effect.
    #[must_use]
    pub fn config(&self) -> &ScratchConfig {
        &self.config
    }

    /// Runs `fill` against this thread's scratch buffer and returns a copy of
    /// what it wrote.
    ///
    /// The buffer is reset and capped before returning on every path.
    ///
    /// # Errors
    ///
    /// Returns whatever error `fill` returns; nothing is copied in that case.
    pub fn snapshot<F, E>(&self, fill: F) -> Result<Vec<u8>, E>
    where
        F: FnOnce(&mut ScratchBuf) -> Result<(), E>,
    {
        let mut buf = self.acquire();
        let result = fill(&mut buf).map(|()| buf.as_slice().to_vec());
        self.restore(buf);
        result
    }

    /// Capacity retained by the calling thread's scratch buffer, or zero if the
    /// thread has none yet.
    #[must_use]
    pub fn retained_capacity() -> usize {
        SCRATCH.with(|slot| {
            let buf = slot.take();
            let capacity = buf.as_ref().map_or(0, ScratchBuf::capacity);
            slot.set(buf);
            capacity
        })
    }

    /// Usage counters across all threads.
    #[must_use]
    pub fn stats(&self) -> ScratchStats {
        ScratchStats {
            reused: self.reused.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
        }
    }

    fn acquire(&self) -> ScratchBuf {
        match SCRATCH.with(Cell::take) {
            Some(buf) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                ScratchBuf::with_capacity(self.config.default_size)
            }
        }
    }

    fn restore(&self, mut buf: ScratchBuf) {
        let peak = buf.capacity();
        if buf.reset(&self.config) {
            self.replaced.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                peak,
                max_retained = self.config.max_retained,
                "replaced oversized scratch buffer"
            );
        }
        SCRATCH.with(|slot| slot.set(Some(buf)));
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new(ScratchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small_config() -> ScratchConfig {
        ScratchConfig {
            default_size: 64,
            max_retained: 1024,
        }
    }

    #[test]
    fn test_snapshot_copies_output() {
        let pool = ScratchPool::new(small_config());
        let bytes = pool.snapshot(|buf| buf.write_all(b"abc")).unwrap();
        assert_eq!(bytes, b"abc");

        // The next snapshot starts from an empty buffer.
        let bytes = pool.snapshot(|buf| buf.write_all(b"de")).unwrap();
        assert_eq!(bytes, b"de");
    }

    #[test]
    fn test_snapshot_reuses_thread_buffer() {
        std::thread::spawn(|| {
            let pool = ScratchPool::new(small_config());
            for _ in 0..5 {
                pool.snapshot(|buf| buf.write_all(&[0u8; 16])).unwrap();
            }
            let stats = pool.stats();
            assert_eq!(stats.allocated, 1);
            assert_eq!(stats.reused, 4);
            assert_eq!(stats.replaced, 0);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_oversized_buffer_is_replaced() {
        std::thread::spawn(|| {
            let config = small_config();
            let pool = ScratchPool::new(config.clone());
            let big = vec![7u8; config.max_retained * 4];
            let bytes = pool.snapshot(|buf| buf.write_all(&big)).unwrap();
            assert_eq!(bytes.len(), big.len());
            assert_eq!(pool.stats().replaced, 1);
            assert!(ScratchPool::retained_capacity() <= config.max_retained);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_failed_fill_still_resets() {
        std::thread::spawn(|| {
            let config = small_config();
            let pool = ScratchPool::new(config.clone());
            let result: Result<Vec<u8>, io::Error> = pool.snapshot(|buf| {
                buf.write_all(&vec![1u8; config.max_retained * 2])?;
                Err(io::Error::other("sink rejected"))
            });
            assert!(result.is_err());
            assert!(ScratchPool::retained_capacity() <= config.max_retained);

            let bytes = pool.snapshot(|buf| buf.write_all(b"ok")).unwrap();
            assert_eq!(bytes, b"ok");
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_nested_snapshot_uses_temporary_buffer() {
        std::thread::spawn(|| {
            let pool = ScratchPool::new(small_config());
            let outer = pool
                .snapshot(|buf| {
                    let inner = pool.snapshot(|inner| inner.write_all(b"inner")).unwrap();
                    buf.write_all(&inner)?;
                    buf.write_all(b"+outer")
                })
                .unwrap();
            assert_eq!(outer, b"inner+outer");
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_inverted_limits_are_raised() {
        std::thread::spawn(|| {
            let pool = ScratchPool::new(ScratchConfig {
                default_size: 4096,
                max_retained: 64,
            });
            assert_eq!(pool.config().max_retained, 4096);
            for _ in 0..3 {
                pool.snapshot(|buf| buf.write_all(b"small")).unwrap();
            }
            let stats = pool.stats();
            assert_eq!(stats.replaced, 0);
            assert_eq!(stats.allocated, 1);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_reset_keeps_capacity_under_ceiling() {
        let config = small_config();
        let mut buf = ScratchBuf::with_capacity(128);
        buf.write_all(b"abc").unwrap();
        assert!(!buf.reset(&config));
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
    }
}
