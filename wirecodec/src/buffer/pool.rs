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

//! Size-classed pool for inbound frame bodies.
//!
//! Frame reads draw their body storage from a [`FramePool`]; releasing the
//! resulting [`InboundBuf`](crate::buffer::InboundBuf) puts the storage back.
//! Buffers are grouped into power-of-four size classes and each class keeps a
//! bounded number of idle buffers, so the pool cannot grow without limit.

use parking_lot::Mutex;

/// Buffers larger than this are never kept (1 MB).
const MAX_POOLED_SIZE: usize = 1024 * 1024;

/// Idle buffers kept per size class.
const MAX_BUFFERS_PER_CLASS: usize = 32;

/// Size classes (powers of 4 from 256 B to 1 MB).
const SIZE_CLASSES: &[usize] = &[256, 1024, 4096, 16384, 65536, 262144, 1048576];

/// Thread-safe pool of reusable frame buffers.
///
/// # Example
///
/// ```rust
/// use wirecodec::buffer::FramePool;
///
/// let pool = FramePool::new();
/// let buf = pool.take(100);
/// assert!(buf.capacity() >= 100);
/// pool.recycle(buf);
/// assert_eq!(pool.pooled(), 1);
/// ```
#[derive(Debug)]
pub struct FramePool {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
}

impl FramePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: SIZE_CLASSES.iter().map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    /// Returns an empty buffer with at least `min_capacity` bytes reserved.
    #[must_use]
    pub fn take(&self, min_capacity: usize) -> Vec<u8> {
        match class_for(min_capacity) {
            Some(idx) => self.classes[idx]
                .lock()
                .pop()
                .unwrap_or_else(|| Vec::with_capacity(SIZE_CLASSES[idx])),
            None => Vec::with_capacity(min_capacity),
        }
    }

    /// Returns a buffer to the pool. Oversized buffers and buffers beyond the
    /// per-class limit are dropped.
    pub fn recycle(&self, mut buffer: Vec<u8>) {
        let capacity = buffer.capacity();
        if capacity == 0 || capacity > MAX_POOLED_SIZE {
            return;
        }
        // A buffer only serves requests its capacity can satisfy, so file it
        // under the largest class it fully covers.
        let Some(idx) = SIZE_CLASSES.iter().rposition(|&size| size <= capacity) else {
            return;
        };
        buffer.clear();
        let mut class = self.classes[idx].lock();
        if class.len() < MAX_BUFFERS_PER_CLASS {
            class.push(buffer);
        }
    }

    /// Number of idle buffers across all size classes.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.classes.iter().map(|class| class.lock().len()).sum()
    }
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new()
    }
}

fn class_for(min_capacity: usize) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&size| size >= min_capacity)
}
