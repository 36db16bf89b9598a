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

//! Codec trait definition.
//!
//! This module defines the [`Codec`] trait that every wire backend implements.

use crate::buffer::{InputBuf, OutputBuf, ReleaseGuard};
use crate::codec::{CodecId, DecodeError, EncodeError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Trait for encoding values to bytes and decoding them back.
///
/// A `Codec` is the uniform contract behind which heterogeneous encoding
/// backends become interchangeable at runtime. The transport picks a codec by
/// its [`CodecId`], which travels in every frame header, and then uses one of
/// four operations:
///
/// - [`encode_into`](Codec::encode_into) writes straight into an outbound
///   network buffer, avoiding an intermediate copy.
/// - [`encode`](Codec::encode) produces a standalone byte vector through the
///   calling thread's scratch buffer.
/// - [`decode`](Codec::decode) reads an inbound buffer and releases it exactly
///   once, whatever the outcome.
/// - [`decode_range`](Codec::decode_range) reads a raw byte range.
///
/// # Thread Safety
///
/// Codecs are constructed once and shared by every worker thread, so they must
/// be `Send + Sync + 'static`. Any per-call state lives on the stack or in
/// thread-local storage.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{Codec, GraphCodec};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = GraphCodec::default();
/// let bytes = codec.encode(&Point { x: 1, y: 2 })?;
/// let point: Point = codec.decode_slice(&bytes)?;
/// assert_eq!(point, Point { x: 1, y: 2 });
/// # Ok(())
/// # }
/// ```
pub trait Codec: Send + Sync + 'static {
    /// Returns the identifier this codec is registered under.
    fn id(&self) -> CodecId;

    /// Returns a stable, human-readable name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Encodes `value` into `sink` and hands the sink back.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if the value's shape is not supported by
    /// this codec or if the sink rejects a write. Bytes already appended to
    /// the sink before the failure are left in place.
    fn encode_into<'b, T, B>(&self, sink: &'b mut B, value: &T) -> Result<&'b mut B, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
        B: OutputBuf + ?Sized;

    /// Encodes `value` into a standalone byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] under the same conditions as
    /// [`encode_into`](Codec::encode_into).
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: Serialize + ?Sized + 'static;

    /// Decodes a value from a raw byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the bytes are truncated, malformed, or
    /// belong to another type.
    fn decode_slice<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static;

    /// Decodes a value from an inbound buffer, releasing it before returning.
    ///
    /// The buffer is released exactly once on every path, including failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] under the same conditions as
    /// [`decode_slice`](Codec::decode_slice).
    fn decode<T, I>(&self, source: I) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static,
        I: InputBuf,
    {
        let guard = ReleaseGuard::new(source);
        self.decode_slice(guard.chunk())
    }

    /// Decodes a value from `len` bytes of `bytes` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::OutOfRange`] if the range does not fit inside
    /// `bytes`, otherwise as [`decode_slice`](Codec::decode_slice).
    fn decode_range<T>(&self, bytes: &[u8], offset: usize, len: usize) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static,
    {
        let range = offset
            .checked_add(len)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(DecodeError::OutOfRange {
                offset,
                len,
                available: bytes.len(),
            })?;
        self.decode_slice(range)
    }
}
