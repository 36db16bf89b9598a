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

//! Request and response envelopes.
//!
//! An envelope is what travels between peers for one call: an invocation id,
//! a creation timestamp, and a [`Payload`] pairing the encoded bytes with the
//! [`CodecId`] that produced them. The codec and the bytes are stored and
//! replaced together, so a reader can never observe bytes paired with the
//! wrong codec.
//!
//! # Example
//!
//! ```rust
//! use wirecodec::codec::{CodecRegistry, CodecId};
//! use wirecodec::config::{CodecConfig, CycleSafeTypes};
//! use wirecodec::envelope::{Message, Request, ServiceMetadata};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
//!
//! let mut request = Request::new();
//! request.set_message(Message::new(ServiceMetadata::new("orders", "OrderService", "1.0"), "place"));
//! request.put_attachment("tenant", "acme");
//! request.encode_message(registry.get(CodecId::SCHEMA)?)?;
//!
//! // On the receiving side only the envelope bytes are known.
//! let mut received = Request::from_bytes(request.request_bytes().clone());
//! received.decode_message(&registry)?;
//! assert_eq!(received.attachments().get("tenant").map(String::as_str), Some("acme"));
//! # Ok(())
//! # }
//! ```

mod message;
mod request;
mod response;

pub use message::{Message, ServiceMetadata, TraceId};
pub use request::{Request, RequestBytes};
pub use response::{Response, Status};

use crate::codec::{Codec, CodecId, CodecRegistry};
use crate::error::Error;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Global counter for generating invocation ids.
static NEXT_INVOKE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one call.
///
/// # Example
///
/// ```rust
/// use wirecodec::envelope::InvokeId;
///
/// let a = InvokeId::next();
/// let b = InvokeId::next();
/// assert!(b.as_u64() > a.as_u64());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvokeId(u64);

impl InvokeId {
    /// Allocates the next id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_INVOKE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id as a u64.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for InvokeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<InvokeId> for u64 {
    fn from(id: InvokeId) -> Self {
        id.0
    }
}

impl fmt::Display for InvokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invoke({})", self.0)
    }
}

/// Encoded bytes together with the codec that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    codec: CodecId,
    bytes: Bytes,
}

impl Payload {
    /// Pairs `bytes` with `codec`.
    pub fn new(codec: CodecId, bytes: impl Into<Bytes>) -> Self {
        Self {
            codec,
            bytes: bytes.into(),
        }
    }

    /// Encodes `value` with `codec`.
    ///
    /// # Errors
    ///
    /// Returns the codec's encode error.
    pub fn encode<C, T>(codec: &C, value: &T) -> Result<Self, Error>
    where
        C: Codec,
        T: serde::Serialize + ?Sized + 'static,
    {
        Ok(Self::new(codec.id(), codec.encode(value)?))
    }

    /// The codec that produced the bytes.
    #[must_use]
    pub fn codec(&self) -> CodecId {
        self.codec
    }

    /// The encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Number of encoded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if there are no encoded bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the bytes with the codec registered under [`Payload::codec`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCodec`] if the codec is not registered, or the
    /// codec's decode error.
    pub fn decode<T>(&self, registry: &CodecRegistry) -> Result<T, Error>
    where
        T: DeserializeOwned + 'static,
    {
        Ok(registry.get(self.codec)?.decode_slice(&self.bytes)?)
    }
}

/// Milliseconds since the UNIX epoch, or `0` if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{GraphCodec, StreamCodec};
    use crate::config::{CodecConfig, CycleSafeTypes};

    #[test]
    fn test_invoke_ids_are_unique() {
        let ids: Vec<_> = (0..100).map(|_| InvokeId::next()).collect();
        let mut sorted = ids.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_payload_decode_uses_own_codec() {
        let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
        let payload = Payload::encode(&StreamCodec::default(), &[1u8, 2, 3]).unwrap();
        assert_eq!(payload.codec(), CodecId::STREAM);
        assert_eq!(&payload.bytes()[..], b"[1,2,3]");
        let decoded: Vec<u8> = payload.decode(&registry).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);

        let payload = Payload::encode(&GraphCodec::default(), &5u64).unwrap();
        assert_eq!(payload.decode::<u64>(&registry).unwrap(), 5);
    }

    #[test]
    fn test_payload_with_unknown_codec() {
        let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
        let payload = Payload::new(CodecId::new(0x42), vec![0u8]);
        let error = payload.decode::<u8>(&registry).unwrap_err();
        assert!(matches!(error, Error::UnknownCodec(_)));
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(now_millis() > 1_577_836_800_000);
    }
}
