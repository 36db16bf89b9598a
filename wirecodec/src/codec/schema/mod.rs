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

//! Schema-checked binary codec.
//!
//! [`SchemaCodec`] prefixes every postcard body with the 4-byte big-endian
//! fingerprint of the value's [`Schema`]. On decode the fingerprint of the
//! requested type is compared first, so a payload written for another type is
//! rejected with [`DecodeError::TypeMismatch`] instead of being misread.
//!
//! Schemas are derived from the serde impls on first use and cached per type.
//! Decoding builds values field by field through their `Deserialize` impl. The
//! codec itself never invokes a `Default` impl or a user constructor.
//!
//! # Wire Format
//!
//! ```text
//! +---------------------+---------------------+
//! | Fingerprint (4 B)   | Postcard body (N B) |
//! +---------------------+---------------------+
//! ```

mod null_probe;
mod probe;

pub use probe::{Schema, SchemaKind};

use crate::buffer::{OutputBuf, ScratchPool};
use crate::codec::{Codec, CodecId, DecodeError, EncodeError};
use crate::config::CodecConfig;
use dashmap::DashMap;
use null_probe::{NullError, find_null_element};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{TypeId, type_name};
use std::io::Write;
use std::sync::Arc;

const NAME: &str = "schema";

/// Size of the fingerprint header.
pub const FINGERPRINT_LEN: usize = 4;

/// Postcard codec with a per-type schema fingerprint.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{Codec, SchemaCodec};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Quote { symbol: String, bid: u32 }
///
/// #[derive(Serialize, Deserialize, Debug)]
/// struct Trade { symbol: String, qty: u32 }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = SchemaCodec::default();
/// let bytes = codec.encode(&Quote { symbol: "XYZ".into(), bid: 10 })?;
///
/// let quote: Quote = codec.decode_slice(&bytes)?;
/// assert_eq!(quote.bid, 10);
///
/// let wrong = codec.decode_slice::<Trade>(&bytes);
/// assert!(wrong.unwrap_err().is_type_mismatch());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SchemaCodec {
    schemas: DashMap<TypeId, Arc<Schema>>,
    allow_null_elements: bool,
    max_decode_size: Option<usize>,
    scratch: ScratchPool,
}

impl SchemaCodec {
    /// Creates a codec from `config`.
    #[must_use]
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            schemas: DashMap::new(),
            allow_null_elements: config.allow_null_elements,
            max_decode_size: config.max_decode_size,
            scratch: ScratchPool::new(config.scratch.clone()),
        }
    }

    /// Returns the cached schema of `T`, deriving it on first use.
    pub fn schema<T: DeserializeOwned + 'static>(&self) -> Arc<Schema> {
        self.cached::<T>(Schema::of_type::<T>)
    }

    /// Number of types whose schema is cached.
    #[must_use]
    pub fn cached_schemas(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` if `None` sequence elements are accepted.
    #[must_use]
    pub fn allows_null_elements(&self) -> bool {
        self.allow_null_elements
    }

    /// The scratch pool serving [`Codec::encode`].
    #[must_use]
    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }

    fn cached<T: ?Sized + 'static>(&self, derive: impl FnOnce() -> Schema) -> Arc<Schema> {
        let key = TypeId::of::<T>();
        if let Some(schema) = self.schemas.get(&key) {
            return Arc::clone(&schema);
        }
        // Racing threads may both derive; the first insert wins.
        let schema = derive();
        tracing::debug!(
            codec = NAME,
            rust_type = type_name::<T>(),
            schema = %schema,
            "derived schema"
        );
        Arc::clone(&self.schemas.entry(key).or_insert_with(|| Arc::new(schema)))
    }
}

impl Default for SchemaCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl Codec for SchemaCodec {
    fn id(&self) -> CodecId {
        CodecId::SCHEMA
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode_into<'b, T, B>(&self, sink: &'b mut B, value: &T) -> Result<&'b mut B, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
        B: OutputBuf + ?Sized,
    {
        if !self.allow_null_elements {
            find_null_element(value).map_err(|err| match err {
                NullError::NullElement { .. } => {
                    EncodeError::unsupported(NAME, type_name::<T>(), err.to_string())
                }
                NullError::Custom(reason) => EncodeError::unsupported(NAME, type_name::<T>(), reason),
            })?;
        }

        let schema = self.cached::<T>(|| Schema::of_value(value));
        let mut writer = sink.writer();
        writer
            .write_all(&schema.fingerprint().to_be_bytes())
            .map_err(|source| EncodeError::Sink { codec: NAME, source })?;
        postcard::to_io(value, writer)
            .map(drop)
            .map_err(|err| EncodeError::from_postcard(NAME, type_name::<T>(), err))?;
        Ok(sink)
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
    {
        self.scratch
            .snapshot(|buf| self.encode_into(buf, value).map(drop))
    }

    fn decode_slice<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static,
    {
        if let Some(max) = self.max_decode_size {
            if bytes.len() > max {
                return Err(DecodeError::TooLarge {
                    codec: NAME,
                    size: bytes.len(),
                    max,
                });
            }
        }

        let Some((header, body)) = bytes.split_first_chunk::<FINGERPRINT_LEN>() else {
            return Err(DecodeError::Truncated {
                codec: NAME,
                type_name: type_name::<T>(),
            });
        };
        let schema = self.schema::<T>();
        let found = u32::from_be_bytes(*header);
        if found != schema.fingerprint() {
            return Err(DecodeError::TypeMismatch {
                codec: NAME,
                expected: schema.to_string(),
                found: format!("{found:#010x}"),
            });
        }

        let (value, rest) = postcard::take_from_bytes::<T>(body)
            .map_err(|err| DecodeError::from_postcard(NAME, type_name::<T>(), err))?;
        if !rest.is_empty() {
            return Err(DecodeError::Malformed {
                codec: NAME,
                type_name: type_name::<T>(),
                source: format!("{} trailing bytes after value", rest.len()).into(),
            });
        }
        Ok(value)
    }
}
