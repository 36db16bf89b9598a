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

//! Codec error types.
//!
//! Failures are split by direction. [`EncodeError`] covers values whose shape a
//! backend cannot represent and sinks that refuse writes. [`DecodeError`]
//! covers malformed, truncated or mismatched input. [`UnknownCodecError`] is
//! raised by the registry when a peer names a codec this process does not have.
//!
//! None of these are retried inside the crate; they are surfaced to the caller
//! of the operation that produced them.

use crate::codec::CodecId;
use std::io;
use thiserror::Error;

/// Boxed error used for backend-specific sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error that occurs while encoding a value.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::EncodeError;
///
/// let error = EncodeError::unsupported("schema", "Vec<Option<u8>>", "null element at index 1");
/// assert!(error.is_unsupported());
/// assert!(error.to_string().contains("null element"));
/// ```
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The runtime shape of the value cannot be represented by the backend.
    #[error("{codec}: cannot encode {type_name}: {reason}")]
    Unsupported {
        /// Name of the codec that rejected the value
        codec: &'static str,
        /// Rust type name of the rejected value
        type_name: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// The output buffer refused a write.
    #[error("{codec}: failed to write to sink: {source}")]
    Sink {
        /// Name of the codec that was writing
        codec: &'static str,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The encoding library reported a failure not covered above.
    #[error("{codec}: encoding failed: {source}")]
    Backend {
        /// Name of the codec that failed
        codec: &'static str,
        /// The library error
        #[source]
        source: BoxError,
    },
}

impl EncodeError {
    /// Creates an [`EncodeError::Unsupported`].
    pub fn unsupported(
        codec: &'static str,
        type_name: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Unsupported {
            codec,
            type_name,
            reason: reason.into(),
        }
    }

    /// Returns `true` if the value's shape was rejected.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns `true` if the sink failed.
    #[must_use]
    pub const fn is_sink(&self) -> bool {
        matches!(self, Self::Sink { .. })
    }

    /// Maps a postcard serialization failure.
    pub(crate) fn from_postcard(
        codec: &'static str,
        type_name: &'static str,
        err: postcard::Error,
    ) -> Self {
        match err {
            // `to_io` reports every rejected write this way.
            postcard::Error::SerializeBufferFull => Self::Sink {
                codec,
                source: io::Error::new(io::ErrorKind::WriteZero, err),
            },
            postcard::Error::SerializeSeqLengthUnknown
            | postcard::Error::WontImplement
            | postcard::Error::NotYetImplemented
            | postcard::Error::SerdeSerCustom => Self::unsupported(codec, type_name, err.to_string()),
            other => Self::Backend {
                codec,
                source: Box::new(other),
            },
        }
    }

    /// Maps a serde_json serialization failure.
    pub(crate) fn from_json(
        codec: &'static str,
        type_name: &'static str,
        err: serde_json::Error,
    ) -> Self {
        if err.is_io() {
            Self::Sink {
                codec,
                source: io::Error::from(err),
            }
        } else {
            Self::unsupported(codec, type_name, err.to_string())
        }
    }
}

/// Error that occurs while decoding a value.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::DecodeError;
///
/// let error = DecodeError::OutOfRange { offset: 8, len: 4, available: 10 };
/// assert!(!error.is_truncated());
/// ```
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input ended before a complete value was read.
    #[error("{codec}: input ended before {type_name} was complete")]
    Truncated {
        /// Name of the decoding codec
        codec: &'static str,
        /// Requested target type
        type_name: &'static str,
    },

    /// Input is not a valid encoding of the target type.
    #[error("{codec}: malformed input for {type_name}: {source}")]
    Malformed {
        /// Name of the decoding codec
        codec: &'static str,
        /// Requested target type
        type_name: &'static str,
        /// The library error
        #[source]
        source: BoxError,
    },

    /// The payload was written for a different type than the one requested.
    #[error("{codec}: payload was encoded as {found}, expected {expected}")]
    TypeMismatch {
        /// Name of the decoding codec
        codec: &'static str,
        /// Description of the requested type
        expected: String,
        /// Description of what the payload declares
        found: String,
    },

    /// The payload is larger than the configured decode limit.
    #[error("{codec}: payload of {size} bytes exceeds limit of {max} bytes")]
    TooLarge {
        /// Name of the decoding codec
        codec: &'static str,
        /// Payload size in bytes
        size: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// The requested byte range does not fit inside the supplied buffer.
    #[error("byte range {offset}+{len} is outside a buffer of {available} bytes")]
    OutOfRange {
        /// Start of the range
        offset: usize,
        /// Length of the range
        len: usize,
        /// Length of the buffer
        available: usize,
    },
}

impl DecodeError {
    /// Returns `true` if the input ended early.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }

    /// Returns `true` if the payload belongs to another type.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }

    /// Maps a postcard deserialization failure.
    pub(crate) fn from_postcard(
        codec: &'static str,
        type_name: &'static str,
        err: postcard::Error,
    ) -> Self {
        match err {
            postcard::Error::DeserializeUnexpectedEnd => Self::Truncated { codec, type_name },
            other => Self::Malformed {
                codec,
                type_name,
                source: Box::new(other),
            },
        }
    }

    /// Maps a serde_json deserialization failure.
    pub(crate) fn from_json(
        codec: &'static str,
        type_name: &'static str,
        err: serde_json::Error,
    ) -> Self {
        if err.is_eof() {
            Self::Truncated { codec, type_name }
        } else {
            Self::Malformed {
                codec,
                type_name,
                source: Box::new(err),
            }
        }
    }
}

/// A peer selected a codec identifier that is not registered.
///
/// This is fatal for the call in progress: the payload cannot be interpreted
/// without its codec, and retrying cannot create the missing registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no codec registered for {0}")]
pub struct UnknownCodecError(pub CodecId);

/// Error raised while building a [`CodecRegistry`](crate::codec::CodecRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two backends claimed the same identifier.
    #[error("{id} is already registered to {existing}, cannot register {rejected}")]
    Duplicate {
        /// The contested identifier
        id: CodecId,
        /// Name of the codec already holding the identifier
        existing: &'static str,
        /// Name of the codec that was refused
        rejected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_encode_error_unsupported() {
        let error = EncodeError::unsupported("graph", "Foo", "no length");
        assert!(error.is_unsupported());
        assert_eq!(error.to_string(), "graph: cannot encode Foo: no length");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_encode_error_from_postcard_buffer_full_is_sink() {
        let error =
            EncodeError::from_postcard("graph", "u32", postcard::Error::SerializeBufferFull);
        assert!(error.is_sink());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_decode_error_from_postcard_unexpected_end_is_truncated() {
        let error =
            DecodeError::from_postcard("schema", "u64", postcard::Error::DeserializeUnexpectedEnd);
        assert!(error.is_truncated());
    }

    #[test]
    fn test_decode_error_from_postcard_bad_varint_is_malformed() {
        let error =
            DecodeError::from_postcard("schema", "u64", postcard::Error::DeserializeBadVarint);
        assert!(matches!(error, DecodeError::Malformed { .. }));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_decode_error_from_json_eof_is_truncated() {
        let err = serde_json::from_slice::<Vec<u8>>(b"[1, 2").unwrap_err();
        assert!(DecodeError::from_json("stream", "Vec<u8>", err).is_truncated());
    }

    #[test]
    fn test_unknown_codec_display() {
        let error = UnknownCodecError(CodecId::new(0x42));
        assert_eq!(error.to_string(), "no codec registered for Codec(0x42)");
    }
}
