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

//! Top-level error type for wirecodec.
//!
//! Each layer of the crate reports its own error type: [`EncodeError`] and
//! [`DecodeError`] from the codecs, [`UnknownCodecError`] and [`RegistryError`]
//! from the registry, [`ConfigError`] from configuration, and [`FrameError`]
//! from framing. The [`Error`] enum composes them for callers that handle all
//! of them in one place.
//!
//! # Error Handling Strategy
//!
//! - **Codec and registry errors** fail the call in progress. The connection
//!   that carried the payload remains usable.
//! - **Frame errors** mean the byte stream can no longer be trusted; the
//!   connection should be closed.
//! - Nothing is retried inside the crate and no fallback codec is tried.
//!
//! # Examples
//!
//! ```rust
//! use wirecodec::Error;
//! use wirecodec::codec::{CodecId, UnknownCodecError};
//!
//! let error: Error = UnknownCodecError(CodecId::new(9)).into();
//! assert!(error.is_codec_error());
//! assert!(!error.should_close_connection());
//! ```

use crate::codec::{DecodeError, EncodeError, RegistryError, UnknownCodecError};
use crate::config::ConfigError;
use crate::framing::FrameError;
use thiserror::Error;

/// Top-level error type for wirecodec operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A value could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A payload names a codec that is not registered.
    #[error(transparent)]
    UnknownCodec(#[from] UnknownCodecError),

    /// The registry could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A configuration value was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A frame could not be read or written.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// An envelope has no payload to decode.
    #[error("envelope {invoke_id} carries no payload")]
    MissingPayload {
        /// The envelope's invocation id
        invoke_id: u64,
    },

    /// A request has no message to encode.
    #[error("request {invoke_id} carries no message")]
    MissingMessage {
        /// The request's invocation id
        invoke_id: u64,
    },
}

impl Error {
    /// Returns `true` for errors raised by a codec or the registry lookup.
    #[must_use]
    pub const fn is_codec_error(&self) -> bool {
        matches!(
            self,
            Self::Encode(_) | Self::Decode(_) | Self::UnknownCodec(_)
        )
    }

    /// Returns `true` for framing errors.
    #[must_use]
    pub const fn is_frame_error(&self) -> bool {
        matches!(self, Self::Frame(_))
    }

    /// Returns `true` if the connection that produced this error should be
    /// closed.
    #[must_use]
    pub fn should_close_connection(&self) -> bool {
        match self {
            Self::Frame(err) => err.is_stream_corrupt(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_from_codec_errors() {
        let error: Error = DecodeError::Truncated {
            codec: "graph",
            type_name: "u32",
        }
        .into();
        assert!(error.is_codec_error());
        assert!(!error.is_frame_error());
        assert_eq!(error.to_string(), "graph: input ended before u32 was complete");
    }

    #[test]
    fn test_frame_errors_close_connection() {
        let error: Error = FrameError::BadMagic(0x1234).into();
        assert!(error.is_frame_error());
        assert!(error.should_close_connection());

        let error: Error = FrameError::Closed.into();
        assert!(!error.should_close_connection());
    }

    #[test]
    fn test_missing_payload_display() {
        let error = Error::MissingPayload { invoke_id: 7 };
        assert_eq!(error.to_string(), "envelope 7 carries no payload");
        assert!(!error.is_codec_error());
    }

    #[test]
    fn test_transparent_source() {
        let error: Error = EncodeError::Sink {
            codec: "stream",
            source: std::io::Error::other("closed"),
        }
        .into();
        // Transparent variants expose the inner error's source.
        assert!(error.source().is_some());
    }
}
