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

//! Response envelope.

use crate::codec::{Codec, CodecId, CodecRegistry};
use crate::envelope::{InvokeId, Payload};
use crate::error::Error;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// Outcome of a call, as carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// The call succeeded.
    Ok = 0x20,
    /// The client gave up waiting.
    ClientTimeout = 0x30,
    /// The server gave up waiting.
    ServerTimeout = 0x31,
    /// The request could not be understood.
    BadRequest = 0x40,
    /// No provider serves the requested service.
    ServiceNotFound = 0x44,
    /// The provider failed while handling the call.
    ServerError = 0x50,
    /// The provider refused the call because it is overloaded.
    ServerBusy = 0x51,
    /// The payload could not be decoded.
    DeserializationFail = 0x60,
}

impl Status {
    /// The byte written to the wire.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x20 => Self::Ok,
            0x30 => Self::ClientTimeout,
            0x31 => Self::ServerTimeout,
            0x40 => Self::BadRequest,
            0x44 => Self::ServiceNotFound,
            0x50 => Self::ServerError,
            0x51 => Self::ServerBusy,
            0x60 => Self::DeserializationFail,
            _ => return None,
        })
    }

    /// Returns `true` for [`Status::Ok`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "OK",
            Self::ClientTimeout => "CLIENT_TIMEOUT",
            Self::ServerTimeout => "SERVER_TIMEOUT",
            Self::BadRequest => "BAD_REQUEST",
            Self::ServiceNotFound => "SERVICE_NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
            Self::ServerBusy => "SERVER_BUSY",
            Self::DeserializationFail => "DESERIALIZATION_FAIL",
        };
        f.write_str(text)
    }
}

/// The reply to one [`Request`](crate::envelope::Request).
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{CodecRegistry, CodecId};
/// use wirecodec::config::{CodecConfig, CycleSafeTypes};
/// use wirecodec::envelope::{InvokeId, Response, Status};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
/// let mut response = Response::new(InvokeId::from(9));
/// response.encode_result(registry.get(CodecId::GRAPH)?, &"done")?;
///
/// assert_eq!(response.status(), Status::Ok);
/// let result: String = response.decode_result(&registry)?;
/// assert_eq!(result, "done");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    invoke_id: InvokeId,
    status: Status,
    payload: Option<Payload>,
}

impl Response {
    /// Creates an `Ok` response without payload.
    #[must_use]
    pub fn new(invoke_id: InvokeId) -> Self {
        Self::with_status(invoke_id, Status::Ok)
    }

    /// Creates a response with the given status.
    #[must_use]
    pub fn with_status(invoke_id: InvokeId, status: Status) -> Self {
        Self {
            invoke_id,
            status,
            payload: None,
        }
    }

    /// The invocation id of the request being answered.
    #[must_use]
    pub fn invoke_id(&self) -> InvokeId {
        self.invoke_id
    }

    /// The call outcome.
    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Replaces the call outcome.
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// The codec of the current payload, if any.
    #[must_use]
    pub fn codec_id(&self) -> Option<CodecId> {
        self.payload.as_ref().map(Payload::codec)
    }

    /// The current payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Replaces the codec and bytes in one step.
    pub fn set_payload(&mut self, codec: CodecId, bytes: impl Into<Bytes>) {
        self.payload = Some(Payload::new(codec, bytes));
    }

    /// Encodes `value` with `codec` and stores it as the payload.
    ///
    /// # Errors
    ///
    /// Returns the codec's encode error; the previous payload is kept.
    pub fn encode_result<C, T>(&mut self, codec: &C, value: &T) -> Result<(), Error>
    where
        C: Codec,
        T: Serialize + ?Sized + 'static,
    {
        self.payload = Some(Payload::encode(codec, value)?);
        Ok(())
    }

    /// Decodes the payload with the codec it names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPayload`] without a payload,
    /// [`Error::UnknownCodec`] if the payload's codec is not registered, or the
    /// codec's decode error.
    pub fn decode_result<T>(&self, registry: &CodecRegistry) -> Result<T, Error>
    where
        T: DeserializeOwned + 'static,
    {
        self.payload
            .as_ref()
            .ok_or(Error::MissingPayload {
                invoke_id: self.invoke_id.as_u64(),
            })?
            .decode(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::SchemaCodec;
    use crate::config::{CodecConfig, CycleSafeTypes};

    #[test]
    fn test_status_bytes() {
        for status in [
            Status::Ok,
            Status::ClientTimeout,
            Status::ServerTimeout,
            Status::BadRequest,
            Status::ServiceNotFound,
            Status::ServerError,
            Status::ServerBusy,
            Status::DeserializationFail,
        ] {
            assert_eq!(Status::from_u8(status.as_u8()), Some(status));
        }
        assert_eq!(Status::from_u8(0x00), None);
        assert_eq!(Status::ServiceNotFound.to_string(), "SERVICE_NOT_FOUND");
    }

    #[test]
    fn test_failed_encode_keeps_previous_payload() {
        let codec = SchemaCodec::default();
        let mut response = Response::new(InvokeId::from(1));
        response.encode_result(&codec, &vec![Some(1u8)]).unwrap();
        let before = response.payload().cloned();

        assert!(response.encode_result(&codec, &vec![None::<u8>]).is_err());
        assert_eq!(response.payload().cloned(), before);
    }

    #[test]
    fn test_decode_without_payload() {
        let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
        let response = Response::with_status(InvokeId::from(3), Status::ServerBusy);
        assert!(!response.status().is_ok());
        assert!(matches!(
            response.decode_result::<u8>(&registry),
            Err(Error::MissingPayload { invoke_id: 3 })
        ));
    }
}
