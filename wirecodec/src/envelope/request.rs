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

//! Request envelope.

use crate::codec::{Codec, CodecId, CodecRegistry};
use crate::envelope::{InvokeId, Message, Payload, TraceId, now_millis};
use crate::error::Error;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// Returned by [`Request::attachments`] when there is no message.
static NO_ATTACHMENTS: BTreeMap<String, String> = BTreeMap::new();

/// The transmitted part of a request.
///
/// This is what a transport writes and reads; the decoded [`Message`] lives in
/// the surrounding [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBytes {
    invoke_id: InvokeId,
    timestamp: u64,
    payload: Option<Payload>,
}

impl RequestBytes {
    /// Creates an empty envelope with a fresh invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_invoke_id(InvokeId::next())
    }

    /// Creates an empty envelope with a known invocation id, as a receiver does.
    #[must_use]
    pub fn with_invoke_id(invoke_id: InvokeId) -> Self {
        Self {
            invoke_id,
            timestamp: now_millis(),
            payload: None,
        }
    }

    /// The invocation id.
    #[must_use]
    pub fn invoke_id(&self) -> InvokeId {
        self.invoke_id
    }

    /// Creation time in milliseconds since the UNIX epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
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

    /// Removes and returns the payload.
    pub fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }
}

impl Default for RequestBytes {
    fn default() -> Self {
        Self::new()
    }
}

/// A call as seen by the RPC layer: transmitted bytes plus decoded message.
///
/// Every accessor that touches the message tolerates its absence: the trace
/// id is `None`, the attachments are empty, and new attachments are dropped.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::CodecId;
/// use wirecodec::envelope::Request;
///
/// let mut request = Request::new();
/// assert!(request.trace_id().is_none());
/// assert!(request.attachments().is_empty());
/// request.put_attachment("ignored", "no message yet");
/// assert!(request.attachments().is_empty());
///
/// request.set_payload(CodecId::STREAM, b"{}".to_vec());
/// assert_eq!(request.codec_id(), Some(CodecId::STREAM));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    bytes: RequestBytes,
    message: Option<Message>,
}

impl Request {
    /// Creates an empty request with a fresh invocation id.
    #[must_use]
    pub fn new() -> Self {
        Self::from_bytes(RequestBytes::new())
    }

    /// Wraps received bytes; the message is decoded separately.
    #[must_use]
    pub fn from_bytes(bytes: RequestBytes) -> Self {
        Self {
            bytes,
            message: None,
        }
    }

    /// The transmitted part.
    #[must_use]
    pub fn request_bytes(&self) -> &RequestBytes {
        &self.bytes
    }

    /// Consumes the request, keeping the transmitted part.
    #[must_use]
    pub fn into_request_bytes(self) -> RequestBytes {
        self.bytes
    }

    /// The invocation id.
    #[must_use]
    pub fn invoke_id(&self) -> InvokeId {
        self.bytes.invoke_id()
    }

    /// Creation time in milliseconds since the UNIX epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.bytes.timestamp()
    }

    /// The codec of the current payload, if any.
    #[must_use]
    pub fn codec_id(&self) -> Option<CodecId> {
        self.bytes.codec_id()
    }

    /// The current payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.bytes.payload()
    }

    /// Replaces the codec and bytes in one step.
    pub fn set_payload(&mut self, codec: CodecId, bytes: impl Into<Bytes>) {
        self.bytes.set_payload(codec, bytes);
    }

    /// The decoded message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Attaches a message.
    pub fn set_message(&mut self, message: Message) {
        self.message = Some(message);
    }

    /// The message's trace id; `None` without a message.
    #[must_use]
    pub fn trace_id(&self) -> Option<TraceId> {
        self.message.as_ref().and_then(Message::trace_id)
    }

    /// The message's attachments; empty without a message.
    #[must_use]
    pub fn attachments(&self) -> &BTreeMap<String, String> {
        self.message
            .as_ref()
            .map_or(&NO_ATTACHMENTS, Message::attachments)
    }

    /// Adds an attachment to the message; does nothing without a message.
    pub fn put_attachment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(message) = self.message.as_mut() {
            message.put_attachment(key, value);
        }
    }

    /// Encodes the message with `codec` and stores it as the payload.
    ///
    /// The previous payload is kept if encoding fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMessage`] without a message, or the codec's
    /// encode error.
    pub fn encode_message<C: Codec>(&mut self, codec: &C) -> Result<(), Error> {
        let message = self.message.as_ref().ok_or(Error::MissingMessage {
            invoke_id: self.invoke_id().as_u64(),
        })?;
        let bytes = codec.encode(message)?;
        self.bytes.set_payload(codec.id(), bytes);
        Ok(())
    }

    /// Decodes the payload with the codec it names and stores the message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPayload`] without a payload,
    /// [`Error::UnknownCodec`] if the payload's codec is not registered, or the
    /// codec's decode error.
    pub fn decode_message(&mut self, registry: &CodecRegistry) -> Result<&Message, Error> {
        let payload = self.bytes.payload().ok_or(Error::MissingPayload {
            invoke_id: self.invoke_id().as_u64(),
        })?;
        let message = payload.decode::<Message>(registry)?;
        Ok(self.message.insert(message))
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request{{{}, timestamp={}", self.invoke_id(), self.timestamp())?;
        if let Some(codec) = self.codec_id() {
            write!(f, ", {codec}")?;
        }
        if let Some(message) = &self.message {
            write!(f, ", {message}")?;
        }
        f.write_str("}")
    }
}
