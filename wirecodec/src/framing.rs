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

//! Frame codec for carrying envelopes over a byte stream.
//!
//! Every frame starts with a fixed 17-byte header. The codec identifier sits in
//! the header ahead of the body, so the receiver knows which decoder to use
//! before it has read a single body byte.
//!
//! # Protocol
//!
//! ```text
//! +-----------+----------+-----------+------------+---------------+-------------+------------+
//! | Magic (2) | Kind (1) | Codec (1) | Status (1) | Invoke ID (8) | Length (4)  | Body (N)   |
//! +-----------+----------+-----------+------------+---------------+-------------+------------+
//! ```
//!
//! - **Magic**: `0xBABE`, big-endian
//! - **Kind**: request, response, or heartbeat
//! - **Codec**: the [`CodecId`] of the body, or [`CodecId::NONE`] for a frame
//!   without a payload. An empty body under a real codec is a payload, such as
//!   `()` from the graph codec.
//! - **Status**: `0` for requests and heartbeats, a [`Status`] byte for responses
//! - **Invoke ID**: u64, big-endian
//! - **Length**: body length as u32, big-endian
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use wirecodec::buffer::FramePool;
//! use wirecodec::codec::{CodecRegistry, CodecId};
//! use wirecodec::config::{CodecConfig, CycleSafeTypes};
//! use wirecodec::envelope::InvokeId;
//! use wirecodec::framing::{FrameHeader, MAX_FRAME_SIZE, encode_frame, read_frame};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
//! let codec = registry.get(CodecId::GRAPH)?;
//!
//! let mut wire = bytes::BytesMut::new();
//! encode_frame(&mut wire, FrameHeader::request(InvokeId::from(1)), codec, &42u32)?;
//!
//! let pool = Arc::new(FramePool::new());
//! let mut reader = &wire[..];
//! let frame = read_frame(&mut reader, &pool, MAX_FRAME_SIZE).await?;
//! assert_eq!(frame.header().codec(), CodecId::GRAPH);
//! let value: u32 = frame.decode(&registry)?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use crate::buffer::{FramePool, InboundBuf};
use crate::codec::{Codec, CodecId, CodecRegistry, EncodeError};
use crate::envelope::{InvokeId, RequestBytes, Response, Status};
use crate::error::Error;
use bytes::{BufMut, BytesMut};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Marker at the start of every frame.
pub const MAGIC: u16 = 0xBABE;

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 17;

/// Default upper bound on a frame body (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Offset of the length field inside the header.
const LENGTH_OFFSET: usize = HEADER_LEN - 4;

/// Errors raised while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The header did not start with [`MAGIC`].
    #[error("bad frame magic {0:#06x}")]
    BadMagic(u16),

    /// The kind byte is not a known [`FrameKind`].
    #[error("unknown frame kind {0:#04x}")]
    UnknownKind(u8),

    /// The status byte is not a known [`Status`].
    #[error("unknown response status {0:#04x}")]
    UnknownStatus(u8),

    /// The body is larger than the permitted maximum.
    #[error("frame body of {len} bytes exceeds maximum of {max}")]
    TooLarge {
        /// Announced or actual body length
        len: usize,
        /// The limit in effect
        max: u32,
    },

    /// The peer closed the stream between frames.
    #[error("stream closed")]
    Closed,

    /// The stream ended inside a frame.
    #[error("stream ended after {read} of {expected} bytes")]
    Truncated {
        /// Bytes received
        read: usize,
        /// Bytes the frame needed
        expected: usize,
    },

    /// The underlying stream failed.
    #[error("frame i/o failed")]
    Io(#[from] io::Error),

    /// The body could not be encoded; nothing was written.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl FrameError {
    /// Returns `true` if the stream position can no longer be trusted.
    #[must_use]
    pub const fn is_stream_corrupt(&self) -> bool {
        !matches!(self, Self::Closed | Self::Encode(_))
    }
}

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// A call from client to server.
    Request = 0x01,
    /// The answer to a request.
    Response = 0x02,
    /// Keep-alive with an empty body.
    Heartbeat = 0x0F,
}

impl FrameKind {
    /// Parses a wire byte.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownKind`] for unassigned values.
    pub const fn from_u8(value: u8) -> Result<Self, FrameError> {
        match value {
            0x01 => Ok(Self::Request),
            0x02 => Ok(Self::Response),
            0x0F => Ok(Self::Heartbeat),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// The fixed-size header in front of every frame body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    kind: FrameKind,
    codec: CodecId,
    status: Option<Status>,
    invoke_id: InvokeId,
    body_len: u32,
}

impl FrameHeader {
    /// Header for a request frame.
    #[must_use]
    pub const fn request(invoke_id: InvokeId) -> Self {
        Self::new(FrameKind::Request, None, invoke_id)
    }

    /// Header for a response frame.
    #[must_use]
    pub const fn response(invoke_id: InvokeId, status: Status) -> Self {
        Self::new(FrameKind::Response, Some(status), invoke_id)
    }

    /// Header for a heartbeat frame.
    #[must_use]
    pub const fn heartbeat(invoke_id: InvokeId) -> Self {
        Self::new(FrameKind::Heartbeat, None, invoke_id)
    }

    const fn new(kind: FrameKind, status: Option<Status>, invoke_id: InvokeId) -> Self {
        Self {
            kind,
            codec: CodecId::NONE,
            status,
            invoke_id,
            body_len: 0,
        }
    }

    /// The frame kind.
    #[must_use]
    pub const fn kind(&self) -> FrameKind {
        self.kind
    }

    /// The codec of the body.
    #[must_use]
    pub const fn codec(&self) -> CodecId {
        self.codec
    }

    /// Returns `true` if the frame carries a payload, even an empty one.
    #[must_use]
    pub fn has_payload(&self) -> bool {
        self.codec != CodecId::NONE || self.body_len > 0
    }

    /// The response status; `None` for requests and heartbeats.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        self.status
    }

    /// The invocation id.
    #[must_use]
    pub const fn invoke_id(&self) -> InvokeId {
        self.invoke_id
    }

    /// Length of the body that follows the header.
    #[must_use]
    pub const fn body_len(&self) -> u32 {
        self.body_len
    }

    /// Returns a copy with the codec replaced.
    #[must_use]
    pub const fn with_codec(mut self, codec: CodecId) -> Self {
        self.codec = codec;
        self
    }

    fn put(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_LEN);
        dst.put_u16(MAGIC);
        dst.put_u8(self.kind as u8);
        dst.put_u8(self.codec.as_u8());
        dst.put_u8(self.status.map_or(0, Status::as_u8));
        dst.put_u64(self.invoke_id.as_u64());
        dst.put_u32(self.body_len);
    }

    /// Parses a header.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::BadMagic`], [`FrameError::UnknownKind`] or
    /// [`FrameError::UnknownStatus`] for headers that do not describe a frame.
    pub fn parse(src: &[u8; HEADER_LEN]) -> Result<Self, FrameError> {
        let magic = u16::from_be_bytes([src[0], src[1]]);
        if magic != MAGIC {
            return Err(FrameError::BadMagic(magic));
        }
        let kind = FrameKind::from_u8(src[2])?;
        let status = match (kind, src[4]) {
            (FrameKind::Response, byte) => {
                Some(Status::from_u8(byte).ok_or(FrameError::UnknownStatus(byte))?)
            }
            _ => None,
        };
        let mut invoke_id = [0u8; 8];
        invoke_id.copy_from_slice(&src[5..LENGTH_OFFSET]);
        let mut body_len = [0u8; 4];
        body_len.copy_from_slice(&src[LENGTH_OFFSET..]);
        Ok(Self {
            kind,
            codec: CodecId::new(src[3]),
            status,
            invoke_id: InvokeId::from(u64::from_be_bytes(invoke_id)),
            body_len: u32::from_be_bytes(body_len),
        })
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {} {}", self.kind, self.invoke_id, self.codec)?;
        if let Some(status) = self.status {
            write!(f, " {status}")?;
        }
        write!(f, " len={}", self.body_len)
    }
}

/// A received frame whose body is still encoded.
///
/// The body is a pooled [`InboundBuf`]; decoding the frame consumes it and
/// returns the storage to the pool.
#[derive(Debug)]
pub struct Frame {
    header: FrameHeader,
    body: InboundBuf,
}

impl Frame {
    /// The frame header.
    #[must_use]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// The encoded body.
    #[must_use]
    pub fn body(&self) -> &InboundBuf {
        &self.body
    }

    /// Splits the frame into header and body.
    #[must_use]
    pub fn into_parts(self) -> (FrameHeader, InboundBuf) {
        (self.header, self.body)
    }

    /// Decodes the body with the codec named in the header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCodec`] if the codec is not registered, or the
    /// codec's decode error.
    pub fn decode<T>(self, registry: &CodecRegistry) -> Result<T, Error>
    where
        T: DeserializeOwned + 'static,
    {
        let codec = registry.get(self.header.codec)?;
        Ok(codec.decode(self.body)?)
    }

    /// Turns a request frame into a request envelope, keeping the body encoded.
    #[must_use]
    pub fn into_request_bytes(self) -> RequestBytes {
        let mut request = RequestBytes::with_invoke_id(self.header.invoke_id);
        if self.header.has_payload() {
            request.set_payload(self.header.codec, self.body.into_bytes());
        }
        request
    }

    /// Turns a response frame into a response envelope, keeping the body encoded.
    #[must_use]
    pub fn into_response(self) -> Response {
        let status = self.header.status.unwrap_or(Status::Ok);
        let mut response = Response::with_status(self.header.invoke_id, status);
        if self.header.has_payload() {
            response.set_payload(self.header.codec, self.body.into_bytes());
        }
        response
    }
}

/// Encodes `value` with `codec` as one frame appended to `dst`.
///
/// The body is written straight into `dst` after the header; the length field
/// is filled in once the body size is known. The header's codec is replaced by
/// `codec`'s id. On failure `dst` is restored to its previous length.
///
/// # Errors
///
/// Returns [`FrameError::Encode`] if the codec rejects the value, or
/// [`FrameError::TooLarge`] if the body exceeds [`MAX_FRAME_SIZE`].
pub fn encode_frame<C, T>(
    dst: &mut BytesMut,
    header: FrameHeader,
    codec: &C,
    value: &T,
) -> Result<(), FrameError>
where
    C: Codec,
    T: Serialize + ?Sized + 'static,
{
    let start = dst.len();
    header.with_codec(codec.id()).put(dst);

    if let Err(err) = codec.encode_into(dst, value) {
        dst.truncate(start);
        return Err(err.into());
    }

    let body_len = dst.len() - start - HEADER_LEN;
    let Some(len) = u32::try_from(body_len).ok().filter(|&len| len <= MAX_FRAME_SIZE) else {
        dst.truncate(start);
        return Err(FrameError::TooLarge {
            len: body_len,
            max: MAX_FRAME_SIZE,
        });
    };
    let length_at = start + LENGTH_OFFSET;
    dst[length_at..length_at + 4].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Writes one frame with an already encoded body and flushes the writer.
///
/// The header's length field is taken from `body`.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] if the body exceeds [`MAX_FRAME_SIZE`], or
/// [`FrameError::Io`] if writing fails.
pub async fn write_frame<W>(writer: &mut W, header: FrameHeader, body: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let body_len = u32::try_from(body.len())
        .ok()
        .filter(|&len| len <= MAX_FRAME_SIZE)
        .ok_or(FrameError::TooLarge {
            len: body.len(),
            max: MAX_FRAME_SIZE,
        })?;

    let mut head = BytesMut::with_capacity(HEADER_LEN);
    FrameHeader { body_len, ..header }.put(&mut head);
    writer.write_all(&head).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes a request envelope as one frame.
///
/// # Errors
///
/// See [`write_frame`].
pub async fn write_request<W>(writer: &mut W, request: &RequestBytes) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut header = FrameHeader::request(request.invoke_id());
    let body: &[u8] = match request.payload() {
        Some(payload) => {
            header = header.with_codec(payload.codec());
            &payload.bytes()[..]
        }
        None => &[],
    };
    write_frame(writer, header, body).await
}

/// Writes a response envelope as one frame.
///
/// # Errors
///
/// See [`write_frame`].
pub async fn write_response<W>(writer: &mut W, response: &Response) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let mut header = FrameHeader::response(response.invoke_id(), response.status());
    let body: &[u8] = match response.payload() {
        Some(payload) => {
            header = header.with_codec(payload.codec());
            &payload.bytes()[..]
        }
        None => &[],
    };
    write_frame(writer, header, body).await
}

/// Reads one frame, drawing the body storage from `pool`.
///
/// # Errors
///
/// Returns [`FrameError::Closed`] if the stream ends cleanly before a header,
/// [`FrameError::Truncated`] if it ends inside a frame,
/// [`FrameError::TooLarge`] if the announced body exceeds `max_frame_size`,
/// or the header parse error.
pub async fn read_frame<R>(
    reader: &mut R,
    pool: &Arc<FramePool>,
    max_frame_size: u32,
) -> Result<Frame, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut head = [0u8; HEADER_LEN];
    match read_full(reader, &mut head).await? {
        0 => return Err(FrameError::Closed),
        HEADER_LEN => {}
        read => {
            return Err(FrameError::Truncated {
                read,
                expected: HEADER_LEN,
            });
        }
    }

    let header = FrameHeader::parse(&head).inspect_err(|err| {
        tracing::warn!(error = %err, "rejected frame header");
    })?;
    if header.body_len > max_frame_size {
        tracing::warn!(%header, max = max_frame_size, "rejected oversized frame");
        return Err(FrameError::TooLarge {
            len: header.body_len as usize,
            max: max_frame_size,
        });
    }

    let expected = header.body_len as usize;
    let mut data = pool.take(expected);
    data.resize(expected, 0);
    let read = match read_full(reader, &mut data).await {
        Ok(read) => read,
        Err(err) => {
            pool.recycle(data);
            return Err(err.into());
        }
    };
    if read < expected {
        pool.recycle(data);
        return Err(FrameError::Truncated { read, expected });
    }

    tracing::trace!(%header, "frame read");
    Ok(Frame {
        header,
        body: InboundBuf::pooled(data, Arc::clone(pool)),
    })
}

/// Fills `buf` from `reader`, stopping early only at end of stream.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
