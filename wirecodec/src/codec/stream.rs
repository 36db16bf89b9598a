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

//! Self-describing stream codec.
//!
//! [`StreamCodec`] writes JSON through a buffered writer opened over the sink for
//! the duration of a single call. The format carries field names, so peers need
//! no shared type registration, at the cost of larger payloads than the binary
//! codecs.

use crate::buffer::{OutputBuf, ScratchPool};
use crate::codec::{Codec, CodecId, DecodeError, EncodeError};
use crate::config::CodecConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::type_name;
use std::io::{self, Write};

const NAME: &str = "stream";

/// JSON codec over a per-call buffered stream.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{Codec, StreamCodec};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Ping { seq: u32 }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = StreamCodec::default();
/// let bytes = codec.encode(&Ping { seq: 3 })?;
/// assert_eq!(bytes, br#"{"seq":3}"#);
/// let ping: Ping = codec.decode_slice(&bytes)?;
/// assert_eq!(ping, Ping { seq: 3 });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamCodec {
    buffer_size: usize,
    pretty: bool,
    scratch: ScratchPool,
}

impl StreamCodec {
    /// Creates a codec from `config`.
    #[must_use]
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            buffer_size: config.stream_buffer_size.max(1),
            pretty: config.pretty_json,
            scratch: ScratchPool::new(config.scratch.clone()),
        }
    }

    /// Returns `true` if output is indented.
    #[must_use]
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// The scratch pool serving [`Codec::encode`].
    #[must_use]
    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl Codec for StreamCodec {
    fn id(&self) -> CodecId {
        CodecId::STREAM
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode_into<'b, T, B>(&self, sink: &'b mut B, value: &T) -> Result<&'b mut B, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
        B: OutputBuf + ?Sized,
    {
        // The stream is dropped on every return path; on error whatever it
        // buffered is flushed into the sink by its destructor.
        let mut stream = io::BufWriter::with_capacity(self.buffer_size, sink.writer());
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut stream, value)
        } else {
            serde_json::to_writer(&mut stream, value)
        };
        written.map_err(|err| EncodeError::from_json(NAME, type_name::<T>(), err))?;
        stream
            .flush()
            .map_err(|source| EncodeError::Sink { codec: NAME, source })?;
        drop(stream);
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
        let mut stream = serde_json::Deserializer::from_reader(bytes);
        let value = T::deserialize(&mut stream)
            .map_err(|err| DecodeError::from_json(NAME, type_name::<T>(), err))?;
        // Only whitespace may follow the value.
        stream
            .end()
            .map_err(|err| DecodeError::from_json(NAME, type_name::<T>(), err))?;
        Ok(value)
    }
}
