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

//! Pluggable wire codecs.
//!
//! This module defines the [`Codec`] contract, the built-in backends, and the
//! [`CodecRegistry`] that selects a backend by its one-byte [`CodecId`].
//!
//! # Built-in Backends
//!
//! | Codec           | Id     | Format                          | Use when                            |
//! |-----------------|--------|---------------------------------|-------------------------------------|
//! | [`SchemaCodec`] | `0x01` | fingerprint + postcard          | both peers share the message types  |
//! | [`StreamCodec`] | `0x02` | JSON                            | peers evolve independently          |
//! | [`GraphCodec`]  | `0x03` | postcard with optional back-refs| values contain shared or cyclic refs|
//!
//! # Choosing a Codec at Runtime
//!
//! ```rust
//! use wirecodec::codec::{Codec, CodecId, CodecRegistry};
//! use wirecodec::config::{CodecConfig, CycleSafeTypes};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new());
//!
//! // The sender picks a codec and transmits its id with the payload.
//! let id = CodecId::STREAM;
//! let payload = registry.get(id)?.encode(&vec!["a", "b"])?;
//!
//! // The receiver selects the decoder from the id alone.
//! let values: Vec<String> = registry.get(id)?.decode_slice(&payload)?;
//! assert_eq!(values, ["a", "b"]);
//! # Ok(())
//! # }
//! ```

mod error;
mod graph;
mod id;
mod registry;
mod schema;
mod stream;
mod traits;

pub use error::{BoxError, DecodeError, EncodeError, RegistryError, UnknownCodecError};
pub use graph::{GraphCodec, GraphRef, MAX_GRAPH_DEPTH};
pub use id::CodecId;
pub use registry::{AnyCodec, Backend, CodecRegistry, CodecRegistryBuilder};
pub use schema::{FINGERPRINT_LEN, Schema, SchemaCodec, SchemaKind};
pub use stream::StreamCodec;
pub use traits::Codec;
