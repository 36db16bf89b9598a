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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! # wirecodec - Pluggable RPC Payload Codecs
//!
//! wirecodec turns call arguments and results into bytes and back for an RPC
//! transport. Several interchangeable codecs coexist in one process; every
//! payload is tagged with the one-byte identifier of the codec that produced
//! it, so the receiver always decodes with the right one.
//!
//! - **Pluggable codecs**: implement [`Codec`] and register it under a [`CodecId`]
//! - **Zero-copy paths**: encode straight into a transport's outbound buffer
//! - **Bounded scratch memory**: per-thread buffers are reset and capped after every use
//! - **Exactly-once release**: inbound buffers go back to the transport whatever the outcome
//! - **Cycle-safe graphs**: selected types keep shared and cyclic references intact
//! - **Schema checks**: payloads carry a fingerprint of the type that wrote them
//!
//! ## Architecture
//!
//! - **[`codec`]**: the [`Codec`] contract, the [`CodecRegistry`] and the three backends
//! - **[`buffer`]**: outbound/inbound buffer views, the scratch pool and the frame pool
//! - **[`envelope`]**: request and response envelopes carrying codec id plus payload
//! - **[`framing`]**: the frame header and async frame reads and writes
//! - **[`config`]**: codec configuration with environment overrides
//! - **[`observability`]**: per-codec counters
//! - **[`error`]**: the crate-wide [`Error`]
//!
//! ## Codecs
//!
//! | Id     | Name     | Format                                   |
//! |--------|----------|------------------------------------------|
//! | `0x01` | `schema` | schema fingerprint + compact binary body |
//! | `0x02` | `stream` | JSON written through a buffered stream   |
//! | `0x03` | `graph`  | compact binary with reference tracking   |
//!
//! ## Features
//!
//! - **`observability`**: export codec counters through the `metrics` facade
//!
//! ## Safety
//!
//! wirecodec is written in 100% safe Rust with `#![deny(unsafe_code)]`.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod observability;

pub use codec::{Codec, CodecId, CodecRegistry, CodecRegistryBuilder, DecodeError, EncodeError};
pub use config::{CodecConfig, CycleSafeTypes, ScratchConfig};
pub use envelope::{Request, Response};
pub use error::Error;
pub use observability::{CodecMetrics, CodecMetricsSnapshot};
