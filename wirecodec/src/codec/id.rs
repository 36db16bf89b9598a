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

//! Codec identifier type.

use std::fmt;

/// The single-byte tag that selects a codec on the wire.
///
/// Every registered backend owns exactly one identifier. Identifiers are
/// persisted implicitly in every frame header, so the values assigned to the
/// built-in backends must never change.
///
/// # Example
///
/// ```rust
/// use wirecodec::codec::CodecId;
///
/// let id = CodecId::from(0x03);
/// assert_eq!(id, CodecId::GRAPH);
/// assert_eq!(id.as_u8(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct CodecId(u8);

impl CodecId {
    /// Reserved identifier marking a frame without a payload.
    ///
    /// No backend is ever registered under it.
    pub const NONE: Self = Self(0x00);

    /// Identifier of the schema-based structural codec.
    pub const SCHEMA: Self = Self(0x01);

    /// Identifier of the streaming codec.
    pub const STREAM: Self = Self(0x02);

    /// Identifier of the object-graph codec.
    pub const GRAPH: Self = Self(0x03);

    /// Creates an identifier from a raw byte.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Returns the raw byte written to the wire.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl From<u8> for CodecId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<CodecId> for u8 {
    fn from(id: CodecId) -> Self {
        id.0
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Codec(0x{:02x})", self.0)
    }
}
