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

//! Codec registry.
//!
//! The registry maps each [`CodecId`] to one backend. It is filled once at
//! startup through [`CodecRegistryBuilder`] and is read-only afterwards, so it
//! can be shared between any number of threads behind an `Arc` without
//! locking.

use crate::buffer::OutputBuf;
use crate::codec::{
    Codec, CodecId, DecodeError, EncodeError, GraphCodec, RegistryError, SchemaCodec,
    StreamCodec, UnknownCodecError,
};
use crate::config::{CodecConfig, ConfigError, CycleSafeTypes};
use crate::observability::CodecMetrics;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt;

/// The concrete backend behind an [`AnyCodec`].
#[derive(Debug)]
pub enum Backend {
    /// Object-graph codec.
    Graph(GraphCodec),
    /// Self-describing stream codec.
    Stream(StreamCodec),
    /// Schema-checked codec.
    Schema(SchemaCodec),
}

macro_rules! dispatch {
    ($backend:expr, $codec:ident => $call:expr) => {
        match $backend {
            Backend::Graph($codec) => $call,
            Backend::Stream($codec) => $call,
            Backend::Schema($codec) => $call,
        }
    };
}

/// A registered codec of any backend, with its call metrics.
///
/// `AnyCodec` implements [`Codec`] by forwarding to the wrapped backend.
#[derive(Debug)]
pub struct AnyCodec {
    backend: Backend,
    metrics: CodecMetrics,
}

impl AnyCodec {
    /// Wraps `backend`.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        let name = dispatch!(&backend, codec => codec.name());
        Self {
            backend,
            metrics: CodecMetrics::new(name),
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Call counters for this codec.
    #[must_use]
    pub fn metrics(&self) -> &CodecMetrics {
        &self.metrics
    }

    fn encode_failed(&self, err: EncodeError) -> EncodeError {
        self.metrics.record_encode_error();
        tracing::debug!(codec = self.name(), error = %err, "encode failed");
        err
    }

    fn decode_failed(&self, err: DecodeError) -> DecodeError {
        self.metrics.record_decode_error();
        tracing::debug!(codec = self.name(), error = %err, "decode failed");
        err
    }
}

impl From<GraphCodec> for AnyCodec {
    fn from(codec: GraphCodec) -> Self {
        Self::new(Backend::Graph(codec))
    }
}

impl From<StreamCodec> for AnyCodec {
    fn from(codec: StreamCodec) -> Self {
        Self::new(Backend::Stream(codec))
    }
}

impl From<SchemaCodec> for AnyCodec {
    fn from(codec: SchemaCodec) -> Self {
        Self::new(Backend::Schema(codec))
    }
}

impl fmt::Display for AnyCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl Codec for AnyCodec {
    fn id(&self) -> CodecId {
        dispatch!(&self.backend, codec => codec.id())
    }

    fn name(&self) -> &'static str {
        self.metrics.codec()
    }

    fn encode_into<'b, T, B>(&self, sink: &'b mut B, value: &T) -> Result<&'b mut B, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
        B: OutputBuf + ?Sized,
    {
        let before = sink.written();
        match dispatch!(&self.backend, codec => codec.encode_into(sink, value)) {
            Ok(sink) => {
                self.metrics
                    .record_encode(sink.written().saturating_sub(before));
                Ok(sink)
            }
            Err(err) => Err(self.encode_failed(err)),
        }
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
    {
        match dispatch!(&self.backend, codec => codec.encode(value)) {
            Ok(bytes) => {
                self.metrics.record_encode(bytes.len());
                Ok(bytes)
            }
            Err(err) => Err(self.encode_failed(err)),
        }
    }

    fn decode_slice<T>(&self, bytes: &[u8]) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + 'static,
    {
        match dispatch!(&self.backend, codec => codec.decode_slice(bytes)) {
            Ok(value) => {
                self.metrics.record_decode(bytes.len());
                Ok(value)
            }
            Err(err) => Err(self.decode_failed(err)),
        }
    }
}

/// Builder for [`CodecRegistry`].
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{CodecId, CodecRegistryBuilder, GraphCodec, StreamCodec};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = CodecRegistryBuilder::new()
///     .register(GraphCodec::default())?
///     .register(StreamCodec::default())?
///     .build();
/// assert_eq!(registry.ids(), vec![CodecId::STREAM, CodecId::GRAPH]);
///
/// // A second backend claiming an occupied identifier is refused.
/// let duplicate = CodecRegistryBuilder::new()
///     .register(GraphCodec::default())?
///     .register(GraphCodec::default());
/// assert!(duplicate.is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CodecRegistryBuilder {
    codecs: BTreeMap<CodecId, AnyCodec>,
}

impl CodecRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a codec under its own identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the identifier is taken.
    pub fn register(mut self, codec: impl Into<AnyCodec>) -> Result<Self, RegistryError> {
        let codec = codec.into();
        let id = codec.id();
        if let Some(existing) = self.codecs.get(&id) {
            return Err(RegistryError::Duplicate {
                id,
                existing: existing.name(),
                rejected: codec.name(),
            });
        }
        self.codecs.insert(id, codec);
        Ok(self)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> CodecRegistry {
        let registry = CodecRegistry {
            codecs: self.codecs,
        };
        tracing::debug!(codecs = %registry, "codec registry built");
        registry
    }
}

/// Immutable map from [`CodecId`] to codec.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use wirecodec::codec::{Codec, CodecId, CodecRegistry};
/// use wirecodec::config::{CodecConfig, CycleSafeTypes};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = Arc::new(CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new()));
///
/// let codec = registry.get(CodecId::SCHEMA)?;
/// let bytes = codec.encode(&42u32)?;
/// let value: u32 = registry.get(CodecId::SCHEMA)?.decode_slice(&bytes)?;
/// assert_eq!(value, 42);
///
/// assert!(registry.get(CodecId::new(0x7f)).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CodecRegistry {
    codecs: BTreeMap<CodecId, AnyCodec>,
}

impl CodecRegistry {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder::new()
    }

    /// Creates a registry holding the three built-in backends from a validated
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] of [`CodecConfig::validate`].
    pub fn try_standard(
        config: &CodecConfig,
        cycle_safe: CycleSafeTypes,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::standard(config, cycle_safe))
    }

    /// Creates a registry holding the three built-in backends.
    ///
    /// `config` is not validated; an inverted scratch policy is corrected by
    /// [`ScratchPool::new`](crate::buffer::ScratchPool::new). Use
    /// [`CodecRegistry::try_standard`] to reject it instead.
    #[must_use]
    pub fn standard(config: &CodecConfig, cycle_safe: CycleSafeTypes) -> Self {
        let codecs = [
            AnyCodec::from(SchemaCodec::new(config)),
            AnyCodec::from(StreamCodec::new(config)),
            AnyCodec::from(GraphCodec::new(config, cycle_safe)),
        ]
        .into_iter()
        .map(|codec| (codec.id(), codec))
        .collect();
        CodecRegistryBuilder { codecs }.build()
    }

    /// Looks up the codec registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownCodecError`] if nothing is registered under `id`.
    pub fn get(&self, id: CodecId) -> Result<&AnyCodec, UnknownCodecError> {
        self.codecs.get(&id).ok_or_else(|| {
            tracing::warn!(%id, "unknown codec requested");
            UnknownCodecError(id)
        })
    }

    /// Returns `true` if a codec is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: CodecId) -> bool {
        self.codecs.contains_key(&id)
    }

    /// Registered identifiers in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<CodecId> {
        self.codecs.keys().copied().collect()
    }

    /// Number of registered codecs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if no codec is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Iterates over the registered codecs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AnyCodec> {
        self.codecs.values()
    }
}

impl fmt::Display for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, codec) in self.codecs.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{codec}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn standard() -> CodecRegistry {
        CodecRegistry::standard(&CodecConfig::default(), CycleSafeTypes::new())
    }

    #[test]
    fn test_standard_registry_ids() {
        let registry = standard();
        assert_eq!(
            registry.ids(),
            vec![CodecId::SCHEMA, CodecId::STREAM, CodecId::GRAPH]
        );
        assert_eq!(registry.len(), 3);
        for codec in registry.iter() {
            assert_eq!(registry.get(codec.id()).unwrap().name(), codec.name());
        }
    }

    #[test]
    fn test_unknown_codec() {
        let registry = standard();
        let error = registry.get(CodecId::new(0x09)).unwrap_err();
        assert_eq!(error, UnknownCodecError(CodecId::new(0x09)));
        assert_eq!(registry.len(), 3);
        assert!(!registry.contains(CodecId::new(0x09)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let result = CodecRegistry::builder()
            .register(StreamCodec::default())
            .unwrap()
            .register(StreamCodec::default());
        assert!(matches!(
            result,
            Err(RegistryError::Duplicate { id, existing: "stream", rejected: "stream" })
                if id == CodecId::STREAM
        ));
    }

    #[test]
    fn test_metrics_recorded_per_codec() {
        let registry = standard();
        let codec = registry.get(CodecId::GRAPH).unwrap();
        let bytes = codec.encode(&vec![1u16, 2, 3]).unwrap();
        let _: Vec<u16> = codec.decode_slice(&bytes).unwrap();
        assert!(codec.decode_slice::<Vec<u16>>(&bytes[..1]).is_err());

        let snapshot = codec.metrics().snapshot();
        assert_eq!(snapshot.encodes, 1);
        assert_eq!(snapshot.bytes_encoded, bytes.len() as u64);
        assert_eq!(snapshot.decodes, 1);
        assert_eq!(snapshot.decode_errors, 1);

        let untouched = registry.get(CodecId::STREAM).unwrap().metrics().snapshot();
        assert_eq!(untouched.encodes, 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let registry = Arc::new(standard());
        let handles: Vec<_> = registry
            .ids()
            .into_iter()
            .map(|id| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let codec = registry.get(id).unwrap();
                    let bytes = codec.encode(&format!("via {id}")).unwrap();
                    codec.decode_slice::<String>(&bytes).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().starts_with("via"));
        }
    }

    #[test]
    fn test_try_standard_validates_config() {
        let config = CodecConfig::default().with_scratch(crate::config::ScratchConfig {
            default_size: 4096,
            max_retained: 64,
        });
        let error = CodecRegistry::try_standard(&config, CycleSafeTypes::new()).unwrap_err();
        assert!(matches!(error, ConfigError::Invalid { key: "scratch.max_retained", .. }));

        let registry = CodecRegistry::standard(&config, CycleSafeTypes::new());
        for codec in registry.iter() {
            let scratch = match codec.backend() {
                Backend::Graph(codec) => codec.scratch(),
                Backend::Schema(codec) => codec.scratch(),
                Backend::Stream(codec) => codec.scratch(),
            };
            assert_eq!(scratch.config().max_retained, 4096);
        }

        assert!(CodecRegistry::try_standard(&CodecConfig::default(), CycleSafeTypes::new()).is_ok());
    }

    #[test]
    fn test_display_lists_codecs() {
        let rendered = standard().to_string();
        assert_eq!(
            rendered,
            "[schema (Codec(0x01)), stream (Codec(0x02)), graph (Codec(0x03))]"
        );
    }
}
