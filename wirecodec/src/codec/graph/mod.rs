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

//! Object-graph codec.
//!
//! [`GraphCodec`] writes values in the compact postcard format. Types listed in
//! its [`CycleSafeTypes`] are encoded with reference tracking switched on, so
//! every [`GraphRef`] node inside them is written once and shared or cyclic
//! edges survive the round trip. Every other type takes the default path with
//! reference tracking off.

mod refs;

pub use refs::{GraphRef, MAX_GRAPH_DEPTH};

use crate::buffer::{OutputBuf, ScratchPool};
use crate::codec::{Codec, CodecId, DecodeError, EncodeError};
use crate::config::{CodecConfig, CycleSafeTypes};
use refs::{DecodeScope, EncodeScope};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::{TypeId, type_name};

const NAME: &str = "graph";

/// Postcard codec with opt-in reference tracking.
///
/// # Examples
///
/// ```rust
/// use wirecodec::codec::{Codec, GraphCodec, GraphRef};
/// use wirecodec::config::{CodecConfig, CycleSafeTypes};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Pair { left: GraphRef<String>, right: GraphRef<String> }
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = GraphCodec::new(&CodecConfig::default(), CycleSafeTypes::new().with::<Pair>());
/// let shared = GraphRef::new("shared".to_string());
/// let bytes = codec.encode(&Pair { left: shared.clone(), right: shared })?;
/// let pair: Pair = codec.decode_slice(&bytes)?;
/// assert!(pair.left.ptr_eq(&pair.right));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GraphCodec {
    cycle_safe: CycleSafeTypes,
    scratch: ScratchPool,
    max_decode_size: Option<usize>,
}

impl GraphCodec {
    /// Creates a codec routing the types in `cycle_safe` to reference tracking.
    ///
    /// The set is fixed for the codec's lifetime.
    #[must_use]
    pub fn new(config: &CodecConfig, cycle_safe: CycleSafeTypes) -> Self {
        Self {
            cycle_safe,
            scratch: ScratchPool::new(config.scratch.clone()),
            max_decode_size: config.max_decode_size,
        }
    }

    /// Returns `true` if values of type `T` are encoded with reference tracking.
    #[must_use]
    pub fn tracks_references<T: ?Sized + 'static>(&self) -> bool {
        self.cycle_safe.contains_id(TypeId::of::<T>())
    }

    /// The types routed to reference tracking.
    #[must_use]
    pub fn cycle_safe(&self) -> &CycleSafeTypes {
        &self.cycle_safe
    }

    /// The scratch pool serving [`Codec::encode`].
    #[must_use]
    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }
}

impl Default for GraphCodec {
    fn default() -> Self {
        Self::new(&CodecConfig::default(), CycleSafeTypes::default())
    }
}

impl Codec for GraphCodec {
    fn id(&self) -> CodecId {
        CodecId::GRAPH
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn encode_into<'b, T, B>(&self, sink: &'b mut B, value: &T) -> Result<&'b mut B, EncodeError>
    where
        T: Serialize + ?Sized + 'static,
        B: OutputBuf + ?Sized,
    {
        let _refs = EncodeScope::enter(self.tracks_references::<T>());
        postcard::to_io(value, sink.writer())
            .map(drop)
            .map_err(|err| {
                if refs::take_depth_exceeded() {
                    EncodeError::unsupported(
                        NAME,
                        type_name::<T>(),
                        format!(
                            "graph nested deeper than {MAX_GRAPH_DEPTH} references \
                             without reference tracking; the value is probably cyclic"
                        ),
                    )
                } else {
                    EncodeError::from_postcard(NAME, type_name::<T>(), err)
                }
            })?;
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
        if let Some(max) = self.max_decode_size {
            if bytes.len() > max {
                return Err(DecodeError::TooLarge {
                    codec: NAME,
                    size: bytes.len(),
                    max,
                });
            }
        }

        let _refs = DecodeScope::enter(self.tracks_references::<T>());
        let (value, rest) = postcard::take_from_bytes::<T>(bytes).map_err(|err| {
            if refs::take_depth_exceeded() {
                DecodeError::Malformed {
                    codec: NAME,
                    type_name: type_name::<T>(),
                    source: format!("graph nested deeper than {MAX_GRAPH_DEPTH} references").into(),
                }
            } else {
                DecodeError::from_postcard(NAME, type_name::<T>(), err)
            }
        })?;
        if !rest.is_empty() {
            return Err(DecodeError::Malformed {
                codec: NAME,
                type_name: type_name::<T>(),
                source: format!("{} trailing bytes after value", rest.len()).into(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{InboundBuf, InputBuf};
    use bytes::BytesMut;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Account {
        id: u64,
        owner: String,
        tags: Vec<String>,
    }

    #[derive(Serialize, Deserialize)]
    struct Node {
        label: String,
        next: Option<GraphRef<Node>>,
    }

    struct FailsToSerialize;

    impl Serialize for FailsToSerialize {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refused"))
        }
    }

    fn cyclic_pair() -> GraphRef<Node> {
        let first = GraphRef::pending();
        let second = GraphRef::new(Node {
            label: "second".to_string(),
            next: Some(first.clone()),
        });
        first
            .set(Node {
                label: "first".to_string(),
                next: Some(second),
            })
            .ok()
            .unwrap();
        first
    }

    #[test]
    fn test_round_trip_record() {
        let codec = GraphCodec::default();
        let account = Account {
            id: 7,
            owner: "ada".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
        };
        let bytes = codec.encode(&account).unwrap();
        let decoded: Account = codec.decode_slice(&bytes).unwrap();
        assert_eq!(decoded, account);
    }

    #[test]
    fn test_encode_into_appends_to_sink() {
        let codec = GraphCodec::default();
        let mut sink = BytesMut::from(&b"hdr"[..]);
        codec.encode_into(&mut sink, &42u32).unwrap();
        assert_eq!(&sink[..3], b"hdr");
        let value: u32 = codec.decode_range(&sink, 3, sink.len() - 3).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_cycle_preserved_with_tracking() {
        let codec = GraphCodec::new(
            &CodecConfig::default(),
            CycleSafeTypes::new().with::<GraphRef<Node>>(),
        );
        let bytes = codec.encode(&cyclic_pair()).unwrap();
        let first: GraphRef<Node> = codec.decode_slice(&bytes).unwrap();

        let first_node = first.get().unwrap();
        assert_eq!(first_node.label, "first");
        let second = first_node.next.as_ref().unwrap();
        let second_node = second.get().unwrap();
        assert_eq!(second_node.label, "second");
        assert!(second_node.next.as_ref().unwrap().ptr_eq(&first));
    }

    #[test]
    fn test_cycle_rejected_without_tracking() {
        // Run on a large stack; the depth limit is reached by recursion.
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                let codec = GraphCodec::default();
                let error = codec.encode(&cyclic_pair()).unwrap_err();
                assert!(error.is_unsupported(), "{error}");
                assert!(error.to_string().contains("nested deeper than"), "{error}");
                assert!(error.to_string().contains("probably cyclic"), "{error}");

                // The overflow is reported once; the next failure is unrelated.
                let error = codec.encode(&FailsToSerialize).unwrap_err();
                assert!(!error.to_string().contains("nested deeper"), "{error}");
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn test_deeply_nested_input_is_decode_error() {
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                // id 0, Some(Node), empty label, Some(next) repeated.
                let bytes = [0u8, 1, 0, 1].repeat(50_000);
                for codec in [
                    GraphCodec::default(),
                    GraphCodec::new(
                        &CodecConfig::default(),
                        CycleSafeTypes::new().with::<GraphRef<Node>>(),
                    ),
                ] {
                    let error = codec.decode_slice::<GraphRef<Node>>(&bytes).unwrap_err();
                    assert!(matches!(error, DecodeError::Malformed { .. }), "{error}");
                    assert!(error.to_string().contains("nested deeper than"), "{error}");
                }
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let codec = GraphCodec::default();
        let mut bytes = codec.encode(&1u8).unwrap();
        bytes.push(0);
        let result: Result<u8, _> = codec.decode_slice(&bytes);
        assert!(matches!(result, Err(DecodeError::Malformed { .. })));
    }

    #[test]
    fn test_max_decode_size() {
        let config = CodecConfig::default().with_max_decode_size(4);
        let codec = GraphCodec::new(&config, CycleSafeTypes::new());
        let bytes = codec.encode(&"longer than four").unwrap();
        let result: Result<String, _> = codec.decode_slice(&bytes);
        assert!(matches!(result, Err(DecodeError::TooLarge { size, max: 4, .. }) if size == bytes.len()));
    }

    #[test]
    fn test_truncated_input_releases_buffer() {
        let codec = GraphCodec::default();
        let bytes = codec.encode(&"hello".to_string()).unwrap();
        let pool = std::sync::Arc::new(crate::buffer::FramePool::new());
        let mut storage = pool.take(256);
        storage.extend_from_slice(&bytes[..bytes.len() - 2]);
        let inbound = InboundBuf::pooled(storage, std::sync::Arc::clone(&pool));
        assert_eq!(inbound.chunk().len(), bytes.len() - 2);

        let error = codec.decode::<String, _>(inbound).unwrap_err();
        assert!(error.is_truncated());
        assert_eq!(pool.pooled(), 1);
    }
}
