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

//! Shared graph edges and the per-call reference tables behind them.
//!
//! A [`GraphRef`] serializes as a pair `(id, Option<value>)`:
//!
//! - With reference tracking off, `id` is `0` and the value is written inline
//!   every time it is reached.
//! - With reference tracking on, every distinct node gets an id starting at
//!   `1`. The first occurrence carries the value; later occurrences carry
//!   `None` and point back at the id.
//!
//! The tables live in thread-local storage and are scoped to one codec call by
//! [`EncodeScope`] and [`DecodeScope`]. Entering a scope saves whatever table
//! was active and dropping the scope restores it, so nested codec calls on the
//! same thread do not see each other's ids.

use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::ser::{self, SerializeTuple};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};
use std::thread::LocalKey;

/// Nesting limit for [`GraphRef`]s.
///
/// Encoding without reference tracking treats a deeper chain as a cycle.
/// Decoding rejects a deeper chain in every mode.
pub const MAX_GRAPH_DEPTH: u32 = 256;

thread_local! {
    static ENCODE_TABLE: RefCell<Option<EncodeTable>> = const { RefCell::new(None) };
    static DECODE_TABLE: RefCell<Option<DecodeTable>> = const { RefCell::new(None) };
    static ENCODE_DEPTH: Cell<u32> = const { Cell::new(0) };
    static DECODE_DEPTH: Cell<u32> = const { Cell::new(0) };
    static DEPTH_EXCEEDED: Cell<bool> = const { Cell::new(false) };
}

/// Clears and returns whether the last codec call on this thread hit
/// [`MAX_GRAPH_DEPTH`].
///
/// serde formats keep only a generic message for custom errors, so the codec
/// reads this flag to report the real reason.
pub(crate) fn take_depth_exceeded() -> bool {
    DEPTH_EXCEEDED.with(|flag| flag.replace(false))
}

#[derive(Default)]
struct EncodeTable {
    ids: HashMap<usize, u32>,
    next: u32,
}

#[derive(Default)]
struct DecodeTable {
    nodes: HashMap<u32, Box<dyn Any>>,
}

/// A shared, possibly cyclic edge in an object graph.
///
/// Clones point at the same node. A node may be created empty with
/// [`GraphRef::pending`] and filled in later, which is how cycles are built.
///
/// # Example
///
/// ```rust
/// use wirecodec::codec::GraphRef;
///
/// let a = GraphRef::new(7u32);
/// let b = a.clone();
/// assert!(a.ptr_eq(&b));
/// assert_eq!(b.get(), Some(&7));
/// ```
pub struct GraphRef<T> {
    node: Arc<OnceLock<T>>,
}

impl<T> GraphRef<T> {
    /// Creates a node holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            node: Arc::new(OnceLock::from(value)),
        }
    }

    /// Creates an empty node to be filled with [`GraphRef::set`].
    pub fn pending() -> Self {
        Self {
            node: Arc::new(OnceLock::new()),
        }
    }

    /// Fills an empty node. Returns the value back if the node was already set.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` if the node already holds a value.
    pub fn set(&self, value: T) -> Result<(), T> {
        self.node.set(value)
    }

    /// The node's value, or `None` if it was never filled.
    pub fn get(&self) -> Option<&T> {
        self.node.get()
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.node) as usize
    }
}

impl<T> Clone for GraphRef<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for GraphRef<T> {
    // Cycles make the derived form unbounded; print identity only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphRef")
            .field("node", &Arc::as_ptr(&self.node))
            .field("set", &self.node.get().is_some())
            .finish()
    }
}

/// Reference-tracking state for one encode call.
pub(crate) struct EncodeScope {
    previous: Option<EncodeTable>,
}

impl EncodeScope {
    pub(crate) fn enter(tracking: bool) -> Self {
        DEPTH_EXCEEDED.with(|flag| flag.set(false));
        let table = tracking.then(EncodeTable::default);
        let previous = ENCODE_TABLE.with(|slot| slot.replace(table));
        Self { previous }
    }
}

impl Drop for EncodeScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ENCODE_TABLE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Reference-tracking state for one decode call.
pub(crate) struct DecodeScope {
    previous: Option<DecodeTable>,
}

impl DecodeScope {
    pub(crate) fn enter(tracking: bool) -> Self {
        DEPTH_EXCEEDED.with(|flag| flag.set(false));
        let table = tracking.then(DecodeTable::default);
        let previous = DECODE_TABLE.with(|slot| slot.replace(table));
        Self { previous }
    }
}

impl Drop for DecodeScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Replace first so the old table's nodes are dropped outside the borrow.
        let finished = DECODE_TABLE.with(|slot| slot.replace(previous));
        drop(finished);
    }
}

/// Where a node stands in the active encode table.
enum Seen {
    Untracked,
    First(u32),
    Again(u32),
}

fn lookup_or_assign(addr: usize) -> Seen {
    ENCODE_TABLE.with(|slot| match slot.borrow_mut().as_mut() {
        None => Seen::Untracked,
        Some(table) => match table.ids.get(&addr) {
            Some(&id) => Seen::Again(id),
            None => {
                table.next += 1;
                table.ids.insert(addr, table.next);
                Seen::First(table.next)
            }
        },
    })
}

/// One level of [`GraphRef`] nesting, released on drop.
struct DepthGuard {
    counter: &'static LocalKey<Cell<u32>>,
}

impl DepthGuard {
    /// Returns `None` and raises the thread's overflow flag at the limit.
    fn enter(counter: &'static LocalKey<Cell<u32>>) -> Option<Self> {
        let entered = counter.with(|depth| {
            if depth.get() >= MAX_GRAPH_DEPTH {
                false
            } else {
                depth.set(depth.get() + 1);
                true
            }
        });
        if !entered {
            DEPTH_EXCEEDED.with(|flag| flag.set(true));
            return None;
        }
        Some(Self { counter })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.counter
            .with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl<T: Serialize + 'static> Serialize for GraphRef<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        match lookup_or_assign(self.addr()) {
            Seen::Again(id) => {
                pair.serialize_element(&id)?;
                pair.serialize_element(&None::<&T>)?;
            }
            Seen::First(id) => {
                pair.serialize_element(&id)?;
                pair.serialize_element(&self.get())?;
            }
            Seen::Untracked => {
                let Some(_depth) = DepthGuard::enter(&ENCODE_DEPTH) else {
                    return Err(ser::Error::custom(format!(
                        "graph nested deeper than {MAX_GRAPH_DEPTH} references \
                         without reference tracking; the value is probably cyclic"
                    )));
                };
                pair.serialize_element(&0u32)?;
                pair.serialize_element(&self.get())?;
            }
        }
        pair.end()
    }
}

/// Result of resolving an id against the active decode table.
enum Resolved<T> {
    Untracked,
    Known(GraphRef<T>),
    Fresh(GraphRef<T>),
}

fn resolve<T: 'static>(id: u32) -> Result<Resolved<T>, &'static str> {
    if id == 0 {
        return Ok(Resolved::Untracked);
    }
    DECODE_TABLE.with(|slot| match slot.borrow_mut().as_mut() {
        None => Ok(Resolved::Untracked),
        Some(table) => match table.nodes.get(&id) {
            Some(node) => node
                .downcast_ref::<GraphRef<T>>()
                .map(|node| Resolved::Known(node.clone()))
                .ok_or("back reference points at a node of another type"),
            None => {
                let node = GraphRef::pending();
                table.nodes.insert(id, Box::new(node.clone()));
                Ok(Resolved::Fresh(node))
            }
        },
    })
}

struct GraphRefVisitor<T>(PhantomData<T>);

impl<'de, T: DeserializeOwned + 'static> Visitor<'de> for GraphRefVisitor<T> {
    type Value = GraphRef<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a graph reference pair")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let Some(_depth) = DepthGuard::enter(&DECODE_DEPTH) else {
            return Err(de::Error::custom(format!(
                "graph nested deeper than {MAX_GRAPH_DEPTH} references"
            )));
        };
        let id: u32 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        // Register before reading the body so references back to this node
        // from inside it resolve to the same handle.
        let resolved = resolve::<T>(id).map_err(de::Error::custom)?;
        let body: Option<T> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        match resolved {
            Resolved::Known(node) => {
                if body.is_some() {
                    return Err(de::Error::custom("back reference carries a value"));
                }
                Ok(node)
            }
            Resolved::Fresh(node) => {
                if let Some(value) = body {
                    node.set(value)
                        .map_err(|_| de::Error::custom("graph node decoded twice"))?;
                }
                Ok(node)
            }
            Resolved::Untracked => Ok(body.map_or_else(GraphRef::pending, GraphRef::new)),
        }
    }
}

impl<'de, T: DeserializeOwned + 'static> Deserialize<'de> for GraphRef<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(2, GraphRefVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_then_set() {
        let node = GraphRef::pending();
        assert!(node.get().is_none());
        assert!(node.set(3u8).is_ok());
        assert_eq!(node.set(4u8), Err(4));
        assert_eq!(node.get(), Some(&3));
    }

    #[test]
    fn test_untracked_writes_zero_id() {
        let bytes = postcard::to_allocvec(&GraphRef::new(5u8)).unwrap();
        // id 0, Some, 5
        assert_eq!(bytes, vec![0, 1, 5]);
    }

    #[test]
    fn test_tracked_shared_node_written_once() {
        let shared = GraphRef::new(9u8);
        let pair = (shared.clone(), shared);
        let bytes = {
            let _scope = EncodeScope::enter(true);
            postcard::to_allocvec(&pair).unwrap()
        };
        assert_eq!(bytes, vec![1, 1, 9, 1, 0]);

        let decoded: (GraphRef<u8>, GraphRef<u8>) = {
            let _scope = DecodeScope::enter(true);
            postcard::from_bytes(&bytes).unwrap()
        };
        assert!(decoded.0.ptr_eq(&decoded.1));
        assert_eq!(decoded.0.get(), Some(&9));
    }

    #[test]
    fn test_scope_restores_previous_table() {
        let _outer = EncodeScope::enter(true);
        {
            let _inner = EncodeScope::enter(false);
            assert!(matches!(lookup_or_assign(1), Seen::Untracked));
        }
        assert!(matches!(lookup_or_assign(1), Seen::First(1)));
        assert!(matches!(lookup_or_assign(1), Seen::Again(1)));
    }

    #[derive(Serialize, Deserialize)]
    struct Link {
        next: Option<GraphRef<Link>>,
    }

    #[test]
    fn test_depth_guard_releases_and_flags_overflow() {
        let guards: Vec<_> = (0..MAX_GRAPH_DEPTH)
            .map(|_| DepthGuard::enter(&DECODE_DEPTH).unwrap())
            .collect();
        assert!(DepthGuard::enter(&DECODE_DEPTH).is_none());
        assert!(take_depth_exceeded());
        assert!(!take_depth_exceeded());

        drop(guards);
        assert_eq!(DECODE_DEPTH.with(Cell::get), 0);
        assert!(DepthGuard::enter(&DECODE_DEPTH).is_some());
    }

    #[test]
    fn test_deeply_nested_input_rejected_in_both_modes() {
        // The limit is reached by recursion; give it a known stack.
        std::thread::Builder::new()
            .stack_size(32 * 1024 * 1024)
            .spawn(|| {
                // id 0, Some(Link), Some(next) repeated far past the limit.
                let bytes = [0u8, 1, 1].repeat(100_000);
                for tracking in [false, true] {
                    let _scope = DecodeScope::enter(tracking);
                    let result = postcard::from_bytes::<GraphRef<Link>>(&bytes);
                    assert!(result.is_err());
                    assert!(take_depth_exceeded());
                    assert_eq!(DECODE_DEPTH.with(Cell::get), 0);
                }

                // Fresh ids 1, 2, 3 ... recurse the same way with tracking on.
                let mut bytes = Vec::new();
                for id in 1..=1000u32 {
                    bytes.extend(postcard::to_allocvec(&id).unwrap());
                    bytes.extend_from_slice(&[1, 1]);
                }
                let _scope = DecodeScope::enter(true);
                assert!(postcard::from_bytes::<GraphRef<Link>>(&bytes).is_err());
                assert!(take_depth_exceeded());
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn test_back_reference_to_wrong_type_fails() {
        // (node 1 = u8 5), then a back reference to node 1 read as a String node.
        let bytes = [1u8, 1, 5, 1, 0];
        let _scope = DecodeScope::enter(true);
        let result = postcard::from_bytes::<(GraphRef<u8>, GraphRef<String>)>(&bytes);
        assert!(result.is_err());
    }
}
