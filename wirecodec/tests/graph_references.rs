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


//! Integration tests for reference tracking in the graph codec.

use serde::{Deserialize, Serialize};
use wirecodec::codec::{Backend, GraphCodec, GraphRef};
use wirecodec::{Codec, CodecConfig, CodecId, CodecRegistry, CycleSafeTypes};

#[derive(Serialize, Deserialize)]
struct Employee {
    name: String,
    manager: Option<GraphRef<Employee>>,
    reports: Vec<GraphRef<Employee>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Team {
    lead: GraphRef<Employee>,
    members: Vec<GraphRef<Employee>>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Plain {
    values: Vec<u16>,
}

fn employee(name: &str, manager: Option<GraphRef<Employee>>) -> GraphRef<Employee> {
    GraphRef::new(Employee {
        name: name.to_string(),
        manager,
        reports: Vec::new(),
    })
}

/// A lead who lists both members as reports, each pointing back at the lead.
fn team() -> Team {
    let lead = GraphRef::pending();
    let alice = employee("alice", Some(lead.clone()));
    let bob = employee("bob", Some(lead.clone()));
    lead.set(Employee {
        name: "lead".to_string(),
        manager: None,
        reports: vec![alice.clone(), bob.clone()],
    })
    .ok()
    .unwrap();
    Team {
        lead,
        members: vec![alice, bob],
    }
}

fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|window| *window == needle).count()
}

fn registry() -> CodecRegistry {
    CodecRegistry::standard(
        &CodecConfig::default(),
        CycleSafeTypes::new().with::<Team>(),
    )
}

#[test]
fn test_cycles_keep_identity_through_registry() {
    let sender = registry();
    let receiver = registry();

    let bytes = sender.get(CodecId::GRAPH).unwrap().encode(&team()).unwrap();
    let decoded: Team = receiver
        .get(CodecId::GRAPH)
        .unwrap()
        .decode_slice(&bytes)
        .unwrap();

    let lead = decoded.lead.get().unwrap();
    assert_eq!(lead.name, "lead");
    assert_eq!(lead.reports.len(), 2);
    for (report, member) in lead.reports.iter().zip(&decoded.members) {
        assert!(report.ptr_eq(member));
        let manager = member.get().unwrap().manager.as_ref().unwrap();
        assert!(manager.ptr_eq(&decoded.lead));
    }
    assert!(!decoded.members[0].ptr_eq(&decoded.members[1]));
}

#[test]
fn test_shared_nodes_written_once() {
    let codec = GraphCodec::new(&CodecConfig::default(), CycleSafeTypes::new().with::<Team>());
    let bytes = codec.encode(&team()).unwrap();

    for name in ["lead", "alice", "bob"] {
        assert_eq!(occurrences(&bytes, name.as_bytes()), 1, "{name}");
    }
}

#[test]
fn test_untracked_types_use_plain_path() {
    let registry = registry();
    let graph = registry.get(CodecId::GRAPH).unwrap();
    let value = Plain {
        values: vec![1, 2, 3],
    };
    let bytes = graph.encode(&value).unwrap();
    let decoded: Plain = graph.decode_slice(&bytes).unwrap();
    assert_eq!(decoded, value);

    match graph.backend() {
        Backend::Graph(codec) => {
            assert!(codec.tracks_references::<Team>());
            assert!(!codec.tracks_references::<Plain>());
        }
        _ => panic!("graph id must map to the graph backend"),
    }
}

#[test]
fn test_acyclic_refs_round_trip_without_tracking() {
    let codec = GraphCodec::default();
    let shared = employee("solo", None);
    let pair = (shared.clone(), shared);

    let bytes = codec.encode(&pair).unwrap();
    let (left, right): (GraphRef<Employee>, GraphRef<Employee>) = codec.decode_slice(&bytes).unwrap();

    // Without tracking the shared node is duplicated.
    assert_eq!(left.get().unwrap().name, "solo");
    assert_eq!(right.get().unwrap().name, "solo");
    assert!(!left.ptr_eq(&right));
}

#[test]
fn test_cycle_without_tracking_is_rejected() {
    std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(|| {
            let codec = GraphCodec::default();
            let error = codec.encode(&team()).unwrap_err();
            assert!(error.is_unsupported(), "{error}");
            assert!(error.to_string().contains("probably cyclic"), "{error}");
        })
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_deeply_nested_input_is_rejected() {
    std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(|| {
            // Each repeat is id 0, Some(Employee), empty name, Some(manager).
            let bytes = [0u8, 1, 0, 1].repeat(200_000);

            let registry = registry();
            let tracked = registry.get(CodecId::GRAPH).unwrap();
            let error = tracked.decode_slice::<Team>(&bytes).unwrap_err();
            assert!(error.to_string().contains("nested deeper than"), "{error}");

            let untracked = GraphCodec::default();
            let error = untracked
                .decode_slice::<GraphRef<Employee>>(&bytes)
                .unwrap_err();
            assert!(error.to_string().contains("nested deeper than"), "{error}");

            // The thread is still usable for well-formed input.
            let bytes = tracked.encode(&team()).unwrap();
            assert!(tracked.decode_slice::<Team>(&bytes).is_ok());
        })
        .unwrap()
        .join()
        .unwrap();
}
