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


//! Integration tests for envelopes travelling over framed streams.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, duplex};
use wirecodec::buffer::FramePool;
use wirecodec::envelope::{Message, Request, Response, ServiceMetadata, Status, TraceId};
use wirecodec::framing::{
    FrameError, FrameKind, MAX_FRAME_SIZE, read_frame, write_request, write_response,
};
use wirecodec::{Codec, CodecConfig, CodecId, CodecRegistry, CycleSafeTypes, Error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Quote {
    symbol: String,
    bid: f64,
    ask: f64,
}

fn registry() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::standard(
        &CodecConfig::default(),
        CycleSafeTypes::new(),
    ))
}

fn message() -> Message {
    let mut message = Message::new(ServiceMetadata::new("markets", "QuoteService", "2.0"), "quote")
        .with_trace_id(TraceId::new());
    message.put_attachment("region", "eu-west");
    message
}

#[test]
fn test_request_defaults_without_message() {
    let mut request = Request::new();
    assert!(request.trace_id().is_none());
    assert!(request.attachments().is_empty());
    request.put_attachment("dropped", "yes");
    assert!(request.attachments().is_empty());
    assert!(request.payload().is_none());
}

#[test]
fn test_payload_codec_and_bytes_change_together() {
    let registry = registry();
    let mut request = Request::new();
    request.set_message(message());

    request
        .encode_message(registry.get(CodecId::STREAM).unwrap())
        .unwrap();
    let stream_payload = request.payload().cloned().unwrap();
    assert_eq!(stream_payload.codec(), CodecId::STREAM);
    assert_eq!(stream_payload.bytes().first(), Some(&b'{'));

    request
        .encode_message(registry.get(CodecId::GRAPH).unwrap())
        .unwrap();
    let graph_payload = request.payload().cloned().unwrap();
    assert_eq!(graph_payload.codec(), CodecId::GRAPH);
    assert_ne!(graph_payload.bytes(), stream_payload.bytes());

    let expected = request.message().cloned().unwrap();
    let mut received = Request::from_bytes(request.request_bytes().clone());
    assert_eq!(received.decode_message(&registry).unwrap(), &expected);
}

#[tokio::test]
async fn test_request_response_exchange() {
    let registry = registry();
    let pool = Arc::new(FramePool::new());
    let (mut client, mut server) = duplex(256);

    let mut request = Request::new();
    let sent = message();
    request.set_message(sent.clone());
    request
        .encode_message(registry.get(CodecId::SCHEMA).unwrap())
        .unwrap();
    let invoke_id = request.invoke_id();

    let server_task = {
        let registry = Arc::clone(&registry);
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let frame = read_frame(&mut server, &pool, MAX_FRAME_SIZE).await.unwrap();
            assert_eq!(frame.header().kind(), FrameKind::Request);
            let mut request = Request::from_bytes(frame.into_request_bytes());
            let message = request.decode_message(&registry).unwrap().clone();
            assert_eq!(message.method(), "quote");
            assert_eq!(request.attachments().get("region").map(String::as_str), Some("eu-west"));

            let mut response = Response::new(request.invoke_id());
            let quote = Quote {
                symbol: "ACME".to_string(),
                bid: 10.25,
                ask: 10.5,
            };
            let codec = registry.get(request.codec_id().unwrap()).unwrap();
            response.encode_result(codec, &quote).unwrap();
            write_response(&mut server, &response).await.unwrap();
            message
        })
    };

    write_request(&mut client, request.request_bytes()).await.unwrap();
    let frame = read_frame(&mut client, &pool, MAX_FRAME_SIZE).await.unwrap();
    assert_eq!(frame.header().kind(), FrameKind::Response);
    assert_eq!(frame.header().invoke_id(), invoke_id);
    assert_eq!(frame.header().codec(), CodecId::SCHEMA);

    let response = frame.into_response();
    assert_eq!(response.status(), Status::Ok);
    let quote: Quote = response.decode_result(&registry).unwrap();
    assert_eq!(quote.symbol, "ACME");

    let received = server_task.await.unwrap();
    assert_eq!(received, sent);
    assert_eq!(received.trace_id(), sent.trace_id());
}

#[tokio::test]
async fn test_error_response_without_payload() {
    let registry = registry();
    let pool = Arc::new(FramePool::new());
    let mut wire = Vec::new();

    let response = Response::with_status(42u64.into(), Status::ServiceNotFound);
    write_response(&mut wire, &response).await.unwrap();

    let response = read_frame(&mut &wire[..], &pool, MAX_FRAME_SIZE)
        .await
        .unwrap()
        .into_response();
    assert_eq!(response.status(), Status::ServiceNotFound);
    assert!(matches!(
        response.decode_result::<Quote>(&registry),
        Err(Error::MissingPayload { invoke_id: 42 })
    ));
}

#[tokio::test]
async fn test_unit_result_crosses_separate_registries() {
    let sender = registry();
    let receiver = registry();
    let pool = Arc::new(FramePool::new());

    for codec in sender.iter() {
        let mut response = Response::new(9u64.into());
        response.encode_result(codec, &()).unwrap();
        let mut wire = Vec::new();
        write_response(&mut wire, &response).await.unwrap();

        let frame = read_frame(&mut &wire[..], &pool, MAX_FRAME_SIZE).await.unwrap();
        assert_eq!(frame.header().codec(), codec.id());
        let received = frame.into_response();
        assert_eq!(received.payload(), response.payload(), "{codec}");
        received.decode_result::<()>(&receiver).unwrap();
    }
}

#[tokio::test]
async fn test_unknown_codec_in_frame() {
    let registry = registry();
    let pool = Arc::new(FramePool::new());
    let mut wire = Vec::new();

    let mut request = Request::new();
    request.set_payload(CodecId::new(0x55), vec![1u8, 2, 3]);
    write_request(&mut wire, request.request_bytes()).await.unwrap();

    let frame = read_frame(&mut &wire[..], &pool, MAX_FRAME_SIZE).await.unwrap();
    let error = frame.decode::<Quote>(&registry).unwrap_err();
    assert!(matches!(error, Error::UnknownCodec(_)));
    assert!(!error.should_close_connection());
    // The body storage was handed back even though decoding never started.
    assert_eq!(pool.pooled(), 1);
}

#[tokio::test]
async fn test_corrupt_stream_closes_connection() {
    let pool = Arc::new(FramePool::new());
    let (mut client, mut server) = duplex(64);
    client.write_all(&[0u8; 32]).await.unwrap();
    drop(client);

    let error: Error = read_frame(&mut server, &pool, MAX_FRAME_SIZE)
        .await
        .unwrap_err()
        .into();
    assert!(matches!(error, Error::Frame(FrameError::BadMagic(0))));
    assert!(error.should_close_connection());
}

#[tokio::test]
async fn test_frame_body_decodes_with_every_codec() {
    let sender = registry();
    let receiver = registry();
    let pool = Arc::new(FramePool::new());
    let quote = Quote {
        symbol: "XYZ".to_string(),
        bid: 1.0,
        ask: 1.5,
    };

    for codec in sender.iter() {
        let mut response = Response::new(7u64.into());
        response.encode_result(codec, &quote).unwrap();
        let mut wire = Vec::new();
        write_response(&mut wire, &response).await.unwrap();

        let frame = read_frame(&mut &wire[..], &pool, MAX_FRAME_SIZE).await.unwrap();
        assert_eq!(frame.header().codec(), codec.id());
        assert_eq!(frame.decode::<Quote>(&receiver).unwrap(), quote);
    }
}
