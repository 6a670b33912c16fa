//! Consume pipeline: stage ordering, error kinds and re-publishing

use courier_codec::{
    AvroRecord, CodecError, ConsumeStage, Context, Envelope, PublishStage, SpecificRecord,
    TypeRegistry,
};
use courier_pipeline::test_utils::{
    EchoHandler, FailingHandler, FailingPublisher, RecordingPublisher,
};
use courier_pipeline::{Consumer, HandleError, PipelineConfig, PipelineError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

const CONTEXT_SCHEMA: &str = r#"{"name":"test","type":"record","fields":[]}"#;
const TEST_SCHEMA: &str = r#"{"type":"record","name":"TestSchema","namespace":"io.courier.test","fields":[{"name":"testString","type":"string"}]}"#;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct TestSchema {
    #[serde(rename = "testString")]
    test_string: String,
}

impl SpecificRecord for TestSchema {
    const SCHEMA: &'static str = TEST_SCHEMA;
}

const NOTE_SCHEMA: &str = r#"{"type":"record","name":"Note","namespace":"io.courier.test","fields":[{"name":"text","type":["null","string"]}]}"#;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Note {
    text: Option<String>,
}

impl SpecificRecord for Note {
    const SCHEMA: &'static str = NOTE_SCHEMA;
}

fn golden_envelope() -> Vec<u8> {
    let text = include_str!("fixtures/valid_envelope.hex");
    hex::decode(text.trim()).unwrap()
}

fn registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    registry.register::<TestSchema>().unwrap();
    Arc::new(registry)
}

fn envelope_bytes(envelope: Envelope) -> Vec<u8> {
    envelope.encode().unwrap()
}

fn valid_envelope() -> Envelope {
    Envelope {
        context_schema: CONTEXT_SCHEMA.to_string(),
        context_buffer: b"{}".to_vec(),
        message_schema: TEST_SCHEMA.to_string(),
        message_buffer: b"\x10testData".to_vec(),
    }
}

fn shout(
    _context: &Context,
    payload: Box<dyn AvroRecord>,
) -> Result<Box<dyn AvroRecord>, HandleError> {
    let record = payload
        .downcast::<TestSchema>()
        .ok_or_else(|| HandleError::with_label("shout", "unexpected payload type"))?;
    Ok(Box::new(TestSchema {
        test_string: record.test_string.to_uppercase(),
    }))
}

#[test]
fn test_consume_without_publisher_returns_none() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());

    let result = consumer.consume(&golden_envelope()).unwrap();
    assert!(result.is_none());
    assert!(consumer.publisher().is_none());
    assert_eq!(consumer.handler().call_count(), 1);
}

#[test]
fn test_consume_hands_resolved_type_to_handler() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());
    consumer.consume(&golden_envelope()).unwrap();

    let consumer = Consumer::new("test.in", registry(), shout)
        .with_publisher(Arc::new(RecordingPublisher::new("test.out")));
    let bytes = consumer.consume(&golden_envelope()).unwrap().unwrap();

    let envelope = Envelope::decode(&bytes).unwrap();
    assert_eq!(envelope.message_buffer, b"\x10TESTDATA");
}

#[test]
fn test_consume_calls_publisher_once_with_context_and_result() {
    let publisher = Arc::new(RecordingPublisher::new("test.out"));
    let handler = EchoHandler::new();
    let consumer = Consumer::new("test.in", registry(), handler).with_publisher(publisher.clone());

    let bytes = consumer.consume(&golden_envelope()).unwrap().unwrap();

    assert_eq!(publisher.call_count(), 1);
    let context = publisher.last_context().unwrap();
    assert_eq!(context.schema_text(), Some(CONTEXT_SCHEMA));
    assert_eq!(context.data(), Some(&b"{}"[..]));

    let payload = publisher.last_payload().unwrap();
    assert_eq!(payload.decode_as::<TestSchema>().unwrap().test_string, "testData");

    // echoing the payload reproduces the original envelope
    assert_eq!(bytes, golden_envelope());
}

#[test]
fn test_empty_body_is_a_transport_error() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());

    let err = consumer.consume(&[]).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeTransport));
    assert_eq!(err.to_string(), "Failed to consume message: Failed to decode transport");
}

#[test]
fn test_invalid_context_schema_is_a_context_error() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());
    let bytes = envelope_bytes(Envelope {
        context_schema: "invalid".to_string(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeContext));
    assert_eq!(err.to_string(), "Failed to consume message: Failed to decode context");
}

#[test]
fn test_unregistered_payload_type_is_a_message_error() {
    let consumer = Consumer::new("test.in", Arc::new(TypeRegistry::new()), EchoHandler::new());

    let err = consumer.consume(&golden_envelope()).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeMessage));
    assert_eq!(err.to_string(), "Failed to consume message: Failed to decode message");
    assert!(matches!(
        err.as_consume().and_then(|e| e.codec_error()),
        Some(CodecError::UnknownType { name, .. }) if name == "io.courier.test.TestSchema"
    ));
}

#[test]
fn test_invalid_payload_schema_is_a_message_error() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());
    let bytes = envelope_bytes(Envelope {
        message_schema: "invalid".to_string(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeMessage));
}

#[test]
fn test_truncated_payload_is_a_content_error() {
    let handler = EchoHandler::new();
    let consumer = Consumer::new("test.in", registry(), handler);
    let bytes = envelope_bytes(Envelope {
        message_buffer: b"\x10test".to_vec(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeMessageContent));
    assert_eq!(
        err.to_string(),
        "Failed to consume message: Failed to decode message content"
    );
    assert!(matches!(
        err.as_consume().and_then(|e| e.codec_error()),
        Some(CodecError::InvalidDatum { .. })
    ));
}

#[test]
fn test_failed_stage_stops_the_pipeline() {
    let publisher = Arc::new(RecordingPublisher::new("test.out"));
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new())
        .with_publisher(publisher.clone());

    consumer.consume(&[]).unwrap_err();
    consumer
        .consume(&envelope_bytes(Envelope {
            message_buffer: Vec::new(),
            ..valid_envelope()
        }))
        .unwrap_err();

    assert_eq!(consumer.handler().call_count(), 0);
    assert_eq!(publisher.call_count(), 0);
}

#[test]
fn test_truncated_context_bytes_are_a_context_error() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());
    let bytes = envelope_bytes(Envelope {
        context_schema: r#"{"type":"record","name":"Ctx","fields":[{"name":"user","type":"string"}]}"#
            .to_string(),
        // declares 8 bytes of string, carries 2
        context_buffer: b"\x10te".to_vec(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeContext));
    assert!(matches!(
        err.as_consume().and_then(|e| e.codec_error()),
        Some(CodecError::InvalidDatum { .. })
    ));
    assert_eq!(consumer.handler().call_count(), 0);
}

#[test]
fn test_truncated_nullable_payload_is_a_content_error() {
    let mut registry = TypeRegistry::new();
    registry.register::<Note>().unwrap();
    let consumer = Consumer::new("test.in", Arc::new(registry), EchoHandler::new());
    let bytes = envelope_bytes(Envelope {
        message_schema: NOTE_SCHEMA.to_string(),
        // string branch of the union, declares 8 bytes, carries 2
        message_buffer: b"\x02\x10te".to_vec(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeMessageContent));
    assert!(matches!(
        err.as_consume().and_then(|e| e.codec_error()),
        Some(CodecError::InvalidDatum { .. })
    ));
    assert_eq!(consumer.handler().call_count(), 0);
}

#[test]
fn test_payload_with_trailing_bytes_is_a_content_error() {
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new());
    let bytes = envelope_bytes(Envelope {
        message_buffer: b"\x10testData!".to_vec(),
        ..valid_envelope()
    });

    let err = consumer.consume(&bytes).unwrap_err();
    assert_eq!(err.consume_stage(), Some(ConsumeStage::DecodeMessageContent));
    assert!(matches!(
        err.as_consume().and_then(|e| e.codec_error()),
        Some(CodecError::TrailingBytes { remaining: 1, .. })
    ));
}

#[test]
fn test_handler_failure_without_label() {
    let publisher = Arc::new(RecordingPublisher::new("test.out"));
    let consumer = Consumer::new("test.in", registry(), FailingHandler::new("boom"))
        .with_publisher(publisher.clone());

    let err = consumer.consume(&golden_envelope()).unwrap_err();

    assert_eq!(err.consume_stage(), Some(ConsumeStage::HandleMessage));
    assert_eq!(err.to_string(), "Failed to consume message: Failed to handle message");
    assert_eq!(err.source().unwrap().to_string(), "boom");
    assert_eq!(publisher.call_count(), 0);
}

#[test]
fn test_handler_failure_with_label() {
    let consumer = Consumer::new("test.in", registry(), FailingHandler::labelled("test", "boom"));

    let err = consumer.consume(&golden_envelope()).unwrap_err();

    assert_eq!(err.consume_stage(), Some(ConsumeStage::HandleMessage));
    assert_eq!(
        err.to_string(),
        "Failed to consume message: Failed to handle message: test"
    );
    assert_eq!(err.as_consume().and_then(|e| e.label()), Some("test"));
    assert_eq!(err.source().unwrap().to_string(), "boom");
}

#[test]
fn test_publisher_failure_is_not_rewrapped() {
    let publisher = Arc::new(FailingPublisher::new(PublishStage::EncodeTransport));
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new())
        .with_publisher(publisher.clone());

    let err = consumer.consume(&golden_envelope()).unwrap_err();

    assert!(matches!(err, PipelineError::Publish(_)));
    assert_eq!(err.as_publish().map(|e| e.stage()), Some(PublishStage::EncodeTransport));
    assert_eq!(err.to_string(), "Failed to publish message: Failed to encode transport");
    assert_eq!(publisher.call_count(), 1);
}

#[test]
fn test_from_config_attaches_publisher() {
    let config = PipelineConfig::from_toml_str(
        "[consumer]\nqueue_name = \"test.in\"\n[publisher]\nqueue_name = \"test.out\"\n",
    )
    .unwrap();

    let consumer = Consumer::from_config(&config, registry(), EchoHandler::new());
    assert_eq!(consumer.queue_name(), "test.in");
    assert_eq!(consumer.publisher().map(|p| p.queue_name()), Some("test.out"));

    let bytes = consumer.consume(&golden_envelope()).unwrap();
    assert_eq!(bytes, Some(golden_envelope()));
}

#[test]
fn test_from_config_without_publisher() {
    let config = PipelineConfig::from_toml_str("[consumer]\nqueue_name = \"test.in\"\n").unwrap();

    let consumer = Consumer::from_config(&config, registry(), EchoHandler::new());
    assert!(consumer.publisher().is_none());
    assert_eq!(consumer.consume(&golden_envelope()).unwrap(), None);
}

#[test]
fn test_concurrent_consumes_share_registry() {
    let publisher = Arc::new(RecordingPublisher::new("test.out"));
    let consumer = Consumer::new("test.in", registry(), EchoHandler::new())
        .with_publisher(publisher.clone());
    let golden = golden_envelope();

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..25 {
                    let bytes = consumer.consume(&golden).unwrap();
                    assert_eq!(bytes.as_deref(), Some(golden.as_slice()));
                }
            });
        }
    });

    assert_eq!(publisher.call_count(), 200);
    assert_eq!(consumer.handler().call_count(), 200);
}
