//! Test doubles for pipelines: publishers and handlers with observable or
//! forced behavior

use crate::handler::{HandleError, MessageHandler};
use crate::publisher::{EnvelopePublisher, Publisher};
use courier_codec::{AvroRecord, CodecError, Context, Message, PublishError, PublishStage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Publisher that records every call and delegates to [`EnvelopePublisher`]
#[derive(Debug)]
pub struct RecordingPublisher {
    inner: EnvelopePublisher,
    calls: AtomicUsize,
    last_context: Mutex<Option<Context>>,
    last_payload: Mutex<Option<Message>>,
}

impl RecordingPublisher {
    pub fn new(queue_name: impl Into<String>) -> Self {
        Self {
            inner: EnvelopePublisher::new(queue_name),
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
            last_payload: Mutex::new(None),
        }
    }

    /// Number of `publish` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Context passed to the most recent call
    pub fn last_context(&self) -> Option<Context> {
        self.last_context.lock().clone()
    }

    /// Most recent payload, encoded against its own schema
    pub fn last_payload(&self) -> Option<Message> {
        self.last_payload.lock().clone()
    }
}

impl Publisher for RecordingPublisher {
    fn queue_name(&self) -> &str {
        self.inner.queue_name()
    }

    fn publish(&self, context: &Context, payload: &dyn AvroRecord) -> Result<Vec<u8>, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock() = Some(context.clone());

        let mut message = Message::new();
        if message.encode(payload).is_ok() {
            *self.last_payload.lock() = Some(message);
        }

        self.inner.publish(context, payload)
    }
}

/// Publisher that always fails with the given stage
#[derive(Debug)]
pub struct FailingPublisher {
    stage: PublishStage,
    calls: AtomicUsize,
}

impl FailingPublisher {
    pub fn new(stage: PublishStage) -> Self {
        Self {
            stage,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Publisher for FailingPublisher {
    fn queue_name(&self) -> &str {
        "failing"
    }

    fn publish(&self, _context: &Context, _payload: &dyn AvroRecord) -> Result<Vec<u8>, PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::new(
            self.stage,
            CodecError::missing_data("forced publish failure"),
        ))
    }
}

/// Returns the payload it was given
#[derive(Debug, Default)]
pub struct EchoHandler {
    calls: AtomicUsize,
}

impl EchoHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MessageHandler for EchoHandler {
    fn handle(
        &self,
        _context: &Context,
        payload: Box<dyn AvroRecord>,
    ) -> Result<Box<dyn AvroRecord>, HandleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(payload)
    }
}

/// Always fails, optionally with a label
#[derive(Debug, Clone)]
pub struct FailingHandler {
    label: Option<String>,
    message: String,
}

impl FailingHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            label: None,
            message: message.into(),
        }
    }

    pub fn labelled(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            message: message.into(),
        }
    }
}

impl MessageHandler for FailingHandler {
    fn handle(
        &self,
        _context: &Context,
        _payload: Box<dyn AvroRecord>,
    ) -> Result<Box<dyn AvroRecord>, HandleError> {
        let cause = self.message.clone();
        Err(match &self.label {
            Some(label) => HandleError::with_label(label.clone(), cause),
            None => HandleError::new(cause),
        })
    }
}
