//! # Consume Pipeline
//!
//! One `consume` call walks a fixed sequence of stages and stops at the
//! first failure:
//!
//! ```text
//! RawBytes ─► Envelope ─► Context ─► PayloadIdentified ─► PayloadDecoded ─► Handled ─┬─► Published
//!                                                                                     └─► Done
//! ```
//!
//! Nothing is retried or rolled back here. Every stage before the publish
//! is free of side effects, so an aborted consume can be redelivered by the
//! queue as-is.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::handler::MessageHandler;
use crate::publisher::{EnvelopePublisher, Publisher};
use courier_codec::{
    read_envelope, AvroRecord, ConsumeError, ConsumeStage, Context, Envelope, Message,
    TypeRegistry,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a consume call currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeState {
    RawBytes,
    Envelope,
    Context,
    PayloadIdentified,
    PayloadDecoded,
    Handled,
    Published,
    Done,
}

impl ConsumeState {
    /// Stage reported when the transition out of this state fails
    pub fn failing_stage(self) -> ConsumeStage {
        match self {
            ConsumeState::RawBytes => ConsumeStage::DecodeTransport,
            ConsumeState::Envelope => ConsumeStage::DecodeContext,
            ConsumeState::Context => ConsumeStage::DecodeMessage,
            ConsumeState::PayloadIdentified => ConsumeStage::DecodeMessageContent,
            ConsumeState::PayloadDecoded => ConsumeStage::HandleMessage,
            ConsumeState::Handled | ConsumeState::Published | ConsumeState::Done => {
                ConsumeStage::Consume
            }
        }
    }
}

/// Envelope consumer bound to one queue
///
/// Holds the shared type registry, the handler and an optional downstream
/// publisher. `consume` takes `&self`, so one consumer can serve concurrent
/// deliveries.
pub struct Consumer<H> {
    queue_name: String,
    registry: Arc<TypeRegistry>,
    handler: H,
    publisher: Option<Arc<dyn Publisher>>,
}

impl<H: MessageHandler> Consumer<H> {
    pub fn new(queue_name: impl Into<String>, registry: Arc<TypeRegistry>, handler: H) -> Self {
        Self {
            queue_name: queue_name.into(),
            registry,
            handler,
            publisher: None,
        }
    }

    /// Re-publish every handler result through `publisher`
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build a consumer from validated configuration
    ///
    /// A `[publisher]` section attaches an [`EnvelopePublisher`] for the
    /// downstream queue.
    pub fn from_config(config: &PipelineConfig, registry: Arc<TypeRegistry>, handler: H) -> Self {
        let consumer = Self::new(config.consumer.queue_name.clone(), registry, handler);
        match &config.publisher {
            Some(publisher) => consumer
                .with_publisher(Arc::new(EnvelopePublisher::new(publisher.queue_name.clone()))),
            None => consumer,
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn publisher(&self) -> Option<&Arc<dyn Publisher>> {
        self.publisher.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Run one envelope through the pipeline
    ///
    /// Returns the re-published envelope bytes, or `None` when no publisher
    /// is configured. Publisher failures come back unchanged as
    /// [`PipelineError::Publish`].
    pub fn consume(&self, bytes: &[u8]) -> PipelineResult<Option<Vec<u8>>> {
        let (context, result) = self.consume_stages(bytes).map_err(|err| {
            warn!(
                queue = %self.queue_name,
                error = %err,
                "Consume aborted"
            );
            PipelineError::Consume(err)
        })?;

        let Some(publisher) = &self.publisher else {
            self.transition(ConsumeState::Done);
            return Ok(None);
        };

        let published = publisher.publish(&context, result.as_ref()).map_err(|err| {
            warn!(
                queue = %self.queue_name,
                downstream = publisher.queue_name(),
                error = %err,
                "Re-publish failed"
            );
            err
        })?;

        self.transition(ConsumeState::Published);
        Ok(Some(published))
    }

    fn consume_stages(
        &self,
        bytes: &[u8],
    ) -> Result<(Context, Box<dyn AvroRecord>), ConsumeError> {
        let envelope: Envelope = read_envelope(bytes)?;
        self.transition(ConsumeState::Envelope);

        let context = Context::from_envelope(&envelope)?;
        self.transition(ConsumeState::Context);

        let message = Message::from_envelope(&envelope, &self.registry)?;
        debug!(
            queue = %self.queue_name,
            payload_type = message.full_name().as_deref().unwrap_or("<anonymous>"),
            "Payload identified"
        );
        self.transition(ConsumeState::PayloadIdentified);

        let payload = message.decode()?;
        self.transition(ConsumeState::PayloadDecoded);

        let result = self.handler.handle(&context, payload).map_err(|err| {
            let (label, source) = err.into_parts();
            let wrapped = ConsumeError::new(ConsumeState::PayloadDecoded.failing_stage(), source);
            match label {
                Some(label) => wrapped.with_label(label),
                None => wrapped,
            }
        })?;
        self.transition(ConsumeState::Handled);

        Ok((context, result))
    }

    fn transition(&self, state: ConsumeState) {
        debug!(queue = %self.queue_name, state = ?state, "Consume stage complete");
    }
}

impl<H> fmt::Debug for Consumer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("queue_name", &self.queue_name)
            .field("registered_types", &self.registry.len())
            .field(
                "publisher",
                &self.publisher.as_ref().map(|p| p.queue_name().to_string()),
            )
            .finish()
    }
}
