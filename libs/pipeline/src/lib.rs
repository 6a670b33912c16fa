//! # Courier Pipeline
//!
//! Publish and consume sides built on `courier-codec`:
//! - [`Publisher`] / [`EnvelopePublisher`]: context + payload into envelope bytes
//! - [`Consumer`]: envelope bytes through decode stages into a [`MessageHandler`],
//!   optionally re-publishing the handler's result
//! - [`PipelineConfig`]: TOML configuration for queue names
//!
//! The pipeline is synchronous. Each `consume` or `publish` call runs its
//! stages to completion or first failure on the calling thread; the only
//! shared state is the read-only [`TypeRegistry`](courier_codec::TypeRegistry).
//!
//! ```ignore
//! let mut registry = TypeRegistry::new();
//! registry.register::<OrderPlaced>()?;
//!
//! let config = PipelineConfig::from_file(Path::new("pipeline.toml"))?;
//! let consumer = Consumer::from_config(&config, Arc::new(registry), enrich_order);
//!
//! if let Some(bytes) = consumer.consume(&delivery)? {
//!     queue.send(consumer.publisher().unwrap().queue_name(), bytes);
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod publisher;
pub mod test_utils;

pub use config::{ConfigError, ConsumerConfig, PipelineConfig, PublisherConfig};
pub use consumer::{ConsumeState, Consumer};
pub use error::{PipelineError, PipelineResult};
pub use handler::{HandleError, MessageHandler};
pub use publisher::{EnvelopePublisher, Publisher};
