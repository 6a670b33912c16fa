//! TOML configuration for a consume pipeline
//!
//! ```toml
//! [consumer]
//! queue_name = "orders.incoming"
//!
//! # optional; enables re-publishing of handler results
//! [publisher]
//! queue_name = "orders.enriched"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub consumer: ConsumerConfig,

    /// Downstream queue for handler results
    #[serde(default)]
    pub publisher: Option<PublisherConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConsumerConfig {
    /// Queue the consumer reads envelopes from
    pub queue_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PublisherConfig {
    /// Queue re-published envelopes are destined for
    pub queue_name: String,
}

impl PipelineConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer.queue_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "consumer.queue_name must not be empty".to_string(),
            ));
        }

        if let Some(publisher) = &self.publisher {
            if publisher.queue_name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "publisher.queue_name must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_consumer_only_config() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [consumer]
            queue_name = "orders.incoming"
            "#,
        )
        .unwrap();

        assert_eq!(config.consumer.queue_name, "orders.incoming");
        assert!(config.publisher.is_none());
    }

    #[test]
    fn test_config_with_publisher() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [consumer]
            queue_name = "orders.incoming"

            [publisher]
            queue_name = "orders.enriched"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.publisher,
            Some(PublisherConfig {
                queue_name: "orders.enriched".to_string()
            })
        );
    }

    #[test]
    fn test_empty_queue_names_are_rejected() {
        let err = PipelineConfig::from_toml_str("[consumer]\nqueue_name = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = PipelineConfig::from_toml_str(
            "[consumer]\nqueue_name = \"in\"\n[publisher]\nqueue_name = \" \"\n",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: publisher.queue_name must not be empty"
        );
    }

    #[test]
    fn test_missing_consumer_section_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str("[publisher]\nqueue_name = \"out\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[consumer]\nqueue_name = \"from-file\"").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.consumer.queue_name, "from-file");

        let err = PipelineConfig::from_file(Path::new("/nonexistent/courier.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
