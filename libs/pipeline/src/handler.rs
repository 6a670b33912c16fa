//! Handler contract invoked once per consumed envelope
//!
//! A handler receives the decoded context and the resolved payload and
//! returns the record to re-publish (ignored when the consumer has no
//! publisher). Handlers report failure with [`HandleError`]; the consumer
//! wraps it as a `HandleMessage` stage failure, keeping the cause.

use courier_codec::{AvroRecord, BoxError, Context};
use std::fmt;

/// Failure reported by a handler
///
/// The optional label is appended to the boundary text, so a handler can
/// say *what* it was doing without replacing the underlying cause.
#[derive(Debug)]
pub struct HandleError {
    label: Option<String>,
    source: BoxError,
}

impl HandleError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            label: None,
            source: source.into(),
        }
    }

    pub fn with_label(label: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            label: Some(label.into()),
            source: source.into(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn into_parts(self) -> (Option<String>, BoxError) {
        (self.label, self.source)
    }
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{}: {}", label, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

impl std::error::Error for HandleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Per-message business logic
///
/// Implemented for any `Fn(&Context, Box<dyn AvroRecord>) -> Result<..>`
/// closure, so small consumers do not need a named type.
pub trait MessageHandler: Send + Sync {
    fn handle(
        &self,
        context: &Context,
        payload: Box<dyn AvroRecord>,
    ) -> Result<Box<dyn AvroRecord>, HandleError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Context, Box<dyn AvroRecord>) -> Result<Box<dyn AvroRecord>, HandleError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        context: &Context,
        payload: Box<dyn AvroRecord>,
    ) -> Result<Box<dyn AvroRecord>, HandleError> {
        self(context, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_label_prefixes_cause_text() {
        let err = HandleError::with_label("test", "boom");
        assert_eq!(err.to_string(), "test: boom");
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }

    #[test]
    fn test_unlabelled_error_shows_cause_only() {
        let err = HandleError::new("boom");
        assert_eq!(err.label(), None);
        assert_eq!(err.to_string(), "boom");

        let (label, source) = err.into_parts();
        assert!(label.is_none());
        assert_eq!(source.to_string(), "boom");
    }
}
