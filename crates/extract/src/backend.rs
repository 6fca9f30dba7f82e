use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::prepare::PreparedImage;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Model reply contained no text")]
    EmptyReply,
    #[error("Extraction backend not configured: {0}")]
    NotConfigured(String),
    #[error("Extraction backend error: {0}")]
    Other(String),
}

/// Abstraction over the model that reads a document image.
/// Implementations return the model's raw text reply; parsing happens in
/// [`crate::parse`].
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    async fn generate(&self, image: &PreparedImage) -> Result<String, BackendError>;
}

#[async_trait]
impl<B: ExtractionBackend + ?Sized> ExtractionBackend for Arc<B> {
    async fn generate(&self, image: &PreparedImage) -> Result<String, BackendError> {
        (**self).generate(image).await
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set reply, optionally failing for chosen file names.
pub struct MockBackend {
    reply: String,
    failing_files: Vec<String>,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            failing_files: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail with [`BackendError::Other`] whenever `file_name` is processed.
    pub fn fail_for(mut self, file_name: impl Into<String>) -> Self {
        self.failing_files.push(file_name.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionBackend for MockBackend {
    async fn generate(&self, image: &PreparedImage) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_files.iter().any(|f| f == &image.file_name) {
            return Err(BackendError::Other(format!("mock failure for {}", image.file_name)));
        }
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khatt_core::ImageKind;

    fn image(name: &str) -> PreparedImage {
        PreparedImage {
            file_name: name.to_string(),
            kind: ImageKind::Png,
            bytes: vec![],
            width: 1,
            height: 1,
        }
    }

    #[tokio::test]
    async fn mock_returns_preset_reply() {
        let b = MockBackend::new(r#"{"records":[]}"#);
        assert_eq!(b.generate(&image("a.png")).await.unwrap(), r#"{"records":[]}"#);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn mock_fails_for_selected_files() {
        let b = MockBackend::new("x").fail_for("bad.png");
        assert!(b.generate(&image("bad.png")).await.is_err());
        assert!(b.generate(&image("good.png")).await.is_ok());
        assert_eq!(b.calls(), 2);
    }

    #[tokio::test]
    async fn arc_wrapped_backend_delegates() {
        let b: Arc<dyn ExtractionBackend> = Arc::new(MockBackend::new("hello"));
        assert_eq!(b.generate(&image("a.png")).await.unwrap(), "hello");
    }
}
