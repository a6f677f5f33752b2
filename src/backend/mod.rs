mod memory;
mod telegram;
pub mod types;

pub use memory::{MediaKind, MemoryBackend};
pub use telegram::TelegramBackend;
pub use types::{Chat, MediaFile, Message, Reply, Update};

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Request error: {0}")]
    Request(String),
    #[error("Backend API error: {0}")]
    Api(String),
    /// The Bot API answered `ok: false`.
    #[error("{method} rejected ({code}): {description}")]
    Rejected {
        method: String,
        code: u16,
        description: String,
    },
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Malformed backend response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Request(e.to_string())
    }
}

/// Byte stream of a fetched object, consumed front to back exactly once.
pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// An object opened for reading.
pub struct FetchedObject {
    /// Content type the backend declared for this fetch.
    pub content_type: Option<String>,
    pub body: ByteStream,
}

/// The messaging backend, used as an opaque reference-addressed blob store.
/// References mean nothing outside the backend that issued them.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Store `data` as one object and return the message the backend posted for it.
    async fn put_object(&self, file_name: &str, data: Bytes) -> Result<Message, BackendError>;
    /// Resolve a reference to a short-lived download URL.
    async fn get_object_url(&self, reference: &str) -> Result<String, BackendError>;
    async fn fetch(&self, url: &str) -> Result<FetchedObject, BackendError>;
    /// One long-poll for inbound updates with id >= `offset`.
    async fn poll_events(&self, offset: i64, timeout: Duration)
        -> Result<Vec<Update>, BackendError>;
    async fn send_reply(&self, reply: &Reply) -> Result<(), BackendError>;

    /// Check that the backend accepts our credentials.
    async fn verify(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
