//! Writing uploads into the backend.
//!
//! A file that fits in one chunk becomes a single object. A larger file is
//! written as consecutive chunk objects followed by a manifest object, and
//! the manifest's reference stands for the whole file.

use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::manifest::{self, ManifestError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read upload: {0}")]
    Read(String),
    #[error("File size exceeds limit of {0} bytes")]
    TooLarge(u64),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Backend returned no reference for {0}")]
    NoReference(String),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone)]
pub struct StoreLimits {
    pub chunk_size: usize,
    /// Hard cap on total bytes, if any.
    pub max_size: Option<u64>,
}

/// Store the bytes of `body` under `file_name` and return the reference of
/// the resulting object or manifest.
///
/// When the backend reports no media for a single-object upload this yields
/// `Ok(None)`. Chunk uploads must always resolve.
pub async fn store_upload<S, E>(
    backend: &dyn Backend,
    file_name: &str,
    body: S,
    limits: &StoreLimits,
) -> Result<Option<String>, StoreError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let chunk_size = limits.chunk_size.max(1);
    let chunk_name = token_safe(file_name);
    let mut body = std::pin::pin!(body);
    let mut buffer = BytesMut::new();
    let mut chunks: Vec<String> = Vec::new();
    let mut total: u64 = 0;

    while let Some(piece) = body.next().await {
        let piece = piece.map_err(|e| StoreError::Read(e.to_string()))?;
        total += piece.len() as u64;
        if let Some(max) = limits.max_size {
            if total > max {
                return Err(StoreError::TooLarge(max));
            }
        }

        buffer.extend_from_slice(&piece);
        while buffer.len() > chunk_size {
            let chunk = buffer.split_to(chunk_size).freeze();
            let name = format!("{chunk_name}.part{}", chunks.len());
            chunks.push(put_chunk(backend, &name, chunk).await?);
        }
    }

    if chunks.is_empty() {
        let message = backend.put_object(file_name, buffer.freeze()).await?;
        return Ok(message.stored_reference().map(str::to_string));
    }

    if !buffer.is_empty() {
        let name = format!("{chunk_name}.part{}", chunks.len());
        chunks.push(put_chunk(backend, &name, buffer.freeze()).await?);
    }

    let payload = manifest::encode(&chunk_name, &chunks)?;
    let manifest_name = format!("{chunk_name}.manifest");
    let reference = put_chunk(backend, &manifest_name, Bytes::from(payload)).await?;

    tracing::info!(
        file_name = %file_name,
        chunks = chunks.len(),
        bytes = total,
        manifest = %reference,
        "Stored chunked upload"
    );
    Ok(Some(reference))
}

async fn put_chunk(backend: &dyn Backend, name: &str, data: Bytes) -> Result<String, StoreError> {
    let message = backend.put_object(name, data).await?;
    message
        .stored_reference()
        .map(str::to_string)
        .ok_or_else(|| StoreError::NoReference(name.to_string()))
}

/// Manifest tokens cannot contain whitespace.
fn token_safe(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_whitespace() || c.is_control() { '_' } else { c })
        .collect();
    if safe.is_empty() {
        "file".to_string()
    } else {
        safe
    }
}
