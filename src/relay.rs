//! Download relay: turn a reference into a byte stream for the client.
//!
//! Each request walks resolve, fetch, classify and sniff once. A manifest
//! yields a [`chunk_relay`] stream that fetches its chunks one after another;
//! anything else is streamed through as-is behind the sniffed window.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use thiserror::Error;

use crate::backend::{Backend, BackendError, ByteStream};
use crate::manifest::{self, ManifestError};
use crate::sniff;

/// The only content type the backend serves stored objects with.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Object not found")]
    NotFound,
    #[error("Failed to open object: {0}")]
    Backend(BackendError),
    #[error("Failed to read object: {0}")]
    Read(BackendError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// What the client receives for a resolved reference.
pub enum Relayed {
    /// Reconstructed file. Always served as a binary attachment.
    Manifest { file_name: String, body: ByteStream },
    /// Stored bytes as-is, with a sniffed content type.
    Raw {
        content_type: &'static str,
        body: ByteStream,
    },
}

#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub sniff_window: usize,
    /// Pause after the last chunk of a manifest before ending the stream.
    pub manifest_hold: Duration,
}

/// Resolve `reference` and prepare its response body.
pub async fn open(
    backend: Arc<dyn Backend>,
    reference: &str,
    options: &RelayOptions,
) -> Result<Relayed, RelayError> {
    if reference.is_empty() {
        return Err(RelayError::NotFound);
    }

    let url = backend
        .get_object_url(reference)
        .await
        .map_err(open_error)?;
    let object = backend.fetch(&url).await.map_err(open_error)?;

    // Anything but a stored object (an error page, say) is treated as missing.
    // Only the header is needed, so this is decided before reading the body.
    let declared_binary = object
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with(BINARY_CONTENT_TYPE));
    if !declared_binary {
        tracing::debug!(
            reference = %reference,
            content_type = ?object.content_type,
            "Backend returned non-binary content"
        );
        return Err(RelayError::NotFound);
    }

    let mut body = object.body;
    let window = read_window(&mut body, options.sniff_window)
        .await
        .map_err(RelayError::Read)?;

    if manifest::is_manifest(&window) {
        let decoded = manifest::decode(&String::from_utf8_lossy(&window))?;
        tracing::info!(
            reference = %reference,
            file_name = %decoded.file_name,
            chunks = decoded.chunks.len(),
            "Relaying chunked file"
        );
        return Ok(Relayed::Manifest {
            file_name: decoded.file_name,
            body: chunk_relay(backend, decoded.chunks, options.manifest_hold),
        });
    }

    let content_type = sniff::detect_content_type(&window);
    let head = futures::stream::once(async move { Ok::<_, BackendError>(window) });
    Ok(Relayed::Raw {
        content_type,
        body: head.chain(body).boxed(),
    })
}

fn open_error(e: BackendError) -> RelayError {
    match e {
        BackendError::NotFound(_) => RelayError::NotFound,
        other => RelayError::Backend(other),
    }
}

/// Read from `body` until `limit` bytes are buffered or the stream ends.
/// A stream shorter than `limit` is not an error.
async fn read_window(body: &mut ByteStream, limit: usize) -> Result<Bytes, BackendError> {
    let mut window = BytesMut::new();
    while window.len() < limit {
        match body.next().await {
            Some(piece) => window.extend_from_slice(&piece?),
            None => break,
        }
    }
    Ok(window.freeze())
}

struct ChunkCursor {
    backend: Arc<dyn Backend>,
    current: Option<ByteStream>,
    hold: Option<Duration>,
    pending: std::vec::IntoIter<String>,
}

/// Stream the concatenated bytes of `chunks`, in order.
///
/// Chunks are fetched strictly one at a time, only once the previous chunk
/// has been fully yielded. The first failure ends the stream with that error;
/// whatever was yielded before it stays delivered. After the last chunk the
/// stream waits `hold` before finishing. Not restartable.
pub fn chunk_relay(backend: Arc<dyn Backend>, chunks: Vec<String>, hold: Duration) -> ByteStream {
    let cursor = ChunkCursor {
        backend,
        current: None,
        hold: Some(hold),
        pending: chunks.into_iter(),
    };

    futures::stream::try_unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(body) = cursor.current.as_mut() {
                if let Some(piece) = body.next().await {
                    let piece = piece?;
                    return Ok::<_, BackendError>(Some((piece, cursor)));
                }
                cursor.current = None;
            }

            match cursor.pending.next() {
                Some(reference) => {
                    let url = cursor.backend.get_object_url(&reference).await?;
                    let object = cursor.backend.fetch(&url).await?;
                    tracing::debug!(reference = %reference, "Fetched chunk");
                    cursor.current = Some(object.body);
                }
                None => {
                    if let Some(hold) = cursor.hold.take().filter(|d| !d.is_zero()) {
                        tokio::time::sleep(hold).await;
                    }
                    return Ok::<_, BackendError>(None);
                }
            }
        }
    })
    .inspect_err(|e| tracing::warn!(error = %e, "Chunk relay aborted"))
    .boxed()
}
