use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};

use crate::api::response::UploadResponse;
use crate::store::{self, StoreError, StoreLimits};
use crate::AppState;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "image";

const ALLOWED_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Route: POST /api
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> UploadResponse {
    let Ok(mut multipart) = multipart else {
        return UploadResponse::fail("Unable to get file");
    };
    // Malformed multipart reads as "no file".
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(FILE_FIELD) => break Some(field),
            Ok(Some(_)) => continue,
            _ => break None,
        }
    };
    let Some(field) = field else {
        return UploadResponse::fail("Unable to get file");
    };

    let file_name = field.file_name().unwrap_or_default().to_string();
    let strict = !state.config.is_pass_through();

    if strict && declared_length(&headers).is_some_and(|len| len > state.config.max_upload_size) {
        return UploadResponse::fail("File size exceeds 20MB limit");
    }

    if strict && !ALLOWED_EXTENSIONS.contains(&extension(&file_name)) {
        return UploadResponse::fail(
            "Invalid file type. Only .jpg, .jpeg, and .png are allowed.",
        );
    }

    let limits = StoreLimits {
        chunk_size: state.config.chunk_size,
        max_size: strict.then_some(state.config.max_upload_size),
    };

    match store::store_upload(state.backend.as_ref(), &file_name, field, &limits).await {
        Ok(Some(reference)) => {
            tracing::debug!(reference = %reference, file_name = %file_name, "Stored upload");
            UploadResponse::success(state.config.public_url(&reference))
        }
        Ok(None) => {
            tracing::warn!(file_name = %file_name, "Backend returned no media reference");
            UploadResponse::fail("error")
        }
        Err(StoreError::TooLarge(_)) => UploadResponse::fail("File size exceeds 20MB limit"),
        Err(e) => {
            tracing::error!(error = %e, file_name = %file_name, "Failed to store upload");
            UploadResponse::fail("error")
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Extension including the dot, taken from the last path segment. Case-sensitive.
fn extension(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rfind('.').map(|i| &base[i..]).unwrap_or("")
}
