use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::response::ApiError;
use crate::relay::{self, Relayed, RelayOptions, BINARY_CONTENT_TYPE};
use crate::AppState;

/// Route: GET <prefix>*reference
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Response, ApiError> {
    relay_reference(&state, &reference).await
}

/// Route: GET <prefix> with nothing after it.
pub async fn download_empty() -> ApiError {
    ApiError::NotFound
}

async fn relay_reference(state: &AppState, reference: &str) -> Result<Response, ApiError> {
    let options = RelayOptions {
        sniff_window: state.config.sniff_window,
        manifest_hold: state.config.manifest_hold,
    };

    let relayed = relay::open(Arc::clone(&state.backend), reference, &options).await?;

    let response = match relayed {
        Relayed::Manifest { file_name, body } => {
            let mut response = (StatusCode::OK, Body::from_stream(body)).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static(BINARY_CONTENT_TYPE),
            );
            // A name that cannot go in a header still downloads, just unnamed.
            let disposition = format!("attachment; filename=\"{file_name}\"")
                .parse()
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
            headers.insert(header::CONTENT_DISPOSITION, disposition);
            response
        }
        Relayed::Raw { content_type, body } => {
            let mut response = (StatusCode::OK, Body::from_stream(body)).into_response();
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
            headers.insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("inline"),
            );
            response
        }
    };

    Ok(response)
}
