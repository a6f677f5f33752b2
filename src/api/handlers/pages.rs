use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::AppState;

/// Route: GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    if state.config.is_pass_through() {
        render("Files", FILES_FORM)
    } else {
        render("Images", IMAGES_FORM)
    }
}

pub(super) fn render(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n<body>\n{body}\n</body>\n</html>\n"
    ))
}

const IMAGES_FORM: &str = r#"<form method="post" action="/api" enctype="multipart/form-data">
  <input type="file" name="image" accept=".jpg,.jpeg,.png">
  <button type="submit">Upload</button>
</form>"#;

const FILES_FORM: &str = r#"<form method="post" action="/api" enctype="multipart/form-data">
  <input type="file" name="image">
  <button type="submit">Upload</button>
</form>"#;
