//! Access gate in front of every route except login.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::AppState;

/// Cookie carrying the submitted password.
pub const ACCESS_COOKIE: &str = "p";

/// Where denied requests are sent.
pub const LOGIN_ROUTE: &str = "/pwd";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Decides whether presented credentials grant access.
pub trait AccessPolicy: Send + Sync {
    fn check(&self, credentials: Option<&str>) -> Access;
}

/// Literal comparison against a configured secret. An empty secret or
/// "none" leaves the gate open.
#[derive(Debug, Clone)]
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn is_open(&self) -> bool {
        self.secret.is_empty() || self.secret == "none"
    }
}

impl AccessPolicy for SharedSecret {
    fn check(&self, credentials: Option<&str>) -> Access {
        if self.is_open() || credentials == Some(self.secret.as_str()) {
            Access::Allow
        } else {
            Access::Deny
        }
    }
}

/// Middleware: redirect to the login route unless the access cookie passes.
pub async fn require_access(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    let credentials = jar.get(ACCESS_COOKIE).map(|c| c.value());

    match state.access.check(credentials) {
        Access::Allow => next.run(req).await,
        Access::Deny => {
            tracing::debug!(path = %req.uri().path(), "Access denied, redirecting to login");
            Redirect::to(LOGIN_ROUTE).into_response()
        }
    }
}
