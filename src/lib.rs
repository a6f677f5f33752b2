//! tgstate - serve files stored in a Telegram channel as ordinary HTTP downloads
//!
//! The channel is used purely as an opaque blob store addressed by file ids:
//! - Uploads are posted to the channel as documents; large files are split
//!   into chunks tied together by a manifest object
//! - Downloads stream stored bytes back, reassembling manifests on the fly
//! - A bot command loop answers "get" replies with direct download links
//! - An optional shared-secret cookie gate guards the web routes

pub mod access;
pub mod api;
pub mod backend;
pub mod command_loop;
pub mod config;
pub mod manifest;
pub mod relay;
pub mod sniff;
pub mod store;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use access::AccessPolicy;
use backend::Backend;
use config::Config;

/// Shared application state
pub struct AppState {
    pub access: Arc<dyn AccessPolicy>,
    pub backend: Arc<dyn Backend>,
    pub config: Config,
}
