//! Shared test helpers.

use std::sync::Arc;
use std::time::Duration;

use crate::access::SharedSecret;
use crate::backend::MemoryBackend;
use crate::config::Config;
use crate::AppState;

/// Create a test AppState over an in-memory backend. `configure` adjusts the
/// defaults before the state is built.
pub fn test_state(configure: impl FnOnce(&mut Config)) -> (Arc<MemoryBackend>, Arc<AppState>) {
    let mut config = Config {
        bind_address: "127.0.0.1:0".to_string(),
        manifest_hold: Duration::ZERO,
        ..Config::default()
    };
    config.bot.token = "test-token".to_string();
    config.bot.channel = "@test".to_string();
    configure(&mut config);

    let backend = Arc::new(MemoryBackend::new());
    let state = Arc::new(AppState {
        access: Arc::new(SharedSecret::new(config.access_secret.clone())),
        backend: backend.clone(),
        config,
    });
    (backend, state)
}
