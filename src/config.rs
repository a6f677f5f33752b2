use std::time::Duration;

use thiserror::Error;

/// Strict-mode upload ceiling, matching the backend's download limit.
pub const MAX_UPLOAD_SIZE: u64 = 20 * 1024 * 1024;

/// How much of a downloaded object is read before deciding manifest vs raw.
pub const SNIFF_WINDOW: usize = 10 * 1024 * 1024;

/// Largest single object written by the upload path. Anything bigger is split.
pub const CHUNK_SIZE: usize = 20 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub bot: BotConfig,
    /// Public base URL used when composing direct links.
    pub base_url: String,
    pub mode: Mode,
    /// Access gate secret. Empty or "none" disables the gate.
    pub access_secret: String,
    /// Download route prefix, always with leading and trailing slash.
    pub route_prefix: String,
    pub max_upload_size: u64,
    pub sniff_window: usize,
    pub chunk_size: usize,
    /// Delay before releasing a reconstructed download.
    pub manifest_hold: Duration,
    pub poll_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Target channel: either "@handle" or a numeric chat id.
    pub channel: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Size and extension checks apply to uploads.
    Strict,
    /// Any file is accepted; large files are chunked.
    PassThrough,
}

impl Mode {
    fn parse(value: &str) -> Self {
        match value.trim() {
            "p" => Mode::PassThrough,
            _ => Mode::Strict,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8088".to_string(),
            bot: BotConfig::default(),
            base_url: String::new(),
            mode: Mode::Strict,
            access_secret: String::new(),
            route_prefix: "/d/".to_string(),
            max_upload_size: MAX_UPLOAD_SIZE,
            sniff_window: SNIFF_WINDOW,
            chunk_size: CHUNK_SIZE,
            manifest_hold: Duration::from_secs(10),
            poll_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let bot = BotConfig {
            token: std::env::var("BOT_TOKEN").unwrap_or_default(),
            channel: std::env::var("CHANNEL").unwrap_or_default(),
            api_url: std::env::var("TELEGRAM_API_URL").unwrap_or(defaults.bot.api_url),
        };

        let base_url = std::env::var("BASE_URL").unwrap_or_default();
        let mode = Mode::parse(&std::env::var("MODE").unwrap_or_default());
        let access_secret = std::env::var("ACCESS_SECRET").unwrap_or_default();

        let route_prefix = std::env::var("ROUTE_PREFIX")
            .map(|p| normalize_prefix(&p))
            .unwrap_or(defaults.route_prefix);

        let manifest_hold = std::env::var("MANIFEST_HOLD_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.manifest_hold);

        let poll_timeout = std::env::var("POLL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_timeout);

        let config = Config {
            bind_address,
            bot,
            base_url,
            mode,
            access_secret,
            route_prefix,
            manifest_hold,
            poll_timeout,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "BOT_TOKEN cannot be empty".to_string(),
            ));
        }

        if self.bot.channel.is_empty() {
            return Err(ConfigError::ValidationError(
                "CHANNEL cannot be empty".to_string(),
            ));
        }

        if self.route_prefix == "/" {
            return Err(ConfigError::ValidationError(
                "ROUTE_PREFIX cannot be the root route".to_string(),
            ));
        }

        if self.base_url.is_empty() {
            tracing::warn!("BASE_URL is not set; direct links will be relative paths.");
        }

        Ok(())
    }

    pub fn is_pass_through(&self) -> bool {
        self.mode == Mode::PassThrough
    }

    /// Public URL for a stored reference: absolute when a base URL is known.
    pub fn public_url(&self, reference: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.route_prefix,
            reference
        )
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}
