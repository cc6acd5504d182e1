use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    pub url: String,
    pub progress_topic: String,
    pub completion_topic: String,
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingConfig {
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub grace_period_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub push: PushConfig,
    pub listing: ListingConfig,
    pub search: SearchConfig,
    pub upload: UploadConfig,
    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(client_cfg) => client_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.upload.grace_period_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.push.reconnect_delay_ms)
    }
}

pub fn load() -> anyhow::Result<ClientConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: drivedesk.toml (in CWD)
        .add_source(::config::File::with_name("drivedesk").required(false));

    if let Ok(custom_path) = std::env::var("DRIVEDESK_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("DRIVEDESK").separator("__"));

    let cfg = builder.build()?;
    let client_cfg: ClientConfig = cfg.try_deserialize()?;
    validate(&client_cfg)?;
    Ok(client_cfg)
}

pub fn validate(cfg: &ClientConfig) -> anyhow::Result<()> {
    // API
    let base = url::Url::parse(&cfg.api.base_url)
        .map_err(|e| anyhow::anyhow!("invalid api.base_url {:?}: {}", cfg.api.base_url, e))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(anyhow::anyhow!("api.base_url must use http or https"));
    }
    if cfg.api.timeout_secs == 0 {
        return Err(anyhow::anyhow!("api.timeout_secs must be > 0"));
    }

    // Push
    let push = url::Url::parse(&cfg.push.url)
        .map_err(|e| anyhow::anyhow!("invalid push.url {:?}: {}", cfg.push.url, e))?;
    if !matches!(push.scheme(), "ws" | "wss") {
        return Err(anyhow::anyhow!("push.url must use ws or wss"));
    }
    if cfg.push.reconnect_delay_ms == 0 {
        return Err(anyhow::anyhow!("push.reconnect_delay_ms must be > 0"));
    }
    if cfg.push.progress_topic.is_empty() || cfg.push.completion_topic.is_empty() {
        return Err(anyhow::anyhow!("push topics must not be empty"));
    }

    // Listing / search
    if cfg.listing.page_size == 0 || cfg.listing.page_size > 200 {
        return Err(anyhow::anyhow!("listing.page_size must be in 1..=200"));
    }
    if cfg.search.page_size == 0 || cfg.search.page_size > 200 {
        return Err(anyhow::anyhow!("search.page_size must be in 1..=200"));
    }
    if cfg.search.debounce_ms == 0 {
        return Err(anyhow::anyhow!("search.debounce_ms must be > 0"));
    }

    if cfg.session.file.trim().is_empty() {
        tracing::warn!("session.file is empty - sessions will not be persisted");
    }

    Ok(())
}
