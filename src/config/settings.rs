// src/config/settings.rs

use std::{env, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// Everything the process needs to start: secrets from the environment,
/// the rest from `config/{APP_ENV}.toml`.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub jwt_secret: String,
    pub stripe: StripeSettings,
    pub storage: StorageSettings,
    pub home_bot: HomeBotSettings,
    pub lowes: ScraperSettings,
    pub redfin: ScraperSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 5000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(skip)]
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { url: String::new(), max_connections: 5, acquire_timeout_secs: 3 }
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StripeSettings {
    #[serde(skip)]
    pub secret_key: String,
    #[serde(skip)]
    pub webhook_secret: String,
    pub api_base: String,
    pub success_url: String,
    pub cancel_url: String,
    pub monthly_price_id: String,
    pub yearly_price_id: String,
    pub payment_method_types: Vec<String>,
    pub webhook_tolerance_secs: i64,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            webhook_secret: String::new(),
            api_base: "https://api.stripe.com/v1".to_string(),
            success_url: "http://localhost:3000/payment/success?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "http://localhost:3000/payment/cancel".to_string(),
            monthly_price_id: String::new(),
            yearly_price_id: String::new(),
            payment_method_types: vec!["card".to_string()],
            webhook_tolerance_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bucket: String,
    pub region: String,
    /// Path-style endpoint override (MinIO, LocalStack).
    pub endpoint: Option<String>,
    pub presign_ttl_secs: u64,
    #[serde(skip)]
    pub access_key_id: String,
    #[serde(skip)]
    pub secret_access_key: String,
    #[serde(skip)]
    pub session_token: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            bucket: "home-pulse-ai".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            presign_ttl_secs: 600,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomeBotSettings {
    pub index_path: String,
    pub nearest_neighbors: usize,
    pub embedding_dims: usize,
}

impl Default for HomeBotSettings {
    fn default() -> Self {
        Self {
            index_path: "data/appliance_lifespans.json".to_string(),
            nearest_neighbors: 3,
            embedding_dims: 384,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub base_url: String,
    pub user_agent: String,
    pub delay_ms: u64,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36"
                .to_string(),
            delay_ms: 1500,
            max_retries: 3,
            timeout_secs: 20,
        }
    }
}

/// Shape of `config/{APP_ENV}.toml`. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    server: ServerSettings,
    database: DatabaseSettings,
    stripe: StripeSettings,
    storage: StorageSettings,
    home_bot: HomeBotSettings,
    lowes: ScraperSettings,
    redfin: ScraperSettings,
}

fn required_env(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{name} must be set"))
}

impl Settings {
    /// Loads `.env`, then `config/{APP_ENV}.toml`, then the secrets.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let environment = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let config_dir = env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        let path = Path::new(&config_dir).join(format!("{environment}.toml"));

        let file = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::parse_file(&raw).with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            FileSettings::default()
        };

        let mut settings = Self::from_file(environment, file);

        settings.database.url = required_env("DATABASE_URL")?;
        settings.jwt_secret = required_env("JWT_SECRET")?;
        settings.stripe.secret_key = required_env("STRIPE_SECRET_KEY")?;
        settings.stripe.webhook_secret = required_env("STRIPE_WEBHOOK_SECRET")?;
        settings.storage.access_key_id = required_env("AWS_ACCESS_KEY_ID")?;
        settings.storage.secret_access_key = required_env("AWS_SECRET_ACCESS_KEY")?;
        settings.storage.session_token = env::var("AWS_SESSION_TOKEN").ok();

        if let Ok(port) = env::var("PORT") {
            settings.server.port = port.parse().context("PORT must be a number")?;
        }

        Ok(settings)
    }

    fn parse_file(raw: &str) -> anyhow::Result<FileSettings> {
        Ok(toml::from_str(raw)?)
    }

    fn from_file(environment: String, file: FileSettings) -> Self {
        Self {
            environment,
            server: file.server,
            database: file.database,
            jwt_secret: String::new(),
            stripe: file.stripe,
            storage: file.storage,
            home_bot: file.home_bot,
            lowes: file.lowes,
            redfin: file.redfin,
        }
    }

    /// Settings with defaults only and the given secrets, for tests and tooling.
    pub fn with_secrets(database_url: &str, jwt_secret: &str) -> Self {
        let mut settings = Self::from_file("test".to_string(), FileSettings::default());
        settings.database.url = database_url.to_string();
        settings.jwt_secret = jwt_secret.to_string();
        settings
    }
}
