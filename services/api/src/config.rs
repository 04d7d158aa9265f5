//! Service configuration.
//!
//! # Purpose
//! Reads settings from `STORYBOARD_*` environment variables, then applies an
//! optional YAML override file named by `STORYBOARD_CONFIG`.
//!
//! # Notes
//! Missing required settings (the session secret, Postgres settings for the
//! Postgres backend) fail startup; settings only needed by one endpoint
//! (webhook secret, workflow key) are checked when that endpoint runs.
//!
//! The relay channel and table are only free to change on the memory backend.
//! The Postgres trigger in `migrations/` always publishes `story_info` rows
//! on `story_changes`, so other values are rejected there.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

pub const DEFAULT_CHANNEL: &str = "story_changes";
pub const DEFAULT_WORKFLOW_PATH: &str = "scope";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => bail!("unknown environment: {other}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub base_url: Option<String>,
    pub path: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub channel: String,
    pub table: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub environment: Environment,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    pub auth: AuthConfig,
    pub webhook_secret: Option<String>,
    pub workflow: WorkflowConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ApiConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    environment: Option<Environment>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    auth_secret: Option<String>,
    auth_issuer: Option<String>,
    webhook_secret: Option<String>,
    workflow_url: Option<String>,
    workflow_path: Option<String>,
    workflow_key: Option<String>,
    channel: Option<String>,
    table: Option<String>,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::load_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::load_env()?;
        if let Some(path) = env_opt("STORYBOARD_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read STORYBOARD_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn load_env() -> Result<Self> {
        let bind_addr = env_opt("STORYBOARD_BIND")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .with_context(|| "parse STORYBOARD_BIND")?;
        let metrics_bind = env_opt("STORYBOARD_METRICS_BIND")
            .unwrap_or_else(|| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse STORYBOARD_METRICS_BIND")?;
        let environment = match env_opt("STORYBOARD_ENV") {
            Some(value) => Environment::parse(&value)?,
            None => Environment::Development,
        };
        let storage = match env_opt("STORYBOARD_STORAGE").as_deref() {
            None | Some("memory") => StorageBackend::Memory,
            Some("postgres") => StorageBackend::Postgres,
            Some(other) => bail!("unknown STORYBOARD_STORAGE: {other}"),
        };
        let postgres = match env_opt("STORYBOARD_PG_URL") {
            Some(url) => Some(PostgresConfig {
                url,
                max_connections: parse_env_or("STORYBOARD_PG_MAX_CONNECTIONS", 10)?,
                connect_timeout_ms: parse_env_or("STORYBOARD_PG_CONNECT_TIMEOUT_MS", 5000)?,
                acquire_timeout_ms: parse_env_or("STORYBOARD_PG_ACQUIRE_TIMEOUT_MS", 5000)?,
            }),
            None => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            environment,
            storage,
            postgres,
            auth: AuthConfig {
                secret: env_opt("STORYBOARD_AUTH_SECRET").unwrap_or_default(),
                issuer: env_opt("STORYBOARD_AUTH_ISSUER"),
            },
            webhook_secret: env_opt("STORYBOARD_WEBHOOK_SECRET"),
            workflow: WorkflowConfig {
                base_url: env_opt("STORYBOARD_WORKFLOW_URL"),
                path: env_opt("STORYBOARD_WORKFLOW_PATH")
                    .unwrap_or_else(|| DEFAULT_WORKFLOW_PATH.to_string()),
                api_key: env_opt("STORYBOARD_WORKFLOW_KEY"),
            },
            relay: RelayConfig {
                channel: env_opt("STORYBOARD_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
                table: env_opt("STORYBOARD_TABLE")
                    .unwrap_or_else(|| crate::store::STORY_TABLE.to_string()),
            },
        })
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ApiConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse storyboard config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.environment {
            self.environment = value;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.auth_secret {
            self.auth.secret = value;
        }
        if let Some(value) = override_cfg.auth_issuer {
            self.auth.issuer = Some(value);
        }
        if let Some(value) = override_cfg.webhook_secret {
            self.webhook_secret = Some(value);
        }
        if let Some(value) = override_cfg.workflow_url {
            self.workflow.base_url = Some(value);
        }
        if let Some(value) = override_cfg.workflow_path {
            self.workflow.path = value;
        }
        if let Some(value) = override_cfg.workflow_key {
            self.workflow.api_key = Some(value);
        }
        if let Some(value) = override_cfg.channel {
            self.relay.channel = value;
        }
        if let Some(value) = override_cfg.table {
            self.relay.table = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.auth.secret.trim().is_empty() {
            bail!("STORYBOARD_AUTH_SECRET is not configured");
        }
        if self.storage == StorageBackend::Postgres {
            if self.relay.channel != DEFAULT_CHANNEL {
                bail!(
                    "STORYBOARD_CHANNEL={} is not supported with postgres storage; the trigger publishes on {DEFAULT_CHANNEL}",
                    self.relay.channel
                );
            }
            if self.relay.table != crate::store::STORY_TABLE {
                bail!(
                    "STORYBOARD_TABLE={} is not supported with postgres storage; the trigger watches {}",
                    self.relay.table,
                    crate::store::STORY_TABLE
                );
            }
        }
        Ok(())
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(key) {
        Some(value) => value.parse().with_context(|| format!("parse {key}")),
        None => Ok(default),
    }
}
