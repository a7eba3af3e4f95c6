use std::path::Path;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

fn default_signature_timeout() -> i64 {
    300
}

fn default_initial_cash() -> f64 {
    1_000_000.0
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredential {
    pub client_id: String,
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Maximum allowed |server time - request timestamp| in seconds.
    #[serde(default = "default_signature_timeout")]
    pub signature_timeout_secs: i64,
    pub clients: Vec<ClientCredential>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraderConfig {
    pub account_id: String,
    pub display_name: Option<String>,
    #[serde(default = "default_initial_cash")]
    pub initial_cash: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub traders: Vec<TraderConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 9091,
            },
            auth: AuthConfig {
                signature_timeout_secs: default_signature_timeout(),
                clients: vec![ClientCredential {
                    client_id: "demo_client".to_string(),
                    secret_key: "demo_secret_key".to_string(),
                }],
            },
            traders: vec![TraderConfig {
                account_id: "1000001".to_string(),
                display_name: Some("paper account".to_string()),
                initial_cash: default_initial_cash(),
                enabled: true,
            }],
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file with `GATEWAY_`-prefixed environment overrides
    /// (e.g. `GATEWAY_SERVER__PORT=8080`). A missing file falls back to the
    /// built-in demo configuration.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = if Path::new(path).exists() {
            let raw = Config::builder()
                .add_source(File::with_name(path))
                .add_source(Environment::with_prefix("GATEWAY").separator("__"))
                .build()
                .with_context(|| format!("failed to read configuration from {}", path))?;
            raw.try_deserialize::<GatewayConfig>()
                .context("invalid configuration")?
        } else {
            log::warn!("{} not found, using built-in demo configuration", path);
            GatewayConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn enabled_traders(&self) -> impl Iterator<Item = &TraderConfig> {
        self.traders.iter().filter(|t| t.enabled)
    }

    fn validate(&self) -> Result<()> {
        if self.enabled_traders().next().is_none() {
            bail!("configuration enables no trading accounts");
        }
        if self.auth.clients.is_empty() {
            bail!("configuration defines no API clients");
        }
        for client in &self.auth.clients {
            if client.client_id.is_empty() || client.secret_key.is_empty() {
                bail!("API client entries need both client_id and secret_key");
            }
        }
        for trader in self.enabled_traders() {
            if trader.account_id.is_empty() {
                bail!("trading account entries need an account_id");
            }
        }
        if self.auth.signature_timeout_secs <= 0 {
            bail!("signature_timeout_secs must be positive");
        }
        Ok(())
    }
}
