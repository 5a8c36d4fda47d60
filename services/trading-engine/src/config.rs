//! Engine configuration
//!
//! Deserializable with per-field defaults so partial configuration files
//! work, plus environment-variable overrides for deployment.

use serde::Deserialize;
use std::env;
use types::numeric::DEFAULT_PRICE_SCALE;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Number of intake dispatcher threads
    #[serde(default = "default_intake_workers")]
    pub intake_workers: usize,

    #[serde(default = "default_true")]
    pub snapshot_enabled: bool,

    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_seconds: u64,

    /// Decimal digits of fixed-point price precision
    #[serde(default = "default_price_scale")]
    pub price_scale: u32,

    #[serde(default)]
    pub broker: BrokerConfig,

    #[serde(default)]
    pub channels: ChannelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,

    #[serde(default = "default_broker_port")]
    pub port: u16,

    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_order_input_queue")]
    pub order_input_queue: String,

    #[serde(default = "default_trade_channel")]
    pub trade_channel: String,

    #[serde(default = "default_order_update_channel")]
    pub order_update_channel: String,

    #[serde(default = "default_market_data_channel")]
    pub market_data_channel: String,

    #[serde(default = "default_error_channel")]
    pub error_channel: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            intake_workers: default_intake_workers(),
            snapshot_enabled: true,
            snapshot_interval_seconds: default_snapshot_interval(),
            price_scale: default_price_scale(),
            broker: BrokerConfig::default(),
            channels: ChannelConfig::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            password: None,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            order_input_queue: default_order_input_queue(),
            trade_channel: default_trade_channel(),
            order_update_channel: default_order_update_channel(),
            market_data_channel: default_market_data_channel(),
            error_channel: default_error_channel(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `ENGINE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_parse::<usize>("ENGINE_INTAKE_WORKERS") {
            config.intake_workers = value.max(1);
        }
        if let Some(value) = env_parse::<bool>("ENGINE_SNAPSHOT_ENABLED") {
            config.snapshot_enabled = value;
        }
        if let Some(value) = env_parse::<u64>("ENGINE_SNAPSHOT_INTERVAL_SECONDS") {
            config.snapshot_interval_seconds = value;
        }
        if let Some(value) = env_parse::<u32>("ENGINE_PRICE_SCALE") {
            config.price_scale = value;
        }
        if let Ok(value) = env::var("ENGINE_BROKER_HOST") {
            config.broker.host = value;
        }
        if let Some(value) = env_parse::<u16>("ENGINE_BROKER_PORT") {
            config.broker.port = value;
        }
        if let Ok(value) = env::var("ENGINE_BROKER_PASSWORD") {
            config.broker.password = Some(value);
        }
        if let Ok(value) = env::var("ENGINE_ORDER_INPUT_QUEUE") {
            config.channels.order_input_queue = value;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}

fn default_intake_workers() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_snapshot_interval() -> u64 {
    60
}

fn default_price_scale() -> u32 {
    DEFAULT_PRICE_SCALE
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    6379
}

fn default_order_input_queue() -> String {
    "order_input_queue".to_string()
}

fn default_trade_channel() -> String {
    "trades".to_string()
}

fn default_order_update_channel() -> String {
    "order_updates".to_string()
}

fn default_market_data_channel() -> String {
    "market_data".to_string()
}

fn default_error_channel() -> String {
    "errors".to_string()
}
