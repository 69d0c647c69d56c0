//! CLI Configuration

use std::time::Duration;

use siobridge_core::BridgeConfig;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Socket.IO server URL.
    pub url: String,
    /// Connect timeout override in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Ack timeout override in milliseconds.
    pub ack_timeout_ms: Option<u64>,
}

impl CliConfig {
    /// Builds the bridge configuration, layering flags over the environment.
    pub fn bridge_config(&self) -> BridgeConfig {
        let mut config = BridgeConfig::from_env().with_default_url(&self.url);
        if let Some(ms) = self.connect_timeout_ms {
            config = config.with_connect_timeout_ms(ms);
        }
        if let Some(ms) = self.ack_timeout_ms {
            config = config.with_ack_timeout_ms(ms);
        }
        config
    }

    /// Effective ack timeout.
    pub fn ack_timeout(&self) -> Duration {
        self.bridge_config().ack_timeout()
    }
}
