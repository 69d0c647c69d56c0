//! One-Shot Commands
//!
//! Connect, send a single event, disconnect.

use anyhow::{Context, Result};
use siobridge_core::{Bridge, ConnectOptions};

use super::parse_payload;
use crate::config::CliConfig;
use crate::display;

/// Sends one event without waiting for a reply.
pub fn emit(config: &CliConfig, event: &str, data: Option<&str>) -> Result<()> {
    let payload = parse_payload(data);
    let mut bridge = Bridge::new(config.bridge_config());

    bridge
        .connect(&config.url, ConnectOptions::default())
        .with_context(|| format!("connect to {}", config.url))?;
    bridge
        .emit(event, payload)
        .with_context(|| format!("emit {}", event))?;
    bridge.disconnect()?;

    display::success(&format!("Emitted {}", event));
    Ok(())
}

/// Sends one event and prints the server's acknowledgement.
pub fn ack(config: &CliConfig, event: &str, data: Option<&str>) -> Result<()> {
    let payload = parse_payload(data);
    let mut bridge = Bridge::new(config.bridge_config());

    bridge
        .connect(&config.url, ConnectOptions::default())
        .with_context(|| format!("connect to {}", config.url))?;
    let reply = bridge.emit_with_ack(event, payload, Some(config.ack_timeout()));
    bridge.disconnect()?;

    let reply = reply.with_context(|| format!("ack for {}", event))?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
