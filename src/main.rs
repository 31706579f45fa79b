// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kubegrip::config::Config;
use kubegrip::controllers::ControllerSettings;
use kubegrip::kubernetes::load_registry;
use kubegrip::request::{execute, Request};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    debug!("Configuration loaded: {:?}", config);

    let registry = Arc::new(load_registry(&config).await?);
    info!(
        "Using context {} (namespace {})",
        registry.current_context().await.unwrap_or_default(),
        registry.current_namespace().await
    );

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read request from stdin")?;
    // YAML is a superset of JSON, so either works
    let request: Request = serde_yaml::from_str(&input).context("Failed to parse request")?;

    let settings = ControllerSettings::from(&config);
    let output = execute(registry, &settings, &request).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
