// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{retry, timeouts};
use crate::retry::RetryConfig;
use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Context to select instead of the kubeconfig's current-context
    pub context: Option<String>,
    /// Namespace overriding the selected context's namespace
    pub namespace: Option<String>,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            context: None,
            namespace: None,
            read_timeout: Duration::from_secs(timeouts::DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(timeouts::DEFAULT_WRITE_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let read_timeout_secs: u64 = parse_or(
            non_empty("KUBEGRIP_READ_TIMEOUT_SECS"),
            "KUBEGRIP_READ_TIMEOUT_SECS",
            timeouts::DEFAULT_READ_TIMEOUT_SECS,
        )?;
        let write_timeout_secs: u64 = parse_or(
            non_empty("KUBEGRIP_WRITE_TIMEOUT_SECS"),
            "KUBEGRIP_WRITE_TIMEOUT_SECS",
            timeouts::DEFAULT_WRITE_TIMEOUT_SECS,
        )?;
        let max_attempts: u32 = parse_or(
            non_empty("KUBEGRIP_RETRY_ATTEMPTS"),
            "KUBEGRIP_RETRY_ATTEMPTS",
            retry::DEFAULT_MAX_ATTEMPTS,
        )?;
        let initial_delay_ms: u64 = parse_or(
            non_empty("KUBEGRIP_RETRY_INITIAL_DELAY_MS"),
            "KUBEGRIP_RETRY_INITIAL_DELAY_MS",
            retry::DEFAULT_INITIAL_DELAY_MS,
        )?;
        let max_delay_ms: u64 = parse_or(
            non_empty("KUBEGRIP_RETRY_MAX_DELAY_MS"),
            "KUBEGRIP_RETRY_MAX_DELAY_MS",
            retry::DEFAULT_MAX_DELAY_MS,
        )?;

        Ok(Config {
            context: non_empty("KUBEGRIP_CONTEXT"),
            namespace: non_empty("KUBEGRIP_NAMESPACE"),
            read_timeout: Duration::from_secs(read_timeout_secs),
            write_timeout: Duration::from_secs(write_timeout_secs),
            retry: RetryConfig {
                max_attempts: max_attempts.max(1),
                initial_delay: Duration::from_millis(initial_delay_ms),
                max_delay: Duration::from_millis(max_delay_ms),
                ..RetryConfig::default()
            },
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.read_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("KUBEGRIP_CONTEXT", "prod"),
            ("KUBEGRIP_NAMESPACE", "shop"),
            ("KUBEGRIP_READ_TIMEOUT_SECS", "2"),
            ("KUBEGRIP_RETRY_ATTEMPTS", "5"),
            ("KUBEGRIP_RETRY_INITIAL_DELAY_MS", "50"),
        ])
        .unwrap();

        assert_eq!(config.context.as_deref(), Some("prod"));
        assert_eq!(config.namespace.as_deref(), Some("shop"));
        assert_eq!(config.read_timeout, Duration::from_secs(2));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let config = load(&[("KUBEGRIP_CONTEXT", "  "), ("KUBEGRIP_RETRY_ATTEMPTS", "")]).unwrap();
        assert!(config.context.is_none());
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = load(&[("KUBEGRIP_WRITE_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("KUBEGRIP_WRITE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        let config = load(&[("KUBEGRIP_RETRY_ATTEMPTS", "0")]).unwrap();
        assert_eq!(config.retry.max_attempts, 1);
    }
}
