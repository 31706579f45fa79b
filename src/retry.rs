// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded retry with exponential backoff and jitter.
//!
//! Only read paths go through here. The caller decides which errors are worth
//! another attempt; anything the predicate rejects ends the loop on the spot.
//! Dropping the returned future cancels both the in-flight attempt and any
//! pending backoff sleep.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::constants::retry::{
    BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one; always at least 1
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff_multiplier: BACKOFF_MULTIPLIER,
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
    /// The predicate refused to retry, as opposed to running out of attempts
    pub terminal: bool,
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// `config.max_attempts` attempts have been made.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        let e = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !should_retry(&e) {
            return Err(RetryError {
                error: e,
                attempts: attempt,
                terminal: true,
            });
        }

        if attempt >= max_attempts {
            error!(
                operation = %operation_name,
                attempt = attempt,
                error = %e,
                "Operation failed after max retries"
            );
            return Err(RetryError {
                error: e,
                attempts: attempt,
                terminal: false,
            });
        }

        // Jitter between 0.5x and 1.5x of the delay
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

        warn!(
            operation = %operation_name,
            attempt = attempt,
            error = %e,
            delay_ms = jittered_delay.as_millis(),
            "Operation failed, retrying"
        );

        tokio::time::sleep(jittered_delay).await;

        delay = Duration::from_secs_f64(
            (delay.as_secs_f64() * config.backoff_multiplier).min(config.max_delay.as_secs_f64()),
        );
    }
}
