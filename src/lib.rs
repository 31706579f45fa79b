// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod coerce;
pub mod config;
pub mod constants;
pub mod controllers;
pub mod error;
pub mod kubernetes;
pub mod registry;
pub mod request;
pub mod retry;
pub mod types;

#[cfg(test)]
pub mod test_utils;
