// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Caller-facing data model: attribute bags, resource specs and results.

pub mod attributes;
pub mod kind;
pub mod outcome;
pub mod spec;

pub use attributes::{AttrValue, Attributes};
pub use kind::ResourceKind;
pub use outcome::{Action, BulkDeleteSummary, ListOutcome, ListScope, OperationResult};
pub use spec::ResourceSpec;
