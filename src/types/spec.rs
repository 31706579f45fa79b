// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::attributes::{AttrValue, Attributes};
use super::kind::ResourceKind;
use crate::error::ResourceRef;

/// Caller-supplied description of a resource, built per operation
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: String,
    pub namespace: String,
    pub attributes: Attributes,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    /// Map-valued attribute, `None` when absent or not a map
    pub fn attr_map(&self, key: &str) -> Option<&Attributes> {
        self.attr(key).and_then(AttrValue::as_map)
    }

    pub fn attr_list(&self, key: &str) -> Option<&[AttrValue]> {
        self.attr(key).and_then(AttrValue::as_list)
    }

    pub fn target(&self) -> ResourceRef {
        ResourceRef::new(self.kind, &self.name, &self.namespace)
    }
}
