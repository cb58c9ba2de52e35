/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Directory entries as seen by the tree cache.
//!
//! A [`DirectoryNode`] is a plain value: identity (`dn`), a
//! multi-valued attribute bag, and an optimistic `has_children_hint`.
//! Transient per-node state (loading, expanded, page) never lives
//! here; see [`crate::cache::LoadState`] and
//! [`crate::cursor::PageCursorStore`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Attribute that carries an entry's type tags.
pub const OBJECT_CLASS: &str = "objectClass";

/// The unique hierarchical identifier of an entry (a DN).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dn(String);

impl Dn {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first comma-separated component, trimmed (e.g.
    /// `"ou=people"` for `"ou=people, dc=example,dc=com"`).
    ///
    /// Escaped commas are not interpreted; the whole DN is returned
    /// when it has no comma.
    pub fn rdn(&self) -> &str {
        self.0.split(',').next().map(str::trim).unwrap_or(&self.0)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Dn {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Dn {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Dn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A real entry in the remote directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    /// Identity of the entry.
    pub dn: Dn,
    /// Attribute name to values. Value order carries no meaning.
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Optimistic "may have children" flag, corrected lazily when
    /// the node is first expanded.
    #[serde(default)]
    pub has_children_hint: bool,
}

impl DirectoryNode {
    /// A node with no attributes and `has_children_hint == false`.
    pub fn new(dn: impl Into<Dn>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new(),
            has_children_hint: false,
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.add_attribute(name, value);
        self
    }

    pub fn with_children_hint(mut self, hint: bool) -> Self {
        self.has_children_hint = hint;
        self
    }

    /// Append `value` to attribute `name`, merging with an existing
    /// attribute whose name differs only in case.
    pub fn add_attribute(&mut self, name: &str, value: &str) {
        let key = self
            .attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.attributes
            .entry(key)
            .or_default()
            .push(value.to_string());
    }

    /// All values of `name`. Attribute names compare
    /// case-insensitively.
    pub fn attribute_values(&self, name: &str) -> &[String] {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    /// First non-empty value of `name`, if any.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.attribute_values(name)
            .iter()
            .map(String::as_str)
            .find(|v| !v.is_empty())
    }

    /// The entry's declared type tags.
    pub fn object_classes(&self) -> &[String] {
        self.attribute_values(OBJECT_CLASS)
    }

    /// Friendly label: `cn`, then `uid`, then `ou`, then the RDN.
    pub fn display_name(&self) -> &str {
        ["cn", "uid", "ou"]
            .iter()
            .find_map(|attr| self.first_value(attr))
            .unwrap_or_else(|| self.dn.rdn())
    }
}
