/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use crate::node::DirectoryNode;

/// Lowercase substrings marking an object class as a definite leaf.
pub const LEAF_PATTERNS: &[&str] = &[
    "person",
    "user",
    "inetorgperson",
    "posixaccount",
    "computer",
    "device",
    "printer",
    "certificate",
    "alias",
];

/// Whether a node should offer an expand affordance before its
/// children are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expandability {
    /// May have children; show the affordance.
    Eligible,
    /// Known leaf type; never show the affordance.
    Leaf,
}

impl Expandability {
    pub fn is_eligible(self) -> bool {
        matches!(self, Expandability::Eligible)
    }
}

/// Classify a set of type tags.
///
/// No tags at all is `Eligible` (false positives are preferred over
/// hiding a browsable subtree). Any tag containing one of
/// [`LEAF_PATTERNS`], compared case-insensitively, is `Leaf`.
pub fn classify<S: AsRef<str>>(object_classes: &[S]) -> Expandability {
    let is_leaf = object_classes.iter().any(|oc| {
        let lower = oc.as_ref().to_ascii_lowercase();
        LEAF_PATTERNS.iter().any(|p| lower.contains(p))
    });
    if is_leaf {
        Expandability::Leaf
    } else {
        Expandability::Eligible
    }
}

/// Classify a node by its `objectClass` values.
pub fn classify_node(node: &DirectoryNode) -> Expandability {
    classify(node.object_classes())
}
