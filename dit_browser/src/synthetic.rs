/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Tree identities and non-entry tree items.
//!
//! Real entries and synthetic rows (placeholders, pagination
//! controls) share one tree but never one identity space: a
//! [`NodeKey`] is a tagged union, so no consumer has to sniff a
//! string prefix to tell them apart.

use std::borrow::Cow;
use std::fmt;

use enum_as_inner::EnumAsInner;

use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::tree::TreeNode;

/// Rendered prefix for synthetic identities.
pub const SYNTHETIC_PREFIX: &str = "~synthetic:";

/// Label of the placeholder row.
pub const PLACEHOLDER_LABEL: &str = "Loading...";

/// Identity of a synthetic row, unique for the lifetime of its
/// factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SyntheticId(u64);

/// Identity of a node in the tree cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    /// The invisible root of the cached forest. Never rendered.
    Forest,
    /// The namespace root pseudo-node (Root DSE).
    RootDse,
    /// A real entry.
    Entry(Dn),
    /// A placeholder or pagination row.
    Synthetic(SyntheticId),
}

impl NodeKey {
    pub fn entry(dn: impl Into<Dn>) -> Self {
        NodeKey::Entry(dn.into())
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKey::Synthetic(_))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Forest => f.write_str("<forest>"),
            NodeKey::RootDse => f.write_str("<root-dse>"),
            NodeKey::Entry(dn) => write!(f, "{}", dn),
            NodeKey::Synthetic(SyntheticId(n)) => write!(f, "{}{}", SYNTHETIC_PREFIX, n),
        }
    }
}

/// Coarse node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Real,
    Placeholder,
    PaginationPrev,
    PaginationNext,
    PaginationInfo,
    Root,
}

/// What a tree node holds.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum TreeItem {
    /// Payload of [`NodeKey::Forest`].
    Forest,
    /// Payload of [`NodeKey::RootDse`].
    Root,
    /// A real directory entry.
    Entry(DirectoryNode),
    /// Stand-in child so an expand affordance renders before the
    /// first fetch.
    Placeholder,
    /// Go to the page before `page` (0-based page shown when the
    /// control was created).
    PaginationPrev { page: u32 },
    /// Go to the page after `page`.
    PaginationNext { page: u32 },
    /// Non-actionable "— Page N —" row.
    PaginationInfo { page: u32 },
}

impl TreeItem {
    pub fn kind(&self) -> NodeKind {
        match self {
            TreeItem::Forest | TreeItem::Root => NodeKind::Root,
            TreeItem::Entry(_) => NodeKind::Real,
            TreeItem::Placeholder => NodeKind::Placeholder,
            TreeItem::PaginationPrev { .. } => NodeKind::PaginationPrev,
            TreeItem::PaginationNext { .. } => NodeKind::PaginationNext,
            TreeItem::PaginationInfo { .. } => NodeKind::PaginationInfo,
        }
    }

    pub fn is_real(&self) -> bool {
        self.kind() == NodeKind::Real
    }

    /// True for rows the user can activate to change page.
    pub fn is_page_control(&self) -> bool {
        matches!(
            self,
            TreeItem::PaginationPrev { .. } | TreeItem::PaginationNext { .. }
        )
    }

    /// Row label. Real entries show their full DN.
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            TreeItem::Forest => Cow::Borrowed(""),
            TreeItem::Root => Cow::Borrowed("Root DSE"),
            TreeItem::Entry(node) => Cow::Borrowed(node.dn.as_str()),
            TreeItem::Placeholder => Cow::Borrowed(PLACEHOLDER_LABEL),
            TreeItem::PaginationPrev { .. } => Cow::Borrowed("◀ Previous Page"),
            TreeItem::PaginationNext { .. } => Cow::Borrowed("Next Page ▶"),
            TreeItem::PaginationInfo { page } => Cow::Owned(format!("— Page {} —", page + 1)),
        }
    }
}

/// Mints placeholder and pagination rows with fresh identities.
#[derive(Debug, Default)]
pub struct SyntheticNodeFactory {
    next_id: u64,
}

impl SyntheticNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint(&mut self, item: TreeItem) -> TreeNode {
        self.next_id += 1;
        TreeNode::new(NodeKey::Synthetic(SyntheticId(self.next_id)), item)
    }

    pub fn placeholder(&mut self) -> TreeNode {
        self.mint(TreeItem::Placeholder)
    }

    /// Pagination rows for a page result, in display order
    /// (previous, next, info). Empty when neither neighbour exists.
    pub fn pagination(&mut self, page: u32, has_prev: bool, has_next: bool) -> Vec<TreeNode> {
        let mut rows = Vec::new();
        if has_prev {
            rows.push(self.mint(TreeItem::PaginationPrev { page }));
        }
        if has_next {
            rows.push(self.mint(TreeItem::PaginationNext { page }));
        }
        if has_prev || has_next {
            rows.push(self.mint(TreeItem::PaginationInfo { page }));
        }
        rows
    }
}
