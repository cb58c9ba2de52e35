/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::ops::ControlFlow;

use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::synthetic::NodeKey;
use crate::synthetic::TreeItem;

/// A node in the cached forest.
///
/// Ownership encodes the parent relation: every non-root node is
/// owned by exactly one `children` vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    /// Identity; unique among siblings.
    pub key: NodeKey,
    /// Entry or synthetic payload.
    pub item: TreeItem,
    /// Presentation only. Collapsing never drops `children`.
    pub expanded: bool,
    /// Cached children in display order.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(key: NodeKey, item: TreeItem) -> Self {
        Self {
            key,
            item,
            expanded: false,
            children: Vec::new(),
        }
    }

    /// A collapsed node for a real entry.
    pub fn entry(node: DirectoryNode) -> Self {
        Self::new(NodeKey::Entry(node.dn.clone()), TreeItem::Entry(node))
    }

    pub fn forest() -> Self {
        Self::new(NodeKey::Forest, TreeItem::Forest)
    }

    pub fn root_dse() -> Self {
        Self::new(NodeKey::RootDse, TreeItem::Root)
    }

    pub fn dn(&self) -> Option<&Dn> {
        self.item.as_entry().map(|n| &n.dn)
    }

    /// Whether the row should render an expand/collapse affordance.
    pub fn has_affordance(&self) -> bool {
        match &self.item {
            TreeItem::Root => true,
            TreeItem::Entry(node) => node.has_children_hint || !self.children.is_empty(),
            _ => false,
        }
    }
}

/// Generic tree fold.
///
/// Applies `f` to each node after its children, passing the
/// children's results.
pub fn fold_tree<'a, B, F>(node: &'a TreeNode, f: &F) -> B
where
    F: Fn(&'a TreeNode, Vec<B>) -> B,
{
    let child_results: Vec<B> = node
        .children
        .iter()
        .map(|child| fold_tree(child, f))
        .collect();
    f(node, child_results)
}

/// Like [`fold_tree`], but also passes the current depth.
pub fn fold_tree_with_depth<'a, B, F>(node: &'a TreeNode, depth: usize, f: &F) -> B
where
    F: Fn(&'a TreeNode, usize, Vec<B>) -> B,
{
    let child_results: Vec<B> = node
        .children
        .iter()
        .map(|child| fold_tree_with_depth(child, depth + 1, f))
        .collect();
    f(node, depth, child_results)
}

/// Mutable pre-order walk with early exit.
///
/// Returning `ControlFlow::Break` from `f` stops the traversal.
pub fn fold_tree_mut<B, F>(node: &mut TreeNode, f: &mut F) -> ControlFlow<B>
where
    F: for<'a> FnMut(&'a mut TreeNode) -> ControlFlow<B>,
{
    f(node)?;
    for child in &mut node.children {
        fold_tree_mut(child, f)?;
    }
    ControlFlow::Continue(())
}

/// Find a node by key.
pub fn find_node<'a>(node: &'a TreeNode, key: &NodeKey) -> Option<&'a TreeNode> {
    if node.key == *key {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_node(child, key))
}

/// Find a node by key (mutable).
pub fn find_node_mut<'a>(node: &'a mut TreeNode, key: &NodeKey) -> Option<&'a mut TreeNode> {
    if node.key == *key {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| find_node_mut(child, key))
}

/// Find the parent of the node with `key`.
pub fn find_parent<'a>(node: &'a TreeNode, key: &NodeKey) -> Option<&'a TreeNode> {
    if node.children.iter().any(|c| c.key == *key) {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_parent(child, key))
}

/// Find the parent of the node with `key` (mutable).
pub fn find_parent_mut<'a>(node: &'a mut TreeNode, key: &NodeKey) -> Option<&'a mut TreeNode> {
    if node.children.iter().any(|c| c.key == *key) {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|child| find_parent_mut(child, key))
}

/// Every key in the subtree rooted at `node`, including its own.
pub fn collect_keys(node: &TreeNode) -> Vec<NodeKey> {
    fold_tree(node, &|n, child_results: Vec<Vec<NodeKey>>| {
        let mut keys = vec![n.key.clone()];
        keys.extend(child_results.into_iter().flatten());
        keys
    })
}

/// Keys of every expanded node in the subtree.
pub fn collect_expanded(node: &TreeNode) -> Vec<NodeKey> {
    fold_tree(node, &|n, child_results: Vec<Vec<NodeKey>>| {
        let mut keys: Vec<NodeKey> = child_results.into_iter().flatten().collect();
        if n.expanded {
            keys.push(n.key.clone());
        }
        keys
    })
}

/// Collapse `node` and all of its descendants.
pub fn collapse_all(node: &mut TreeNode) {
    let _ = fold_tree_mut(node, &mut |n| {
        n.expanded = false;
        ControlFlow::<()>::Continue(())
    });
}

/// A single row in the flattened view.
#[derive(Debug, Clone)]
pub struct FlatRow<'a> {
    pub node: &'a TreeNode,
    pub depth: usize,
}

/// Rows visible under `root`, in display order. The root itself is
/// not a row; its children are at depth 0.
pub fn flatten_tree(root: &TreeNode) -> Vec<FlatRow<'_>> {
    root.children
        .iter()
        .flat_map(|child| flatten_visible(child, 0))
        .collect()
}

/// A node's row plus, when it is expanded, its visible descendants.
pub fn flatten_visible(node: &TreeNode, depth: usize) -> Vec<FlatRow<'_>> {
    fold_tree_with_depth(node, depth, &|n, d, child_results| {
        let mut rows = vec![FlatRow { node: n, depth: d }];
        if n.expanded {
            for child_rows in child_results {
                rows.extend(child_rows);
            }
        }
        rows
    })
}

/// Wrapper for flattened visible rows.
#[derive(Debug)]
pub struct VisibleRows<'a> {
    rows: Vec<FlatRow<'a>>,
}

impl<'a> VisibleRows<'a> {
    pub fn new(rows: Vec<FlatRow<'a>>) -> Self {
        Self { rows }
    }

    pub fn get(&self, idx: usize) -> Option<&FlatRow<'a>> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn as_slice(&self) -> &[FlatRow<'a>] {
        &self.rows
    }

    pub fn position(&self, key: &NodeKey) -> Option<usize> {
        self.rows.iter().position(|row| row.node.key == *key)
    }

    /// Check whether a later row at the same depth exists (for tree
    /// connector rendering: `├─` vs `└─`).
    pub fn has_sibling_after(&self, idx: usize, depth: usize) -> bool {
        for row in &self.rows[idx + 1..] {
            if row.depth < depth {
                return false;
            }
            if row.depth == depth {
                return true;
            }
        }
        false
    }
}
