/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The partial, in-memory forest mirroring the remote tree.
//!
//! Structure lives in a [`TreeNode`] rooted at the invisible
//! [`NodeKey::Forest`]; per-node lifecycle state lives out of band in
//! a `key -> LoadState` map so the entry model stays clean.
//!
//! The cache carries an `epoch` that [`TreeCache::clear`] bumps.
//! Fetch completions remember the epoch they were issued under and
//! are discarded if it has moved on.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::node::DirectoryNode;
use crate::synthetic::NodeKey;
use crate::tree::TreeNode;
use crate::tree::VisibleRows;
use crate::tree::collapse_all;
use crate::tree::collect_keys;
use crate::tree::find_node;
use crate::tree::find_node_mut;
use crate::tree::find_parent;
use crate::tree::find_parent_mut;
use crate::tree::flatten_tree;
use crate::tree::fold_tree;

/// Lifecycle of a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Children never fetched (or the last fetch failed).
    #[default]
    Unexpanded,
    /// A fetch for the node's children is in flight.
    Loading,
    /// Children (one page of them) are cached.
    Loaded,
    /// The node is known to have no children.
    Empty,
}

/// Partial materialization of the remote hierarchy.
#[derive(Debug)]
pub struct TreeCache {
    root: TreeNode,
    states: HashMap<NodeKey, LoadState>,
    epoch: u64,
}

impl Default for TreeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeCache {
    pub fn new() -> Self {
        Self {
            root: TreeNode::forest(),
            states: HashMap::new(),
            epoch: 0,
        }
    }

    /// The invisible forest root; its children are the top-level rows.
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        find_node(&self.root, key).is_some()
    }

    pub fn get(&self, key: &NodeKey) -> Option<&TreeNode> {
        find_node(&self.root, key)
    }

    pub fn get_mut(&mut self, key: &NodeKey) -> Option<&mut TreeNode> {
        find_node_mut(&mut self.root, key)
    }

    pub fn parent_key(&self, key: &NodeKey) -> Option<NodeKey> {
        find_parent(&self.root, key).map(|p| p.key.clone())
    }

    /// Lifecycle state of `key`. Nodes without a recorded state are
    /// `Unexpanded`.
    pub fn state(&self, key: &NodeKey) -> LoadState {
        self.states.get(key).copied().unwrap_or_default()
    }

    pub fn set_state(&mut self, key: NodeKey, state: LoadState) {
        if state == LoadState::Unexpanded {
            self.states.remove(&key);
        } else {
            self.states.insert(key, state);
        }
    }

    /// Replace `parent`'s children with `children`.
    ///
    /// Returns the keys of every node dropped from the cache (old
    /// children and their descendants) so callers can drop
    /// associated bookkeeping. Duplicate keys among `children` keep
    /// their first occurrence. Returns `None` if `parent` is not
    /// cached.
    pub fn replace_children(
        &mut self,
        parent: &NodeKey,
        children: Vec<TreeNode>,
    ) -> Option<Vec<NodeKey>> {
        let node = find_node_mut(&mut self.root, parent)?;
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(children.len());
        for child in children {
            if seen.insert(child.key.clone()) {
                unique.push(child);
            } else {
                tracing::warn!(parent = %parent, key = %child.key, "dropping duplicate sibling");
            }
        }
        let old = std::mem::replace(&mut node.children, unique);
        let dropped: Vec<NodeKey> = old.iter().flat_map(collect_keys).collect();
        for key in &dropped {
            self.states.remove(key);
        }
        Some(dropped)
    }

    /// Remove every child of `parent`. See [`Self::replace_children`].
    pub fn remove_children(&mut self, parent: &NodeKey) -> Option<Vec<NodeKey>> {
        self.replace_children(parent, Vec::new())
    }

    /// Remove `key` and its subtree. Returns the dropped keys,
    /// `key` included, or `None` if `key` is not cached (or is the
    /// forest root).
    pub fn remove_subtree(&mut self, key: &NodeKey) -> Option<Vec<NodeKey>> {
        let parent = find_parent_mut(&mut self.root, key)?;
        let idx = parent.children.iter().position(|c| c.key == *key)?;
        let removed = parent.children.remove(idx);
        let dropped = collect_keys(&removed);
        for k in &dropped {
            self.states.remove(k);
        }
        Some(dropped)
    }

    /// Collapse `key` and everything below it.
    pub fn collapse_subtree(&mut self, key: &NodeKey) -> bool {
        match find_node_mut(&mut self.root, key) {
            Some(node) => {
                collapse_all(node);
                true
            }
            None => false,
        }
    }

    pub fn collapse_all(&mut self) {
        collapse_all(&mut self.root);
    }

    /// Drop every node and state, and advance the epoch.
    pub fn clear(&mut self) {
        self.root = TreeNode::forest();
        self.states.clear();
        self.epoch += 1;
    }

    /// Number of cached nodes, synthetic rows included, excluding the
    /// forest root.
    pub fn len(&self) -> usize {
        fold_tree(&self.root, &|_, counts: Vec<usize>| 1 + counts.iter().sum::<usize>()) - 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Rows currently visible (the forest root is not a row).
    pub fn visible_rows(&self) -> VisibleRows<'_> {
        VisibleRows::new(flatten_tree(&self.root))
    }

    /// Every cached real entry, pre-order.
    pub fn entries<'a>(&'a self) -> Vec<&'a DirectoryNode> {
        fold_tree(&self.root, &|n, child_results: Vec<Vec<&'a DirectoryNode>>| {
            let mut out: Vec<&'a DirectoryNode> = n.item.as_entry().into_iter().collect();
            out.extend(child_results.into_iter().flatten());
            out
        })
    }
}
