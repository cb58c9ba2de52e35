/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::collections::HashMap;

use crate::synthetic::NodeKey;

/// Current page per paginated parent.
///
/// An entry exists only while the parent's cached children are the
/// page it names. Callers drop entries together with the children
/// they index.
#[derive(Debug, Default)]
pub struct PageCursorStore {
    pages: HashMap<NodeKey, u32>,
}

impl PageCursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The 0-based page currently materialized under `parent`.
    pub fn get(&self, parent: &NodeKey) -> Option<u32> {
        self.pages.get(parent).copied()
    }

    pub fn set(&mut self, parent: NodeKey, page: u32) {
        self.pages.insert(parent, page);
    }

    pub fn remove(&mut self, parent: &NodeKey) -> Option<u32> {
        self.pages.remove(parent)
    }

    /// Drop the cursors of every key in `keys`.
    pub fn forget<'a>(&mut self, keys: impl IntoIterator<Item = &'a NodeKey>) {
        for key in keys {
            self.pages.remove(key);
        }
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
