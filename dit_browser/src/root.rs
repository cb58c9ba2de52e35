/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The hosting surface: top-level loading, the Root DSE and reloads.
//!
//! [`RootController`] wraps an [`ExpansionController`] and adds the
//! two ways a tree is seeded:
//!
//! - [`RootController::load_roots`] lists a base entry's children as
//!   the top-level rows.
//! - [`RootController::load_root_with_naming_contexts`] shows a single
//!   "Root DSE" row whose children are the server's naming contexts.
//!
//! Both start with the reload policy: collapse everything, clear the
//! cache, cursors and server paging state, then fetch. The root is
//! left collapsed; expanding it is up to the user.

use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::LoadState;
use crate::cache::TreeCache;
use crate::config::BrowserConfig;
use crate::cursor::PageCursorStore;
use crate::expansion::Completion;
use crate::expansion::ExpandOutcome;
use crate::expansion::ExpansionController;
use crate::expansion::Fetched;
use crate::expansion::Selection;
use crate::expansion::TreeEvent;
use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::node::OBJECT_CLASS;
use crate::service::DirectoryError;
use crate::service::DirectoryService;
use crate::synthetic::NodeKey;
use crate::tree::TreeNode;
use crate::tree::VisibleRows;

/// How the tree was last seeded; [`RootController::reload`] repeats it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootMode {
    Base(Dn),
    NamingContexts { include_private: bool },
}

/// Type tag given to naming contexts whose metadata could not be read.
pub const STUB_OBJECT_CLASS: &str = "organizationalUnit";

/// Stand-in for a naming context whose entry could not be read, so
/// the tree stays navigable.
pub fn stub_naming_context(dn: Dn) -> DirectoryNode {
    DirectoryNode::new(dn)
        .with_attribute(OBJECT_CLASS, STUB_OBJECT_CLASS)
        .with_children_hint(true)
}

async fn fetch_naming_contexts(
    service: Arc<dyn DirectoryService>,
    include_private: bool,
) -> Result<Vec<DirectoryNode>, DirectoryError> {
    let mut dns = service.naming_contexts().await?;
    if include_private {
        dns.extend(service.private_naming_contexts().await?);
    }
    let mut contexts = Vec::with_capacity(dns.len());
    for dn in dns {
        match service.entry_minimal(&dn).await {
            Ok(Some(entry)) => contexts.push(entry),
            Ok(None) => tracing::info!(dn = %dn, "naming context does not exist, skipping"),
            Err(e) => {
                tracing::warn!(dn = %dn, error = %e, "cannot read naming context, using stub");
                contexts.push(stub_naming_context(dn));
            }
        }
    }
    Ok(contexts)
}

pub struct RootController {
    expansion: ExpansionController,
    mode: Option<RootMode>,
}

impl RootController {
    pub fn new(service: Arc<dyn DirectoryService>, config: BrowserConfig) -> Self {
        Self {
            expansion: ExpansionController::new(service, config),
            mode: None,
        }
    }

    pub fn cache(&self) -> &TreeCache {
        self.expansion.cache()
    }

    pub fn cursors(&self) -> &PageCursorStore {
        self.expansion.cursors()
    }

    pub fn config(&self) -> &BrowserConfig {
        self.expansion.config()
    }

    pub fn mode(&self) -> Option<&RootMode> {
        self.mode.as_ref()
    }

    pub fn visible_rows(&self) -> VisibleRows<'_> {
        self.expansion.visible_rows()
    }

    pub fn is_loading(&self, key: &NodeKey) -> bool {
        self.expansion.is_loading(key)
    }

    pub fn in_flight(&self) -> usize {
        self.expansion.in_flight()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DirectoryNode>> {
        self.expansion.subscribe()
    }

    pub fn selected(&self) -> Option<DirectoryNode> {
        self.expansion.selected()
    }

    /// Collapse, then clear cache, cursors and server paging state.
    fn reset(&mut self) {
        self.expansion.collapse_all();
        self.expansion.clear();
    }

    /// Seed the tree with the children of `base`.
    ///
    /// Only the first page is shown; [`TreeEvent::RootsLoaded`]
    /// reports whether more exist.
    pub fn load_roots(&mut self, base: Dn) {
        self.reset();
        self.mode = Some(RootMode::Base(base.clone()));
        let service = self.expansion.service();
        let page_size = self.expansion.config().page_size;
        self.expansion.dispatch(NodeKey::Forest, async move {
            Fetched::Roots(service.browse(&base, 0, page_size).await)
        });
    }

    /// Seed the tree with a collapsed Root DSE row and fetch its
    /// naming contexts (plus private ones if `include_private`).
    pub fn load_root_with_naming_contexts(&mut self, include_private: bool) {
        self.reset();
        self.mode = Some(RootMode::NamingContexts { include_private });
        self.expansion
            .replace_children(&NodeKey::Forest, vec![TreeNode::root_dse()]);
        self.dispatch_naming_contexts(include_private);
    }

    fn include_private(&self) -> bool {
        match &self.mode {
            Some(RootMode::NamingContexts { include_private }) => *include_private,
            _ => self.config().include_private_naming_contexts,
        }
    }

    fn dispatch_naming_contexts(&mut self, include_private: bool) {
        let service = self.expansion.service();
        self.expansion.dispatch(NodeKey::RootDse, async move {
            Fetched::NamingContexts(fetch_naming_contexts(service, include_private).await)
        });
    }

    /// Repeat the last load. Returns false if nothing was loaded yet.
    pub fn reload(&mut self) -> bool {
        match self.mode.clone() {
            Some(RootMode::Base(base)) => self.load_roots(base),
            Some(RootMode::NamingContexts { include_private }) => {
                self.load_root_with_naming_contexts(include_private)
            }
            None => return false,
        }
        true
    }

    /// Drop every cached node, cursor and outstanding fetch.
    pub fn clear(&mut self) {
        self.expansion.clear();
    }

    pub fn expand(&mut self, key: &NodeKey) -> ExpandOutcome {
        if *key != NodeKey::RootDse {
            return self.expansion.expand(key);
        }
        if !self.cache().contains(key) {
            return ExpandOutcome::Ignored;
        }
        match self.cache().state(key) {
            LoadState::Loading | LoadState::Empty => ExpandOutcome::Ignored,
            LoadState::Loaded => {
                self.expansion.set_expanded(key, true);
                ExpandOutcome::Shown
            }
            LoadState::Unexpanded => {
                self.expansion.set_expanded(key, true);
                self.dispatch_naming_contexts(self.include_private());
                ExpandOutcome::Dispatched
            }
        }
    }

    pub fn collapse(&mut self, key: &NodeKey) -> bool {
        self.expansion.collapse(key)
    }

    /// Expand if collapsed, collapse if expanded.
    pub fn toggle(&mut self, key: &NodeKey) -> ExpandOutcome {
        let expanded = self.cache().get(key).is_some_and(|n| n.expanded);
        if expanded {
            self.collapse(key);
            ExpandOutcome::Shown
        } else {
            self.expand(key)
        }
    }

    pub fn collapse_all(&mut self) {
        self.expansion.collapse_all();
    }

    pub fn reload_children(&mut self, key: &NodeKey) -> ExpandOutcome {
        if *key == NodeKey::RootDse {
            if !self.cache().contains(key) || self.cache().state(key) == LoadState::Loading {
                return ExpandOutcome::Ignored;
            }
            self.expansion.set_expanded(key, true);
            self.dispatch_naming_contexts(self.include_private());
            return ExpandOutcome::Dispatched;
        }
        self.expansion.reload_children(key)
    }

    pub fn activate_pagination(&mut self, key: &NodeKey) -> bool {
        self.expansion.activate_pagination(key)
    }

    /// Selecting the Root DSE expands it; see
    /// [`ExpansionController::select`] for everything else.
    pub fn select(&mut self, key: &NodeKey) -> Selection {
        if *key == NodeKey::RootDse {
            return match self.expand(key) {
                ExpandOutcome::Ignored => Selection::Ignored,
                _ => Selection::Expanding,
            };
        }
        self.expansion.select(key)
    }

    pub fn refresh_entry(&mut self, entry: DirectoryNode) -> bool {
        self.expansion.refresh_entry(entry)
    }

    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.expansion.next_completion().await
    }

    pub fn apply(&mut self, completion: Completion) -> TreeEvent {
        self.expansion.apply(completion)
    }

    pub async fn settle(&mut self) -> Vec<TreeEvent> {
        self.expansion.settle().await
    }
}
