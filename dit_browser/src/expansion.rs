/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Fetch dispatch and completion application.
//!
//! The controller is the single writer of the [`TreeCache`] and the
//! [`PageCursorStore`]. Remote calls run on spawned tasks; each task
//! reports back through an unbounded channel as a [`Completion`] and
//! the owning loop feeds it to [`ExpansionController::apply`], which
//! is the only place fetch results touch the cache.
//!
//! Every dispatch is stamped with a ticket and the cache epoch. A
//! completion is applied only if both still match, so responses that
//! raced with [`ExpansionController::clear`], a newer fetch of the same
//! node, or the node being dropped are discarded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::cache::LoadState;
use crate::cache::TreeCache;
use crate::classify::classify_node;
use crate::config::BrowserConfig;
use crate::cursor::PageCursorStore;
use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::service::BrowsePage;
use crate::service::DirectoryError;
use crate::service::DirectoryService;
use crate::service::Recovery;
use crate::synthetic::NodeKey;
use crate::synthetic::SyntheticNodeFactory;
use crate::synthetic::TreeItem;
use crate::tree::TreeNode;
use crate::tree::VisibleRows;
use crate::tree::collapse_all;

/// Children fetch outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildFetch {
    /// The service reported that the node has no children; no browse
    /// was issued.
    NoChildren,
    Page(BrowsePage),
}

/// The result a background fetch hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Children(Result<ChildFetch, DirectoryError>),
    NamingContexts(Result<Vec<DirectoryNode>, DirectoryError>),
    Roots(Result<BrowsePage, DirectoryError>),
}

/// A finished fetch, waiting to be applied.
#[derive(Debug)]
pub struct Completion {
    pub key: NodeKey,
    ticket: u64,
    epoch: u64,
    pub fetched: Fetched,
}

/// What applying a completion did to the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    Loaded {
        key: NodeKey,
        count: usize,
        page: u32,
        has_prev: bool,
        has_next: bool,
    },
    Empty {
        key: NodeKey,
    },
    /// Reverted to `Unexpanded`.
    Failed {
        key: NodeKey,
        error: DirectoryError,
    },
    /// Removed with its subtree.
    Pruned {
        key: NodeKey,
        error: DirectoryError,
    },
    NamingContextsLoaded {
        count: usize,
    },
    RootsLoaded {
        count: usize,
        more_available: bool,
    },
    /// The completion was stale and nothing changed.
    Discarded {
        key: NodeKey,
    },
}

/// Result of [`ExpansionController::expand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// A fetch was started.
    Dispatched,
    /// Children were already cached; the node is now shown expanded.
    Shown,
    /// Nothing to do (already loading, known empty, synthetic or
    /// unknown).
    Ignored,
}

/// Result of [`ExpansionController::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A real entry; forwarded to selection subscribers.
    Entry(Dn),
    /// A page control; a page fetch was started.
    Paging,
    /// The node was expanded instead of selected.
    Expanding,
    Ignored,
}

async fn fetch_children(
    service: Arc<dyn DirectoryService>,
    dn: Dn,
    page: u32,
    page_size: u32,
    check: bool,
) -> Result<ChildFetch, DirectoryError> {
    if check && !service.check_has_children(&dn).await? {
        return Ok(ChildFetch::NoChildren);
    }
    let page = service.browse(&dn, page, page_size).await?;
    Ok(ChildFetch::Page(page))
}

pub struct ExpansionController {
    cache: TreeCache,
    cursors: PageCursorStore,
    factory: SyntheticNodeFactory,
    service: Arc<dyn DirectoryService>,
    config: BrowserConfig,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    /// Outstanding ticket per loading node.
    pending: HashMap<NodeKey, u64>,
    next_ticket: u64,
    /// Dispatched fetches whose completion has not been received,
    /// stale ones included.
    in_flight: usize,
    selection: watch::Sender<Option<DirectoryNode>>,
}

impl ExpansionController {
    pub fn new(service: Arc<dyn DirectoryService>, config: BrowserConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (selection, _) = watch::channel(None);
        Self {
            cache: TreeCache::new(),
            cursors: PageCursorStore::new(),
            factory: SyntheticNodeFactory::new(),
            service,
            config,
            tx,
            rx,
            pending: HashMap::new(),
            next_ticket: 0,
            in_flight: 0,
            selection,
        }
    }

    pub fn cache(&self) -> &TreeCache {
        &self.cache
    }

    pub fn cursors(&self) -> &PageCursorStore {
        &self.cursors
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub(crate) fn service(&self) -> Arc<dyn DirectoryService> {
        Arc::clone(&self.service)
    }

    pub fn visible_rows(&self) -> VisibleRows<'_> {
        self.cache.visible_rows()
    }

    /// Whether `key` has a fetch in flight.
    pub fn is_loading(&self, key: &NodeKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of dispatched fetches not yet received.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Selected real entries. Synthetic rows are never published.
    pub fn subscribe(&self) -> watch::Receiver<Option<DirectoryNode>> {
        self.selection.subscribe()
    }

    pub fn selected(&self) -> Option<DirectoryNode> {
        self.selection.borrow().clone()
    }

    /// Mark `key` loading and run `fetch` in the background.
    pub(crate) fn dispatch<F>(&mut self, key: NodeKey, fetch: F)
    where
        F: Future<Output = Fetched> + Send + 'static,
    {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let epoch = self.cache.epoch();
        self.pending.insert(key.clone(), ticket);
        self.cache.set_state(key.clone(), LoadState::Loading);
        self.in_flight += 1;
        tracing::debug!(key = %key, ticket, epoch, "dispatching fetch");

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let fetched = fetch.await;
            // The receiver lives as long as the controller; a send
            // can only fail after it is gone.
            let _ = tx.send(Completion {
                key,
                ticket,
                epoch,
                fetched,
            });
        });
    }

    fn dispatch_children(&mut self, key: NodeKey, dn: Dn, page: u32, check: bool) {
        let service = self.service();
        let page_size = self.config.page_size;
        self.dispatch(key, async move {
            Fetched::Children(fetch_children(service, dn, page, page_size, check).await)
        });
    }

    /// Expand an entry, fetching its children on first expansion.
    ///
    /// A node that is already loading is left alone, so at most one
    /// fetch per node is ever in flight.
    pub fn expand(&mut self, key: &NodeKey) -> ExpandOutcome {
        let NodeKey::Entry(dn) = key else {
            return ExpandOutcome::Ignored;
        };
        if !self.cache.contains(key) {
            return ExpandOutcome::Ignored;
        }
        match self.cache.state(key) {
            LoadState::Loading | LoadState::Empty => ExpandOutcome::Ignored,
            LoadState::Loaded => {
                self.set_expanded(key, true);
                ExpandOutcome::Shown
            }
            LoadState::Unexpanded => {
                self.set_expanded(key, true);
                let page = self.cursors.get(key).unwrap_or(0);
                self.dispatch_children(key.clone(), dn.clone(), page, true);
                ExpandOutcome::Dispatched
            }
        }
    }

    /// Hide `key`'s children. Cached children are kept.
    pub fn collapse(&mut self, key: &NodeKey) -> bool {
        self.set_expanded(key, false)
    }

    pub fn collapse_all(&mut self) {
        self.cache.collapse_all();
    }

    pub(crate) fn set_expanded(&mut self, key: &NodeKey, expanded: bool) -> bool {
        match self.cache.get_mut(key) {
            Some(node) => {
                node.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Re-fetch the current page of a loaded (or empty) entry.
    pub fn reload_children(&mut self, key: &NodeKey) -> ExpandOutcome {
        let NodeKey::Entry(dn) = key else {
            return ExpandOutcome::Ignored;
        };
        if !self.cache.contains(key) || self.cache.state(key) == LoadState::Loading {
            return ExpandOutcome::Ignored;
        }
        self.set_expanded(key, true);
        let page = self.cursors.get(key).unwrap_or(0);
        self.dispatch_children(key.clone(), dn.clone(), page, true);
        ExpandOutcome::Dispatched
    }

    /// Move the parent of a page control to the adjacent page.
    ///
    /// Info rows and controls whose parent is already loading are
    /// ignored. The cursor moves when the new page arrives.
    pub fn activate_pagination(&mut self, key: &NodeKey) -> bool {
        let Some(node) = self.cache.get(key) else {
            return false;
        };
        let item = node.item.clone();
        let Some(parent) = self.cache.parent_key(key) else {
            return false;
        };
        let NodeKey::Entry(dn) = &parent else {
            return false;
        };
        if self.cache.state(&parent) == LoadState::Loading {
            return false;
        }
        let current = |page: u32| self.cursors.get(&parent).unwrap_or(page);
        let target = match item {
            TreeItem::PaginationPrev { page } => match current(page).checked_sub(1) {
                Some(target) => target,
                None => return false,
            },
            TreeItem::PaginationNext { page } => current(page).saturating_add(1),
            _ => return false,
        };
        let dn = dn.clone();
        self.dispatch_children(parent, dn, target, false);
        self.selection.send_replace(None);
        true
    }

    /// Route a selection: real entries are published, page controls
    /// page, everything else is swallowed.
    pub fn select(&mut self, key: &NodeKey) -> Selection {
        let Some(item) = self.cache.get(key).map(|node| node.item.clone()) else {
            return Selection::Ignored;
        };
        match item {
            TreeItem::Entry(entry) => {
                let dn = entry.dn.clone();
                self.selection.send_replace(Some(entry));
                Selection::Entry(dn)
            }
            item if item.is_page_control() => {
                if self.activate_pagination(key) {
                    Selection::Paging
                } else {
                    Selection::Ignored
                }
            }
            _ => Selection::Ignored,
        }
    }

    /// Replace a cached entry's attributes without touching its
    /// children or load state.
    pub fn refresh_entry(&mut self, entry: DirectoryNode) -> bool {
        let key = NodeKey::Entry(entry.dn.clone());
        let Some(node) = self.cache.get_mut(&key) else {
            return false;
        };
        let keep_hint = node.item.as_entry().is_some_and(|e| e.has_children_hint);
        let mut entry = entry;
        entry.has_children_hint |= keep_hint;
        node.item = TreeItem::Entry(entry.clone());
        if self
            .selection
            .borrow()
            .as_ref()
            .is_some_and(|selected| selected.dn == entry.dn)
        {
            self.selection.send_replace(Some(entry));
        }
        true
    }

    /// Drop everything: cache, cursors, outstanding tickets, server
    /// paging state and the current selection.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.cursors.clear();
        self.pending.clear();
        self.selection.send_replace(None);
        self.service.clear_paging_state(&self.config.connection_id);
        tracing::debug!(epoch = self.cache.epoch(), "cache cleared");
    }

    pub(crate) fn replace_children(&mut self, parent: &NodeKey, children: Vec<TreeNode>) -> bool {
        match self.cache.replace_children(parent, children) {
            Some(dropped) => {
                self.forget(&dropped);
                true
            }
            None => false,
        }
    }

    fn forget(&mut self, dropped: &[NodeKey]) {
        self.cursors.forget(dropped);
        for key in dropped {
            self.pending.remove(key);
        }
    }

    /// Tree nodes for freshly fetched entries. Expandable entries get
    /// a placeholder child so they render an affordance.
    pub(crate) fn child_nodes(
        &mut self,
        entries: Vec<DirectoryNode>,
        force_hint: bool,
    ) -> Vec<TreeNode> {
        entries
            .into_iter()
            .map(|mut entry| {
                entry.has_children_hint |= force_hint || classify_node(&entry).is_eligible();
                let hint = entry.has_children_hint;
                let mut node = TreeNode::entry(entry);
                if hint {
                    node.children.push(self.factory.placeholder());
                }
                node
            })
            .collect()
    }

    /// Wait for the next finished fetch.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let completion = self.rx.recv().await;
        if completion.is_some() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        completion
    }

    /// Receive and apply completions until no fetch is in flight.
    pub async fn settle(&mut self) -> Vec<TreeEvent> {
        let mut events = Vec::new();
        while self.in_flight > 0 {
            match self.next_completion().await {
                Some(completion) => events.push(self.apply(completion)),
                None => break,
            }
        }
        events
    }

    /// Apply a finished fetch to the cache.
    ///
    /// Whatever the outcome, the node is no longer loading afterwards.
    pub fn apply(&mut self, completion: Completion) -> TreeEvent {
        let Completion {
            key,
            ticket,
            epoch,
            fetched,
        } = completion;
        let current = epoch == self.cache.epoch() && self.pending.get(&key) == Some(&ticket);
        if !current || !self.cache.contains(&key) {
            tracing::warn!(key = %key, ticket, epoch, "discarding stale completion");
            return TreeEvent::Discarded { key };
        }
        self.pending.remove(&key);

        match fetched {
            Fetched::Children(Ok(ChildFetch::Page(page))) if !page.entries.is_empty() => {
                match page.validate() {
                    Ok(()) => self.apply_page(key, page),
                    Err(error) => self.apply_error(key, error),
                }
            }
            Fetched::Children(Ok(_)) => self.apply_empty(key),
            Fetched::Roots(Ok(page)) => match page.validate() {
                Ok(()) => self.apply_roots(page),
                Err(error) => self.apply_error(key, error),
            },
            Fetched::NamingContexts(Ok(contexts)) => self.apply_naming_contexts(key, contexts),
            Fetched::Children(Err(error))
            | Fetched::Roots(Err(error))
            | Fetched::NamingContexts(Err(error)) => self.apply_error(key, error),
        }
    }

    fn apply_page(&mut self, key: NodeKey, page: BrowsePage) -> TreeEvent {
        let BrowsePage {
            entries,
            has_next_page,
            has_prev_page,
            current_page,
        } = page;
        let count = entries.len();

        if let Some(node) = self.cache.get_mut(&key) {
            for child in &mut node.children {
                collapse_all(child);
            }
            if let TreeItem::Entry(entry) = &mut node.item {
                entry.has_children_hint = true;
            }
        }
        let mut children = self.child_nodes(entries, false);
        children.extend(
            self.factory
                .pagination(current_page, has_prev_page, has_next_page),
        );
        self.replace_children(&key, children);

        if has_prev_page || has_next_page {
            self.cursors.set(key.clone(), current_page);
        } else {
            self.cursors.remove(&key);
        }
        self.cache.set_state(key.clone(), LoadState::Loaded);
        tracing::info!(
            key = %key,
            count,
            page = current_page,
            has_prev_page,
            has_next_page,
            "children loaded"
        );
        TreeEvent::Loaded {
            key,
            count,
            page: current_page,
            has_prev: has_prev_page,
            has_next: has_next_page,
        }
    }

    fn apply_empty(&mut self, key: NodeKey) -> TreeEvent {
        self.replace_children(&key, Vec::new());
        self.cursors.remove(&key);
        if let Some(node) = self.cache.get_mut(&key) {
            node.expanded = false;
            if let TreeItem::Entry(entry) = &mut node.item {
                entry.has_children_hint = false;
            }
        }
        self.cache.set_state(key.clone(), LoadState::Empty);
        tracing::info!(key = %key, "no children");
        TreeEvent::Empty { key }
    }

    fn apply_roots(&mut self, page: BrowsePage) -> TreeEvent {
        let count = page.entries.len();
        let more_available = page.has_next_page;
        let children = self.child_nodes(page.entries, false);
        self.replace_children(&NodeKey::Forest, children);
        self.cache.set_state(NodeKey::Forest, LoadState::Loaded);
        tracing::info!(count, more_available, "top-level entries loaded");
        TreeEvent::RootsLoaded {
            count,
            more_available,
        }
    }

    fn apply_naming_contexts(&mut self, key: NodeKey, contexts: Vec<DirectoryNode>) -> TreeEvent {
        let count = contexts.len();
        let children = self.child_nodes(contexts, true);
        self.replace_children(&key, children);
        self.cache.set_state(key, LoadState::Loaded);
        tracing::info!(count, "naming contexts loaded");
        TreeEvent::NamingContextsLoaded { count }
    }

    fn apply_error(&mut self, key: NodeKey, error: DirectoryError) -> TreeEvent {
        match &error {
            DirectoryError::MalformedResponse(_) => {
                tracing::warn!(key = %key, error = %error, "fetch failed")
            }
            _ => tracing::info!(key = %key, error = %error, "fetch failed"),
        }

        if error.recovery() == Recovery::Prune
            && let Some(dropped) = self.cache.remove_subtree(&key)
        {
            self.forget(&dropped);
            return TreeEvent::Pruned { key, error };
        }

        // Only a node that showed an affordance before the fetch gets
        // its placeholder back.
        let had_affordance = key != NodeKey::Forest
            && self
                .cache
                .get(&key)
                .is_some_and(|node| node.has_affordance());
        self.cursors.remove(&key);
        let children = if had_affordance {
            vec![self.factory.placeholder()]
        } else {
            Vec::new()
        };
        self.replace_children(&key, children);
        self.set_expanded(&key, false);
        self.cache.set_state(key.clone(), LoadState::Unexpanded);
        TreeEvent::Failed { key, error }
    }
}
