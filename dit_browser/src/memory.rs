/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! An in-process [`DirectoryService`].
//!
//! Backs the TUI's demo mode and the crate's tests. Besides serving a
//! fixed tree it records every call, can hold responses behind a gate
//! until released, and can fail chosen calls on demand.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::node::DirectoryNode;
use crate::node::Dn;
use crate::node::OBJECT_CLASS;
use crate::service::BrowsePage;
use crate::service::DirectoryError;
use crate::service::DirectoryService;

/// A [`DirectoryService`] operation, for call accounting and failure
/// injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Browse,
    CheckHasChildren,
    NamingContexts,
    PrivateNamingContexts,
    EntryMinimal,
    ClearPagingState,
}

/// One recorded `browse` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseCall {
    pub dn: Dn,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug)]
struct Injected {
    op: Op,
    dn: Option<Dn>,
    error: DirectoryError,
    /// `None` fails forever.
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    entries: HashMap<Dn, DirectoryNode>,
    children: HashMap<Dn, Vec<Dn>>,
    has_children_override: HashMap<Dn, bool>,
    naming_contexts: Vec<Dn>,
    private_naming_contexts: Vec<Dn>,
    calls: HashMap<Op, usize>,
    browse_log: Vec<BrowseCall>,
    cleared_connections: Vec<String>,
    failures: Vec<Injected>,
    gate: Option<Arc<Semaphore>>,
    latency: Option<Duration>,
}

impl State {
    fn take_failure(&mut self, op: Op, dn: Option<&Dn>) -> Option<DirectoryError> {
        let idx = self
            .failures
            .iter()
            .position(|f| f.op == op && (f.dn.is_none() || f.dn.as_ref() == dn))?;
        let failure = &mut self.failures[idx];
        let error = failure.error.clone();
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.failures.remove(idx);
            }
        }
        Some(error)
    }

    fn known(&self, dn: &Dn) -> Result<(), DirectoryError> {
        if self.entries.contains_key(dn) {
            Ok(())
        } else {
            Err(DirectoryError::NotFound(dn.clone()))
        }
    }
}

/// In-memory directory tree.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `node` under `parent` (or as a detached top-level entry).
    /// Re-inserting a DN replaces its attributes and keeps its
    /// position.
    pub fn insert(&self, parent: Option<&Dn>, node: DirectoryNode) {
        let mut state = self.state();
        let dn = node.dn.clone();
        let is_new = state.entries.insert(dn.clone(), node).is_none();
        if is_new && let Some(parent) = parent {
            state.children.entry(parent.clone()).or_default().push(dn);
        }
    }

    /// Delete `dn` and everything below it.
    pub fn remove(&self, dn: &Dn) {
        let mut state = self.state();
        let mut stack = vec![dn.clone()];
        while let Some(next) = stack.pop() {
            state.entries.remove(&next);
            if let Some(kids) = state.children.remove(&next) {
                stack.extend(kids);
            }
        }
        for kids in state.children.values_mut() {
            kids.retain(|k| k != dn);
        }
    }

    /// Make `check_has_children(dn)` answer `value` regardless of the
    /// stored children.
    pub fn set_has_children(&self, dn: &Dn, value: bool) {
        self.state()
            .has_children_override
            .insert(dn.clone(), value);
    }

    pub fn add_naming_context(&self, dn: impl Into<Dn>) {
        self.state().naming_contexts.push(dn.into());
    }

    pub fn add_private_naming_context(&self, dn: impl Into<Dn>) {
        self.state().private_naming_contexts.push(dn.into());
    }

    /// Fail the next `times` calls of `op` (for `dn`, or any DN).
    pub fn fail_next(&self, op: Op, dn: Option<Dn>, error: DirectoryError, times: usize) {
        if times == 0 {
            return;
        }
        self.state().failures.push(Injected {
            op,
            dn,
            error,
            remaining: Some(times),
        });
    }

    /// Fail every call of `op` (for `dn`, or any DN) until
    /// [`Self::heal`].
    pub fn fail_always(&self, op: Op, dn: Option<Dn>, error: DirectoryError) {
        self.state().failures.push(Injected {
            op,
            dn,
            error,
            remaining: None,
        });
    }

    pub fn heal(&self) {
        self.state().failures.clear();
    }

    /// Hold every subsequent remote call until [`Self::release`] or
    /// [`Self::open`]. Calls are recorded before they block.
    pub fn hold(&self) {
        self.state().gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held calls through.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.state().gate.as_ref() {
            gate.add_permits(n);
        }
    }

    /// Remove the gate, letting every held call through.
    pub fn open(&self) {
        if let Some(gate) = self.state().gate.take() {
            gate.close();
        }
    }

    /// Delay every remote call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state().latency = latency;
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn browse_calls(&self) -> Vec<BrowseCall> {
        self.state().browse_log.clone()
    }

    pub fn cleared_connections(&self) -> Vec<String> {
        self.state().cleared_connections.clone()
    }

    fn record(&self, op: Op) {
        *self.state().calls.entry(op).or_default() += 1;
    }

    /// Gate, latency and injected failure, in that order.
    async fn enter(&self, op: Op, dn: Option<&Dn>) -> Result<(), DirectoryError> {
        let (gate, latency) = {
            let state = self.state();
            (state.gate.clone(), state.latency)
        };
        if let Some(gate) = gate {
            // A closed gate lets everyone through.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.state().take_failure(op, dn) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn browse(
        &self,
        dn: &Dn,
        page: u32,
        page_size: u32,
    ) -> Result<BrowsePage, DirectoryError> {
        self.record(Op::Browse);
        self.state().browse_log.push(BrowseCall {
            dn: dn.clone(),
            page,
            page_size,
        });
        self.enter(Op::Browse, Some(dn)).await?;

        let state = self.state();
        state.known(dn)?;
        let page_size = page_size.max(1) as usize;
        let kids = state.children.get(dn).map(Vec::as_slice).unwrap_or(&[]);
        let start = (page as usize).saturating_mul(page_size);
        let entries = kids
            .iter()
            .skip(start)
            .take(page_size)
            .filter_map(|k| state.entries.get(k).cloned())
            .collect();
        Ok(BrowsePage {
            entries,
            has_next_page: start.saturating_add(page_size) < kids.len(),
            has_prev_page: page > 0,
            current_page: page,
        })
    }

    async fn check_has_children(&self, dn: &Dn) -> Result<bool, DirectoryError> {
        self.record(Op::CheckHasChildren);
        self.enter(Op::CheckHasChildren, Some(dn)).await?;
        let state = self.state();
        state.known(dn)?;
        if let Some(value) = state.has_children_override.get(dn) {
            return Ok(*value);
        }
        Ok(state.children.get(dn).is_some_and(|k| !k.is_empty()))
    }

    async fn naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError> {
        self.record(Op::NamingContexts);
        self.enter(Op::NamingContexts, None).await?;
        Ok(self.state().naming_contexts.clone())
    }

    async fn private_naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError> {
        self.record(Op::PrivateNamingContexts);
        self.enter(Op::PrivateNamingContexts, None).await?;
        Ok(self.state().private_naming_contexts.clone())
    }

    async fn entry_minimal(&self, dn: &Dn) -> Result<Option<DirectoryNode>, DirectoryError> {
        self.record(Op::EntryMinimal);
        self.enter(Op::EntryMinimal, Some(dn)).await?;
        Ok(self.state().entries.get(dn).cloned())
    }

    fn clear_paging_state(&self, connection_id: &str) {
        self.record(Op::ClearPagingState);
        self.state()
            .cleared_connections
            .push(connection_id.to_string());
    }
}

fn entry(dn: &str, classes: &[&str]) -> DirectoryNode {
    let mut node = DirectoryNode::new(dn);
    for class in classes {
        node.add_attribute(OBJECT_CLASS, class);
    }
    node
}

/// A small corporate directory: one public naming context with a few
/// hundred people (enough to page), some groups and devices, plus a
/// private `cn=config` context.
pub fn sample_directory() -> InMemoryDirectory {
    let dir = InMemoryDirectory::new();
    let base = Dn::from("dc=example,dc=com");
    dir.insert(
        None,
        entry(base.as_str(), &["top", "domain"]).with_attribute("dc", "example"),
    );
    dir.add_naming_context(base.clone());

    let people = Dn::from("ou=people,dc=example,dc=com");
    let groups = Dn::from("ou=groups,dc=example,dc=com");
    let devices = Dn::from("ou=devices,dc=example,dc=com");
    let empty = Dn::from("ou=archive,dc=example,dc=com");
    for (dn, ou) in [
        (&people, "people"),
        (&groups, "groups"),
        (&devices, "devices"),
        (&empty, "archive"),
    ] {
        dir.insert(
            Some(&base),
            entry(dn.as_str(), &["top", "organizationalUnit"]).with_attribute("ou", ou),
        );
    }
    dir.insert(
        Some(&base),
        entry("cn=admin,dc=example,dc=com", &["top", "person"]).with_attribute("cn", "admin"),
    );

    for i in 0..250 {
        let uid = format!("user{:03}", i);
        dir.insert(
            Some(&people),
            entry(
                &format!("uid={},ou=people,dc=example,dc=com", uid),
                &["top", "person", "inetOrgPerson"],
            )
            .with_attribute("uid", &uid)
            .with_attribute("cn", &format!("User {}", i))
            .with_attribute("mail", &format!("{}@example.com", uid)),
        );
    }

    for name in ["admins", "developers", "operators"] {
        let dn = format!("cn={},ou=groups,dc=example,dc=com", name);
        dir.insert(
            Some(&groups),
            entry(&dn, &["top", "groupOfNames"])
                .with_attribute("cn", name)
                .with_attribute("member", "uid=user000,ou=people,dc=example,dc=com"),
        );
    }

    for (name, class) in [("lobby-printer", "printer"), ("build-01", "device")] {
        dir.insert(
            Some(&devices),
            entry(&format!("cn={},ou=devices,dc=example,dc=com", name), &["top", class])
                .with_attribute("cn", name),
        );
    }

    let config = Dn::from("cn=config");
    dir.insert(
        None,
        entry(config.as_str(), &["olcGlobal"]).with_attribute("cn", "config"),
    );
    dir.insert(
        Some(&config),
        entry("cn=schema,cn=config", &["olcSchemaConfig"]).with_attribute("cn", "schema"),
    );
    dir.add_private_naming_context(config);
    dir
}
