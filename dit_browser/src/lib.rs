/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! A lazy-loading, paginated tree cache for browsing a remote
//! directory information tree.
//!
//! The remote tree is far too large to materialize. The cache holds
//! only what the user has opened: children are fetched when a node is
//! first expanded, large child sets are shown one page at a time
//! behind synthetic "previous/next page" rows, and the namespace root
//! (Root DSE) lists the server's naming contexts instead of ordinary
//! children.
//!
//! Layering, leaf first:
//!
//! - [`service::DirectoryService`]: the remote reads the cache consumes.
//! - [`classify`]: whether an entry should offer an expand affordance.
//! - [`synthetic`]: node identities and placeholder/pagination rows.
//! - [`cursor`]: current page per paginated parent.
//! - [`cache`]: the cached forest and each node's load state.
//! - [`expansion`]: fetch dispatch and completion application.
//! - [`root`]: top-level seeding, the Root DSE, reloads.

pub mod cache;
pub mod classify;
pub mod config;
pub mod cursor;
pub mod expansion;
pub mod memory;
pub mod node;
pub mod root;
pub mod service;
pub mod synthetic;
pub mod tree;

pub use cache::LoadState;
pub use cache::TreeCache;
pub use config::BrowserConfig;
pub use expansion::ExpandOutcome;
pub use expansion::ExpansionController;
pub use expansion::Selection;
pub use expansion::TreeEvent;
pub use node::DirectoryNode;
pub use node::Dn;
pub use root::RootController;
pub use root::RootMode;
pub use service::BrowsePage;
pub use service::DirectoryError;
pub use service::DirectoryService;
pub use synthetic::NodeKey;
pub use synthetic::NodeKind;

#[cfg(test)]
mod tests;
