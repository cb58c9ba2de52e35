/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Boundary to the remote directory.
//!
//! The tree cache never talks to the wire; it consumes a
//! [`DirectoryService`]. Timeouts, binds and paging cookies are the
//! service's business.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::node::DirectoryNode;
use crate::node::Dn;

/// One page of an entry's children.
///
/// All fields are required on the wire; a body missing the paging
/// metadata fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowsePage {
    /// Children on this page, in display order.
    pub entries: Vec<DirectoryNode>,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// 0-based index of this page.
    pub current_page: u32,
}

impl BrowsePage {
    /// Reject paging metadata that cannot describe a real page.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.has_prev_page && self.current_page == 0 {
            return Err(DirectoryError::MalformedResponse(
                "first page reports a previous page".into(),
            ));
        }
        Ok(())
    }
}

/// Failures reported by a [`DirectoryService`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Transport or bind failure.
    #[error("connection failed: {0}")]
    Connectivity(String),

    /// The target entry no longer exists.
    #[error("no such entry: {0}")]
    NotFound(Dn),

    /// The bound identity may not read the target.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The service answered with something undecodable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// How the tree cache recovers a node whose fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Back to `Unexpanded`, affordance kept.
    Revert,
    /// Drop the node and its cached subtree.
    Prune,
}

impl DirectoryError {
    pub fn recovery(&self) -> Recovery {
        match self {
            DirectoryError::NotFound(_) => Recovery::Prune,
            DirectoryError::Connectivity(_)
            | DirectoryError::Permission(_)
            | DirectoryError::MalformedResponse(_) => Recovery::Revert,
        }
    }

    /// Text suitable for a status line.
    pub fn user_message(&self) -> String {
        match self {
            DirectoryError::Connectivity(msg) => {
                format!("Cannot reach the directory server: {}", msg)
            }
            DirectoryError::NotFound(dn) => format!("Entry no longer exists: {}", dn),
            DirectoryError::Permission(msg) => {
                format!("Access denied by the directory server: {}", msg)
            }
            DirectoryError::MalformedResponse(msg) => {
                format!("Unexpected response from the directory server: {}", msg)
            }
        }
    }
}

/// Remote reads consumed by the tree cache.
///
/// Every async method may be called from a background task; results
/// are applied to the cache on its owning loop.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// One page of `dn`'s immediate children.
    async fn browse(&self, dn: &Dn, page: u32, page_size: u32)
    -> Result<BrowsePage, DirectoryError>;

    /// Whether `dn` has at least one child.
    async fn check_has_children(&self, dn: &Dn) -> Result<bool, DirectoryError>;

    /// Public naming contexts advertised by the server.
    async fn naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError>;

    /// Private naming contexts advertised by the server.
    async fn private_naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError>;

    /// Display-level attributes of `dn`, or `None` if it does not
    /// exist.
    async fn entry_minimal(&self, dn: &Dn) -> Result<Option<DirectoryNode>, DirectoryError>;

    /// Forget any server-held paging state for `connection_id`.
    fn clear_paging_state(&self, connection_id: &str);
}
