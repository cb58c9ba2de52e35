/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! `reqwest`-backed [`DirectoryService`] for the directory gateway.
//!
//! The gateway exposes JSON endpoints under `/v1/`:
//!
//! - `GET /v1/browse/{dn}?page=N&page_size=M` → [`BrowsePage`]
//! - `GET /v1/has_children/{dn}` → `{"has_children": bool}`
//! - `GET /v1/naming_contexts` and `GET /v1/private_naming_contexts`
//!   → `["dc=example,dc=com", ...]`
//! - `GET /v1/entry/{dn}` → [`DirectoryNode`] (404 when absent)
//! - `POST /v1/paging/clear/{connection_id}`
//!
//! Browses issued after a paging-state clear wait for the clear POST
//! to finish, so the gateway never drops paging state set up by the
//! re-fetch that follows a reload.
//!
//! Address handling: `--addr` may be `host:port` (plain HTTP) or an
//! explicit `http://...` / `https://...` URL, whose scheme is honored.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use dit_browser::BrowsePage;
use dit_browser::DirectoryError;
use dit_browser::DirectoryNode;
use dit_browser::DirectoryService;
use dit_browser::Dn;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type PendingClear = Shared<BoxFuture<'static, ()>>;

/// Split an address into an optional `http`/`https` scheme and the
/// remaining host part.
pub(crate) fn parse_addr(addr: &str) -> (Option<&str>, &str) {
    if let Some(host) = addr.strip_prefix("https://") {
        (Some("https"), host)
    } else if let Some(host) = addr.strip_prefix("http://") {
        (Some("http"), host)
    } else {
        (None, addr)
    }
}

/// Base URL for `addr`, defaulting to plain HTTP. A trailing `/` is
/// dropped so endpoint paths can be appended directly.
pub(crate) fn base_url(addr: &str) -> String {
    let (scheme, host) = parse_addr(addr);
    format!("{}://{}", scheme.unwrap_or("http"), host.trim_end_matches('/'))
}

/// Map a non-success HTTP status to the error taxonomy. `dn` names
/// the entry the request was about, if any.
pub(crate) fn status_error(status: StatusCode, dn: Option<&Dn>) -> DirectoryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DirectoryError::Permission(format!("HTTP {}", status))
        }
        StatusCode::NOT_FOUND => match dn {
            Some(dn) => DirectoryError::NotFound(dn.clone()),
            None => DirectoryError::MalformedResponse(format!("HTTP {}", status)),
        },
        _ => DirectoryError::Connectivity(format!("HTTP {}", status)),
    }
}

fn transport_error(err: reqwest::Error) -> DirectoryError {
    if err.is_decode() {
        DirectoryError::MalformedResponse(err.to_string())
    } else {
        DirectoryError::Connectivity(err.to_string())
    }
}

#[derive(Deserialize)]
struct HasChildren {
    has_children: bool,
}

/// Directory gateway client.
#[derive(Clone)]
pub(crate) struct HttpDirectory {
    base_url: String,
    client: reqwest::Client,
    /// Most recent paging-state clear. Browses wait on it.
    pending_clear: Arc<Mutex<Option<PendingClear>>>,
}

impl HttpDirectory {
    /// Client for the gateway at `addr`.
    pub(crate) fn connect(addr: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url(addr),
            client,
            pending_clear: Arc::new(Mutex::new(None)),
        })
    }

    /// Record `clear` as the clear that later browses must wait for.
    pub(crate) fn track_clear(&self, clear: BoxFuture<'static, ()>) {
        *self
            .pending_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(clear.shared());
    }

    /// Resolve once the most recent paging-state clear has finished.
    pub(crate) async fn wait_for_clear(&self) {
        let pending = self
            .pending_clear
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(pending) = pending {
            pending.await;
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    fn entry_url(&self, endpoint: &str, dn: &Dn) -> String {
        format!(
            "{}/v1/{}/{}",
            self.base_url,
            endpoint,
            urlencoding::encode(dn.as_str())
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        dn: Option<&Dn>,
    ) -> Result<T, DirectoryError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status(), dn));
        }
        resp.json::<T>().await.map_err(transport_error)
    }

    async fn contexts(&self, endpoint: &str) -> Result<Vec<Dn>, DirectoryError> {
        let url = format!("{}/v1/{}", self.base_url, endpoint);
        let dns: Vec<String> = self.get_json(&url, None).await?;
        Ok(dns.into_iter().map(Dn::from).collect())
    }
}

#[async_trait]
impl DirectoryService for HttpDirectory {
    async fn browse(
        &self,
        dn: &Dn,
        page: u32,
        page_size: u32,
    ) -> Result<BrowsePage, DirectoryError> {
        let url = format!(
            "{}?page={}&page_size={}",
            self.entry_url("browse", dn),
            page,
            page_size
        );
        self.wait_for_clear().await;
        self.get_json(&url, Some(dn)).await
    }

    async fn check_has_children(&self, dn: &Dn) -> Result<bool, DirectoryError> {
        let url = self.entry_url("has_children", dn);
        let body: HasChildren = self.get_json(&url, Some(dn)).await?;
        Ok(body.has_children)
    }

    async fn naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError> {
        self.contexts("naming_contexts").await
    }

    async fn private_naming_contexts(&self) -> Result<Vec<Dn>, DirectoryError> {
        self.contexts("private_naming_contexts").await
    }

    async fn entry_minimal(&self, dn: &Dn) -> Result<Option<DirectoryNode>, DirectoryError> {
        match self.get_json(&self.entry_url("entry", dn), Some(dn)).await {
            Ok(node) => Ok(Some(node)),
            Err(DirectoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The POST runs on the ambient runtime and its outcome is only
    /// logged. Browses issued afterwards wait for it to finish.
    fn clear_paging_state(&self, connection_id: &str) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(connection_id, "no runtime; paging state not cleared");
            return;
        };
        let url = format!(
            "{}/v1/paging/clear/{}",
            self.base_url,
            urlencoding::encode(connection_id)
        );
        let client = self.client.clone();
        let task = handle.spawn(async move {
            match client.post(&url).send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => tracing::warn!(status = %resp.status(), "clearing paging state failed"),
                Err(e) => tracing::warn!(error = %e, "clearing paging state failed"),
            }
        });
        self.track_clear(
            async move {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "paging state clear task failed");
                }
            }
            .boxed(),
        );
    }
}
