// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Controller client: status polling with protocol fallback, and controls.
//!
//! [`ApexClient`] owns everything that must survive between two polls: the
//! REST session, the rate-limit back-off and the configuration cache. All
//! operations take `&mut self`, so one client serves one poll loop.
//!
//! # Status fallback
//!
//! Each [`fetch_status`](ApexClient::fetch_status) tries, in order:
//!
//! 1. REST `/rest/status` (only with a password, and not while rate limited)
//! 2. `/cgi-bin/status.json`
//! 3. `/cgi-bin/status.xml` (or the configured XML path)
//!
//! REST failures are never reported on their own. Rejected credentials on
//! the legacy endpoints are reported at once since XML uses the same ones.
//!
//! # Examples
//!
//! ```no_run
//! use apex_fusion_lib::ApexClient;
//!
//! # async fn example() -> apex_fusion_lib::Result<()> {
//! let mut client = ApexClient::builder("192.168.1.50")
//!     .with_credentials("admin", "secret")
//!     .build()?;
//!
//! let status = client.fetch_status().await?;
//! println!("{} via {}", status.meta.hostname.unwrap_or_default(), status.meta.source);
//! # Ok(())
//! # }
//! ```

mod control;
mod rest;

use std::time::Duration;

use tokio::time::Instant;

#[cfg(feature = "http")]
use crate::protocol::HttpTransport;
use crate::config::ConfigCache;
use crate::error::{Error, ProtocolError, Result};
use crate::payload::StatusPayload;
use crate::protocol::{ControllerConfig, Request, Session, Transport, paths};
use crate::status::{ControllerStatus, DataSource};
use crate::types::FeedCycle;

/// Client for one Apex controller.
///
/// Generic over the [`Transport`] so that the polling and session logic can
/// run against any request/response carrier. With the `http` feature,
/// [`ApexClient::builder`] creates one backed by [`HttpTransport`].
#[derive(Debug)]
pub struct ApexClient<T: Transport> {
    config: ControllerConfig,
    transport: T,
    session: Session,
    cache: ConfigCache,
    trident_abaddr: Option<i64>,
    active_feed: Option<FeedCycle>,
}

#[cfg(feature = "http")]
impl ApexClient<HttpTransport> {
    /// Starts building an HTTP client for `host`.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ApexClientBuilder {
        ApexClientBuilder::new(ControllerConfig::new(host))
    }

    /// Creates an HTTP client from a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is invalid or the HTTP client cannot be
    /// created.
    pub fn new(config: ControllerConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ApexClient<T> {
    /// Creates a client that sends its requests through `transport`.
    #[must_use]
    pub fn with_transport(config: ControllerConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            session: Session::new(),
            cache: ConfigCache::new(),
            trident_abaddr: None,
            active_feed: None,
        }
    }

    /// Sets how often `/rest/config` is fetched during status polls.
    #[must_use]
    pub fn with_config_refresh_interval(mut self, interval: Duration) -> Self {
        self.cache = self.cache.with_refresh_interval(interval);
        self
    }

    /// Returns the connection settings.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the REST session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the configuration cache.
    #[must_use]
    pub fn config_cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Bus address of the Trident seen in the last fetched status.
    #[must_use]
    pub fn trident_abaddr(&self) -> Option<i64> {
        self.trident_abaddr
    }

    /// Fetches the controller status, falling back from REST to CGI-JSON to
    /// XML.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] when the legacy endpoints reject the credentials
    /// - the XML endpoint's error when every source failed
    pub async fn fetch_status(&mut self) -> Result<ControllerStatus> {
        if self.config.has_password() {
            match self.fetch_rest_status().await {
                Ok(status) => return Ok(self.finish(status)),
                Err(err) => {
                    tracing::debug!(error = %err, "REST status unavailable, trying CGI-JSON");
                }
            }
        }

        match self.fetch_legacy_status(DataSource::CgiJson, paths::CGI_STATUS_JSON).await {
            Ok(status) => return Ok(self.finish(status)),
            Err(err @ Error::Auth(_)) => return Err(err),
            Err(Error::Transport(ProtocolError::UnexpectedStatus(404))) => {
                tracing::debug!("CGI-JSON status not found, trying XML");
            }
            Err(err) => {
                tracing::debug!(error = %err, "CGI-JSON status failed, trying XML");
            }
        }

        let xml_path = self.config.status_path().to_string();
        let status = self.fetch_legacy_status(DataSource::Xml, &xml_path).await?;
        Ok(self.finish(status))
    }

    async fn fetch_rest_status(&mut self) -> Result<ControllerStatus> {
        let path = self.session.status_path().to_string();
        let response = self.rest_call(Request::get(&path), false).await?;
        let mut status = StatusPayload::parse(DataSource::Rest, &response.body)?.normalize()?;
        self.session.remember_status_path(path);

        self.cache.merge_into(&mut status);
        self.refresh_config_if_due(&mut status).await;
        Ok(status)
    }

    /// Best-effort config refresh during a poll; failures keep the cache.
    async fn refresh_config_if_due(&mut self, status: &mut ControllerStatus) {
        let now = Instant::now();
        if !self.cache.needs_refresh(now, false) {
            return;
        }
        match self.fetch_config().await {
            Ok(snapshot) => {
                self.cache.store(snapshot, now);
                self.cache.apply_to(status);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Config refresh failed, keeping cached config");
            }
        }
    }

    async fn fetch_legacy_status(
        &self,
        source: DataSource,
        path: &str,
    ) -> Result<ControllerStatus> {
        let request = Request::get(path).with_basic_auth(self.config.basic_auth());
        let response = self.transport.send(&request).await?;

        if response.is_unauthorized() {
            return Err(Error::Auth(format!(
                "{path} rejected credentials (HTTP {})",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(ProtocolError::UnexpectedStatus(response.status).into());
        }

        let mut status = StatusPayload::parse(source, &response.body)?.normalize()?;
        self.cache.merge_into(&mut status);
        Ok(status)
    }

    /// Records what later controls need and recomputes the Trident fields.
    fn finish(&mut self, mut status: ControllerStatus) -> ControllerStatus {
        status.trident.finalize();
        self.trident_abaddr = status.trident_abaddr();
        self.active_feed = status
            .feed
            .and_then(|feed| feed.id)
            .and_then(|id| u8::try_from(id).ok())
            .and_then(|id| FeedCycle::new(id).ok());

        tracing::debug!(
            source = %status.meta.source,
            probes = status.probes.len(),
            outlets = status.outlets.len(),
            "Fetched controller status"
        );
        status
    }
}

/// Builder for HTTP clients.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::ApexClient;
/// use std::time::Duration;
///
/// let client = ApexClient::builder("apex.local")
///     .with_password("secret")
///     .with_status_path("/cgi-bin/status.xml")
///     .with_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(client.config().timeout(), Duration::from_secs(5));
/// ```
#[cfg(feature = "http")]
#[derive(Debug)]
pub struct ApexClientBuilder {
    config: ControllerConfig,
    refresh_interval: Option<Duration>,
}

#[cfg(feature = "http")]
impl ApexClientBuilder {
    fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            refresh_interval: None,
        }
    }

    /// Sets username and password.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config = self.config.with_credentials(username, password);
        self
    }

    /// Sets a password only.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.config = self.config.with_password(password);
        self
    }

    /// Overrides the XML status path.
    #[must_use]
    pub fn with_status_path(mut self, path: impl AsRef<str>) -> Self {
        self.config = self.config.with_status_path(path);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Sets how often `/rest/config` is fetched during status polls.
    #[must_use]
    pub fn with_config_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Builds the client. No request is sent.
    ///
    /// # Errors
    ///
    /// Returns error if the host is invalid or the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<ApexClient<HttpTransport>> {
        let client = ApexClient::new(self.config)?;
        Ok(match self.refresh_interval {
            Some(interval) => client.with_config_refresh_interval(interval),
            None => client,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted transport for client unit tests.

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use crate::error::ProtocolError;
    use crate::protocol::{Request, Response, Transport};

    /// Replies with queued responses in order and records every request.
    #[derive(Debug, Default)]
    pub struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<Response, ProtocolError>>>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: &str) -> Self {
            self.push(Ok(Response::new(status, body)))
        }

        pub fn push(self, reply: Result<Response, ProtocolError>) -> Self {
            self.replies.lock().push_back(reply);
            self
        }

        pub fn requests(&self) -> Vec<Request> {
            self.requests.lock().clone()
        }

        pub fn paths(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.path).collect()
        }
    }

    impl Transport for ScriptedTransport {
        async fn send(&self, request: &Request) -> Result<Response, ProtocolError> {
            self.requests.lock().push(request.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(ProtocolError::ConnectionFailed("no reply scripted".into())))
        }
    }
}
