// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection settings for one controller.

use std::time::Duration;

use super::paths;
use crate::error::ProtocolError;

/// Configuration for an Apex controller.
///
/// Holds connection parameters only; session state lives in the client.
/// Without a password the client skips REST and every control operation and
/// polls the legacy endpoints only.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::protocol::ControllerConfig;
/// use std::time::Duration;
///
/// // Simple configuration
/// let config = ControllerConfig::new("192.168.1.50");
/// assert_eq!(config.base_url().unwrap(), "http://192.168.1.50");
///
/// // With all options
/// let config = ControllerConfig::new("https://apex.local/")
///     .with_credentials("admin", "secret")
///     .with_status_path("status.xml")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url().unwrap(), "https://apex.local");
/// assert_eq!(config.status_path(), "/status.xml");
/// ```
#[derive(Clone)]
pub struct ControllerConfig {
    host: String,
    username: Option<String>,
    password: Option<String>,
    status_path: String,
    timeout: Duration,
}

impl std::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("status_path", &self.status_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ControllerConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default XML status path.
    pub const DEFAULT_STATUS_PATH: &'static str = paths::CGI_STATUS_XML;
    /// Login tried after the configured username, and used for basic auth
    /// when no username is set.
    pub const DEFAULT_USERNAME: &'static str = "admin";

    /// Creates a configuration for `host`, a hostname, `host:port` or URL.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            username: None,
            password: None,
            status_path: Self::DEFAULT_STATUS_PATH.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets username and password.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets a password only; logins use [`DEFAULT_USERNAME`](Self::DEFAULT_USERNAME).
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Overrides the XML status path. A leading `/` is added when missing;
    /// a blank path keeps the default.
    #[must_use]
    pub fn with_status_path(mut self, path: impl AsRef<str>) -> Self {
        let path = path.as_ref().trim();
        self.status_path = if path.is_empty() {
            Self::DEFAULT_STATUS_PATH.to_string()
        } else {
            super::normalize_path(path)
        };
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host as configured.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the trimmed username, if one is set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Returns the password, if a non-empty one is set.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether REST and control operations are enabled.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password().is_some()
    }

    /// Returns the XML status path.
    #[must_use]
    pub fn status_path(&self) -> &str {
        &self.status_path
    }

    /// Returns the timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL: `http://` is assumed when no scheme is given and
    /// trailing slashes are removed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidAddress`] for a blank host.
    pub fn base_url(&self) -> Result<String, ProtocolError> {
        let host = self.host.trim();
        let (scheme, rest) = if let Some(rest) = host.strip_prefix("https://") {
            ("https", rest)
        } else if let Some(rest) = host.strip_prefix("http://") {
            ("http", rest)
        } else {
            ("http", host)
        };
        let rest = rest.trim_end_matches('/');

        if rest.is_empty() {
            return Err(ProtocolError::InvalidAddress(format!(
                "no host in {:?}",
                self.host
            )));
        }
        Ok(format!("{scheme}://{rest}"))
    }

    /// HTTP basic credentials for the legacy endpoints, when a password is set.
    #[must_use]
    pub fn basic_auth(&self) -> Option<(String, String)> {
        let password = self.password()?;
        let username = self.username().unwrap_or(Self::DEFAULT_USERNAME);
        Some((username.to_string(), password.to_string()))
    }

    /// REST login identities, in the order they are tried: the configured
    /// username, then [`DEFAULT_USERNAME`](Self::DEFAULT_USERNAME).
    #[must_use]
    pub fn login_candidates(&self) -> Vec<&str> {
        let mut candidates = Vec::with_capacity(2);
        if let Some(username) = self.username() {
            candidates.push(username);
        }
        if !candidates.contains(&Self::DEFAULT_USERNAME) {
            candidates.push(Self::DEFAULT_USERNAME);
        }
        candidates
    }
}
