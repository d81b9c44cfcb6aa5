// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST session and rate-limit state.
//!
//! A [`Session`] is owned by exactly one client. It remembers the
//! `connect.sid` token between polls, the instant until which REST is
//! switched off after a `429`, and the REST status path that last worked.
//! Network flows live in the client; this type only holds and updates the
//! state.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use super::paths;
use crate::error::Error;

/// Name of the REST session cookie.
pub const SESSION_COOKIE: &str = "connect.sid";

/// Back-off applied when a `429` carries no usable `Retry-After`.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(300);

/// REST session state for one controller.
#[derive(Clone, Default)]
pub struct Session {
    token: Option<String>,
    disabled_until: Option<Instant>,
    status_path: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("disabled_until", &self.disabled_until)
            .field("status_path", &self.status_path)
            .finish()
    }
}

impl Session {
    /// Creates a session with no token and REST enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached session token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Whether a token is cached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Caches a token after a successful login.
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Drops the cached token, e.g. after the controller rejected it.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// REST status path to poll: the last one that worked, or `/rest/status`.
    #[must_use]
    pub fn status_path(&self) -> &str {
        self.status_path.as_deref().unwrap_or(paths::REST_STATUS)
    }

    /// Records the REST status path that just answered successfully.
    pub fn remember_status_path(&mut self, path: impl Into<String>) {
        self.status_path = Some(path.into());
    }

    /// Time left until REST is enabled again, if it is disabled at `now`.
    #[must_use]
    pub fn retry_in(&self, now: Instant) -> Option<Duration> {
        self.disabled_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Whether REST is disabled at `now`.
    #[must_use]
    pub fn is_disabled(&self, now: Instant) -> bool {
        self.retry_in(now).is_some()
    }

    /// Fails fast while REST is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TransportDisabled`] with the remaining back-off.
    pub fn check_available(&self, now: Instant) -> Result<(), Error> {
        match self.retry_in(now) {
            Some(retry_in) => Err(Error::TransportDisabled { retry_in }),
            None => Ok(()),
        }
    }

    /// Disables REST for `duration` from `now`. An existing, longer back-off
    /// is kept.
    pub fn disable_for(&mut self, now: Instant, duration: Duration) {
        let until = now + duration;
        if self.disabled_until.is_none_or(|current| until > current) {
            self.disabled_until = Some(until);
        }
    }

    /// Handles a `429`: disables REST for the `Retry-After` delay (default
    /// [`DEFAULT_RATE_LIMIT_BACKOFF`]) and returns the error to report.
    pub fn rate_limited(&mut self, now: Instant, retry_after: Option<&str>) -> Error {
        let retry_after = retry_after.and_then(parse_retry_after);
        let backoff = retry_after.unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF);
        tracing::warn!(
            backoff_secs = backoff.as_secs(),
            "Controller rate limited REST, disabling it"
        );
        self.disable_for(now, backoff);
        Error::RateLimited { retry_after }
    }
}

/// Parses a `Retry-After` value given in whole seconds.
///
/// HTTP dates and anything else that is not a plain integer are ignored.
/// Negative values mean no delay.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs < 0)
        .map(|_| Duration::ZERO)
}

/// Extracts the session token from a login response body
/// (`{"connect.sid": "..."}`).
#[must_use]
pub fn token_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get(SESSION_COOKIE)
        .and_then(Value::as_str)
        .filter(|sid| !sid.is_empty())
        .map(str::to_string)
}
