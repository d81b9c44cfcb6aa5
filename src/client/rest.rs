// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! REST login and authenticated requests.

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;

use super::ApexClient;
use crate::config::ConfigSnapshot;
use crate::error::{DeviceError, Error, ProtocolError, Result};
use crate::payload::json_object;
use crate::protocol::session::token_from_body;
use crate::protocol::{Request, Response, Transport, is_transient_status, paths};

/// Attempts per login identity when the controller fails transiently.
const LOGIN_ATTEMPTS: u32 = 3;

/// Back-off step between login attempts; attempt `n` waits `n` steps.
const LOGIN_RETRY_STEP: Duration = Duration::from_millis(250);

impl<T: Transport> ApexClient<T> {
    /// Sends a REST request with the session cookie.
    ///
    /// With `login_first` a session is established before the request;
    /// otherwise the cached token is used, if any. A `401`/`403` on a cached
    /// token clears it, logs in again and retries exactly once. A token
    /// minted by this same call is not renewed.
    pub(super) async fn rest_call(&mut self, request: Request, login_first: bool) -> Result<Response> {
        self.session.check_available(Instant::now())?;
        if !self.config.has_password() {
            return Err(DeviceError::PasswordRequired.into());
        }

        let cached = self.session.token().map(str::to_string);
        let (token, fresh) = match cached {
            Some(token) => (Some(token), false),
            None if login_first => (Some(self.login().await?), true),
            None => (None, false),
        };

        match self.send_rest(&request, token.as_deref()).await {
            Err(Error::Auth(reason)) if !fresh => {
                tracing::debug!(path = %request.path, %reason, "REST session rejected, logging in again");
                self.session.clear_token();
                let token = self.login().await?;
                self.send_rest(&request, Some(&token)).await
            }
            Err(Error::Auth(reason)) => {
                tracing::debug!(path = %request.path, %reason, "REST rejected a fresh session");
                self.session.clear_token();
                Err(Error::Auth(reason))
            }
            other => other,
        }
    }

    /// GETs `/rest/config` and sanitizes it.
    pub(super) async fn fetch_config(&mut self) -> Result<ConfigSnapshot> {
        let response = self.rest_call(Request::get(paths::REST_CONFIG), true).await?;
        let payload = json_object(&response.body)?;
        Ok(ConfigSnapshot::from_payload(&payload))
    }

    async fn send_rest(&mut self, request: &Request, token: Option<&str>) -> Result<Response> {
        let request = request.clone().with_session(token);
        let response = self.transport.send(&request).await?;

        match response.status {
            _ if response.is_success() => Ok(response),
            401 | 403 => Err(Error::Auth(format!(
                "{} {} rejected (HTTP {})",
                request.method.as_str(),
                request.path,
                response.status
            ))),
            404 => Err(Error::NotSupported(format!(
                "{} {}",
                request.method.as_str(),
                request.path
            ))),
            429 => Err(self
                .session
                .rate_limited(Instant::now(), response.retry_after.as_deref())),
            status => Err(ProtocolError::UnexpectedStatus(status).into()),
        }
    }

    /// Logs in with each candidate identity in turn and caches the token.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] when every identity was rejected
    /// - [`Error::NotSupported`] when the firmware has no REST login
    /// - [`Error::RateLimited`] on `429`; REST is disabled afterwards
    /// - [`Error::Transport`] when the controller kept failing transiently
    pub(super) async fn login(&mut self) -> Result<String> {
        self.session.check_available(Instant::now())?;
        let password = self
            .config
            .password()
            .ok_or(DeviceError::PasswordRequired)?
            .to_string();
        let candidates: Vec<String> = self
            .config
            .login_candidates()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut last_status = None;
        let mut last_error = None;

        for login in candidates {
            let request = Request::post(paths::REST_LOGIN).with_json(json!({
                "login": login,
                "password": password,
                "remember_me": false,
            }));
            let response = self.send_with_retries(&request).await?;
            last_status = Some(response.status);

            match response.status {
                _ if response.is_success() => {
                    let token = response
                        .session_cookie
                        .clone()
                        .or_else(|| token_from_body(&response.body));
                    if let Some(token) = token {
                        tracing::debug!(%login, "REST login succeeded");
                        self.session.set_token(token.clone());
                        return Ok(token);
                    }
                    tracing::debug!(%login, "REST login returned no session token");
                }
                401 | 403 => {
                    tracing::debug!(%login, status = response.status, "REST login rejected");
                }
                404 => {
                    return Err(Error::NotSupported(format!("POST {}", paths::REST_LOGIN)));
                }
                429 => {
                    return Err(self
                        .session
                        .rate_limited(Instant::now(), response.retry_after.as_deref()));
                }
                status => last_error = Some(ProtocolError::UnexpectedStatus(status)),
            }
        }

        self.session.clear_token();
        if let Some(err) = last_error {
            return Err(err.into());
        }
        Err(Error::Auth(match last_status {
            Some(status) => format!("REST login rejected (HTTP {status})"),
            None => "REST login rejected".to_string(),
        }))
    }

    /// Sends one login request, retrying network errors and transient
    /// statuses with a linear back-off.
    async fn send_with_retries(
        &self,
        request: &Request,
    ) -> std::result::Result<Response, ProtocolError> {
        let mut attempt = 1;
        loop {
            let outcome = match self.transport.send(request).await {
                Ok(response) if is_transient_status(response.status) => {
                    Err(ProtocolError::UnexpectedStatus(response.status))
                }
                other => other,
            };

            match outcome {
                Err(err) if err.is_transient() && attempt < LOGIN_ATTEMPTS => {
                    tracing::debug!(attempt, error = %err, "REST login failed, retrying");
                    tokio::time::sleep(LOGIN_RETRY_STEP * attempt).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
