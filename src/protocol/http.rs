// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport built on reqwest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Url};

use super::session::SESSION_COOKIE;
use super::{Body, ControllerConfig, Method, Request, Response, Transport};
use crate::error::ProtocolError;

/// HTTP transport for one controller.
///
/// Cookies live in a reqwest [`Jar`]. The session token carried by each
/// [`Request`] is written into the jar before sending, so the jar always
/// holds the token the client believes in. Every request carries the
/// configured timeout.
///
/// # Examples
///
/// ```no_run
/// use apex_fusion_lib::protocol::{ControllerConfig, HttpTransport, Request, Transport};
///
/// # async fn example() -> apex_fusion_lib::Result<()> {
/// let transport = HttpTransport::new(&ControllerConfig::new("192.168.1.50"))?;
/// let response = transport.send(&Request::get("/cgi-bin/status.json")).await?;
/// println!("{} -> {}", response.status, response.body);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
    jar: Arc<Jar>,
    timeout: Duration,
}

impl HttpTransport {
    /// Creates a transport for the configured controller.
    ///
    /// # Errors
    ///
    /// Returns error if the host is blank or the HTTP client cannot be
    /// created.
    pub fn new(config: &ControllerConfig) -> Result<Self, ProtocolError> {
        let base_url = config.base_url()?;
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .timeout(config.timeout())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(ProtocolError::Http)?;

        Ok(Self {
            base_url,
            client,
            jar,
            timeout: config.timeout(),
        })
    }

    /// Returns the base URL of the controller.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Stores `token` as the session cookie for the controller, or expires
    /// the stored one when there is none.
    fn sync_session(&self, url: &Url, token: Option<&str>) {
        let cookie = match token {
            Some(sid) => format!("{SESSION_COOKIE}={sid}; Path=/"),
            None => format!("{SESSION_COOKIE}=; Max-Age=0; Path=/"),
        };
        self.jar.add_cookie_str(&cookie, url);
    }

    fn map_error(&self, err: reqwest::Error) -> ProtocolError {
        if err.is_timeout() {
            ProtocolError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
        } else {
            ProtocolError::Http(err)
        }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &Request) -> Result<Response, ProtocolError> {
        let url = Url::parse(&self.url(&request.path))
            .map_err(|e| ProtocolError::InvalidAddress(e.to_string()))?;

        tracing::debug!(method = request.method.as_str(), url = %url, "Sending HTTP request");

        self.sync_session(&url, request.session.as_deref());

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        }
        .header(ACCEPT, "*/*");

        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(body),
            Body::Form(_) => builder
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(request.form_body().unwrap_or_default()),
        };

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let session_cookie = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
            .map(|c| c.value().to_string());

        let body = response.text().await.map_err(|e| self.map_error(e))?;

        tracing::debug!(status, bytes = body.len(), "Received HTTP response");

        Ok(Response {
            status,
            retry_after,
            session_cookie,
            body,
        })
    }
}
