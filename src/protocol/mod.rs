// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer for talking to Apex controllers.
//!
//! The client logic only sees [`Request`] and [`Response`] values through
//! the [`Transport`] trait, which keeps session handling and protocol
//! fallback independent of the HTTP stack.
//!
//! # Transports
//!
//! - [`HttpTransport`]: reqwest-based implementation (feature `http`)
//!
//! # Endpoints
//!
//! The controller paths used by this crate are collected in [`paths`].

mod config;
#[cfg(feature = "http")]
mod http;
pub mod session;

pub use config::ControllerConfig;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use session::Session;

use serde_json::Value;

use crate::error::ProtocolError;

/// Controller endpoint paths.
pub mod paths {
    /// REST login.
    pub const REST_LOGIN: &str = "/rest/login";
    /// REST status.
    pub const REST_STATUS: &str = "/rest/status";
    /// REST configuration.
    pub const REST_CONFIG: &str = "/rest/config";
    /// Bulk module configuration.
    pub const REST_MCONF: &str = "/rest/config/mconf";
    /// Outlet control, followed by `/<did>`.
    pub const REST_OUTPUTS: &str = "/rest/status/outputs";
    /// Feed control, followed by `/<id>`.
    pub const REST_FEED: &str = "/rest/status/feed";
    /// Legacy JSON status.
    pub const CGI_STATUS_JSON: &str = "/cgi-bin/status.json";
    /// Legacy XML status.
    pub const CGI_STATUS_XML: &str = "/cgi-bin/status.xml";
    /// Legacy form-encoded control.
    pub const CGI_STATUS_CGI: &str = "/cgi-bin/status.cgi";
}

/// HTTP method of a [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
}

impl Method {
    /// Returns the method name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body.
    Empty,
    /// JSON document.
    Json(Value),
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
}

/// A request against the controller, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute path, always starting with `/`.
    pub path: String,
    /// HTTP basic credentials.
    pub basic_auth: Option<(String, String)>,
    /// `connect.sid` session token, sent as a cookie.
    pub session: Option<String>,
    /// Body.
    pub body: Body,
}

impl Request {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
            basic_auth: None,
            session: None,
            body: Body::Empty,
        }
    }

    /// Creates a `GET` request.
    #[must_use]
    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a `POST` request.
    #[must_use]
    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    /// Creates a `PUT` request.
    #[must_use]
    pub fn put(path: &str) -> Self {
        Self::new(Method::Put, path)
    }

    /// Adds HTTP basic credentials.
    #[must_use]
    pub fn with_basic_auth(mut self, credentials: Option<(String, String)>) -> Self {
        self.basic_auth = credentials;
        self
    }

    /// Adds the session cookie.
    #[must_use]
    pub fn with_session(mut self, token: Option<&str>) -> Self {
        self.session = token.map(str::to_string);
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    /// Sets a form body.
    #[must_use]
    pub fn with_form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// URL-encoded form body, when the body is a form.
    #[must_use]
    pub fn form_body(&self) -> Option<String> {
        match &self.body {
            Body::Form(fields) => Some(
                fields
                    .iter()
                    .map(|(k, v)| {
                        format!("{}={}", urlencoding::encode(k), urlencoding::encode(v))
                    })
                    .collect::<Vec<_>>()
                    .join("&"),
            ),
            _ => None,
        }
    }
}

/// A controller response, reduced to what the client needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Retry-After` header.
    pub retry_after: Option<String>,
    /// `connect.sid` value from a `Set-Cookie` header.
    pub session_cookie: Option<String>,
    /// Response body as text.
    pub body: String,
}

impl Response {
    /// Creates a response with a status and a body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            session_cookie: None,
            body: body.into(),
        }
    }

    /// Sets the `Retry-After` header.
    #[must_use]
    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    /// Sets the session cookie.
    #[must_use]
    pub fn with_session_cookie(mut self, sid: impl Into<String>) -> Self {
        self.session_cookie = Some(sid.into());
        self
    }

    /// `2xx` status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `401` or `403`.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// Status codes worth retrying: `408`, `500`, `502`, `503` and `504`.
#[must_use]
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Ensures `path` starts with a single `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Trait for transports that can carry a [`Request`] to the controller.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` when no response was received at all.
    async fn send(&self, request: &Request) -> Result<Response, ProtocolError>;
}
