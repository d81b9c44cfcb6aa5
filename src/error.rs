// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the Apex Fusion library.
//!
//! The hierarchy separates failures the caller must act on (rejected
//! credentials) from failures that only mean "try again later" (network
//! errors, rate limiting, a transport that is temporarily switched off).
//! Malformed optional data never shows up here: normalizers absorb it as
//! `None`.

use std::time::Duration;

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Credentials are missing or were rejected by the controller.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The endpoint does not exist on this controller firmware.
    #[error("endpoint not supported: {0}")]
    NotSupported(String),

    /// The controller answered with HTTP 429.
    #[error("rate limited by controller{}", retry_hint(.retry_after))]
    RateLimited {
        /// Back-off requested through the `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// REST is switched off after an earlier rate-limit response.
    #[error("REST temporarily disabled (retry in ~{}s)", .retry_in.as_secs())]
    TransportDisabled {
        /// Time left until REST is attempted again.
        retry_in: Duration,
    },

    /// Network or HTTP level failure.
    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    /// A payload was structurally invalid.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A control value was rejected before anything was sent.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// The operation cannot run against the current device state.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

#[allow(clippy::ref_option)]
fn retry_hint(retry_after: &Option<Duration>) -> String {
    retry_after.map_or_else(String::new, |d| format!("; retry after ~{}s", d.as_secs()))
}

impl Error {
    /// Returns `true` when the caller should ask the user for new credentials.
    #[must_use]
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Returns `true` when retrying on the next poll cycle is the right reaction.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::TransportDisabled { .. }
                | Self::Transport(_)
                | Self::Parse(_)
        )
    }
}

/// Errors related to HTTP communication with the controller.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The controller returned a status code the client cannot use.
    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

impl ProtocolError {
    /// Whether the same request may succeed when sent again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            Self::Timeout(_) | Self::ConnectionFailed(_) => true,
            Self::UnexpectedStatus(status) => crate::protocol::is_transient_status(*status),
            Self::InvalidAddress(_) => false,
        }
    }
}

/// Errors raised when a payload root cannot be parsed at all.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// Payload parsed but has the wrong overall shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Errors related to control values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// Outlet mode other than AUTO, ON or OFF.
    #[error("invalid outlet mode: {0}")]
    InvalidOutletMode(String),

    /// Feed cycle id outside 1-4.
    #[error("invalid feed cycle id: {0}")]
    InvalidFeedCycle(u8),

    /// Waste container size must be positive and finite.
    #[error("waste container size must be > 0 (got {0})")]
    InvalidWasteSize(f64),

    /// Blank outlet device id.
    #[error("device id must not be empty")]
    EmptyDeviceId,

    /// Trident prime channel outside 0-3.
    #[error("invalid prime channel: {0}")]
    InvalidPrimeChannel(u8),
}

/// Errors related to the controller's current state.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No Trident module with a bus address was found in the last status.
    #[error("Trident module not detected")]
    TridentNotDetected,

    /// Authenticated operations need a password.
    #[error("password is required for REST control")]
    PasswordRequired,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display_with_retry_after() {
        let err = Error::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(
            err.to_string(),
            "rate limited by controller; retry after ~30s"
        );
    }

    #[test]
    fn rate_limited_display_without_retry_after() {
        let err = Error::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limited by controller");
    }

    #[test]
    fn transport_disabled_display() {
        let err = Error::TransportDisabled {
            retry_in: Duration::from_secs(42),
        };
        assert_eq!(err.to_string(), "REST temporarily disabled (retry in ~42s)");
    }

    #[test]
    fn auth_needs_reauth_and_is_not_transient() {
        let err = Error::Auth("rejected".to_string());
        assert!(err.needs_reauth());
        assert!(!err.is_transient());
    }

    #[test]
    fn transport_is_transient() {
        let err: Error = ProtocolError::Timeout(10_000).into();
        assert!(err.is_transient());
        assert!(!err.needs_reauth());
    }

    #[test]
    fn protocol_error_transience() {
        assert!(ProtocolError::ConnectionFailed("reset".to_string()).is_transient());
        assert!(ProtocolError::UnexpectedStatus(503).is_transient());
        assert!(!ProtocolError::UnexpectedStatus(400).is_transient());
        assert!(!ProtocolError::InvalidAddress(String::new()).is_transient());
    }

    #[test]
    fn error_from_value_error() {
        let err: Error = ValueError::InvalidPrimeChannel(7).into();
        assert!(matches!(
            err,
            Error::Value(ValueError::InvalidPrimeChannel(7))
        ));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::UnexpectedFormat("root is not an object".to_string());
        assert_eq!(
            err.to_string(),
            "unexpected response format: root is not an object"
        );
    }
}
