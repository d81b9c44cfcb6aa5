// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Status payload normalization.
//!
//! The controller exposes the same data through three endpoints with three
//! different shapes. [`StatusPayload`] tags a raw body with its shape and
//! [`StatusPayload::normalize`] turns any of them into a
//! [`ControllerStatus`]. Normalization is pure: no I/O and no shared state,
//! so the same payload always yields the same record.
//!
//! # Examples
//!
//! ```
//! use apex_fusion_lib::payload::StatusPayload;
//! use apex_fusion_lib::status::DataSource;
//!
//! let payload = StatusPayload::parse(
//!     DataSource::CgiJson,
//!     r#"{"istat": {"hostname": "reef", "inputs": [{"did": "T1", "value": "25.0"}]}}"#,
//! )?;
//! let status = payload.normalize()?;
//!
//! assert_eq!(status.meta.source, DataSource::CgiJson);
//! assert_eq!(status.probes["T1"].value, Some(25.0));
//! # Ok::<(), apex_fusion_lib::ParseError>(())
//! ```

pub mod cgi_json;
mod common;
pub mod rest;
mod trident;
pub mod xml;

use serde_json::Value;

use crate::error::ParseError;
use crate::status::{ControllerStatus, DataSource};

pub(crate) use common::json_object;

/// A status body tagged with the endpoint it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusPayload {
    /// `/rest/status` JSON.
    Rest(Value),
    /// `/cgi-bin/status.json` JSON.
    CgiJson(Value),
    /// `/cgi-bin/status.xml` text.
    Xml(String),
}

impl StatusPayload {
    /// Wraps a response body as the payload of `source`.
    ///
    /// JSON bodies are parsed here; an empty body is an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when a JSON body is not valid JSON or its root
    /// is not an object.
    pub fn parse(source: DataSource, body: &str) -> Result<Self, ParseError> {
        Ok(match source {
            DataSource::Rest => Self::Rest(json_object(body)?),
            DataSource::CgiJson => Self::CgiJson(json_object(body)?),
            DataSource::Xml => Self::Xml(body.to_string()),
        })
    }

    /// The endpoint this payload came from.
    #[must_use]
    pub const fn source(&self) -> DataSource {
        match self {
            Self::Rest(_) => DataSource::Rest,
            Self::CgiJson(_) => DataSource::CgiJson,
            Self::Xml(_) => DataSource::Xml,
        }
    }

    /// Converts the payload into the canonical record, with the Trident's
    /// derived fields computed.
    ///
    /// # Errors
    ///
    /// Only structural failures are errors: a JSON root that is not an object
    /// or an XML document that is not well-formed. Every other oddity yields
    /// absent fields.
    pub fn normalize(&self) -> Result<ControllerStatus, ParseError> {
        let mut status = match self {
            Self::Rest(value) => {
                ensure_object(value)?;
                rest::parse_status_rest(value)
            }
            Self::CgiJson(value) => {
                ensure_object(value)?;
                cgi_json::parse_status_cgi_json(value)
            }
            Self::Xml(text) => xml::parse_status_xml(text)?,
        };
        status.trident.finalize();
        Ok(status)
    }
}

fn ensure_object(value: &Value) -> Result<(), ParseError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ParseError::UnexpectedFormat(
            "JSON root is not an object".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_tags() {
        assert_eq!(StatusPayload::Rest(json!({})).source(), DataSource::Rest);
        assert_eq!(
            StatusPayload::CgiJson(json!({})).source(),
            DataSource::CgiJson
        );
        assert_eq!(StatusPayload::Xml(String::new()).source(), DataSource::Xml);
    }

    #[test]
    fn json_root_must_be_an_object() {
        for payload in [
            StatusPayload::Rest(json!([1])),
            StatusPayload::CgiJson(json!("x")),
        ] {
            assert!(matches!(
                payload.normalize(),
                Err(ParseError::UnexpectedFormat(_))
            ));
        }
        assert!(StatusPayload::parse(DataSource::Rest, "null").is_err());
        assert!(StatusPayload::parse(DataSource::CgiJson, "{").is_err());
    }

    #[test]
    fn empty_body_is_empty_record() {
        let status = StatusPayload::parse(DataSource::Rest, "  ")
            .unwrap()
            .normalize()
            .unwrap();
        assert_eq!(status.meta.source, DataSource::Rest);
        assert!(status.probes.is_empty());
        assert_eq!(status.raw, Some(json!({})));
    }

    #[test]
    fn xml_body_is_kept_verbatim() {
        let payload = StatusPayload::parse(DataSource::Xml, "<status/>").unwrap();
        assert_eq!(payload, StatusPayload::Xml("<status/>".to_string()));
        assert!(StatusPayload::Xml("<status".to_string()).normalize().is_err());
    }

    #[test]
    fn normalize_finalizes_trident() {
        let payload = StatusPayload::Rest(json!({"modules": [{
            "hwtype": "TRI", "abaddr": 5,
            "extra": {"levels": [90, 123, 30, 10, 5]}
        }]}));
        let status = payload.normalize().unwrap();
        assert_eq!(status.trident.waste_used_ml, Some(90.0));
        assert_eq!(status.trident.reagent_a_remaining_ml, Some(5.0));
        assert_eq!(status.trident.reagent_a_empty, Some(true));
        // Size comes from the config, not the status payload.
        assert_eq!(status.trident.waste_full, None);
    }

    #[test]
    fn normalize_is_idempotent() {
        let payloads = [
            StatusPayload::Rest(json!({"system": {"hostname": "a"}, "inputs": [{"did": "1_0"}]})),
            StatusPayload::CgiJson(json!({"istat": {"outputs": [{"did": "2_1"}]}})),
            StatusPayload::Xml("<status><hostname>a</hostname></status>".to_string()),
        ];
        for payload in payloads {
            let first = payload.normalize().unwrap();
            let second = payload.normalize().unwrap();
            assert_eq!(first, second, "{:?}", payload.source());
        }
    }
}
