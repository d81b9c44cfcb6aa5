// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The canonical controller status record.
//!
//! Every transport (REST, CGI-JSON, XML) is normalized into the same
//! [`ControllerStatus`] shape. All sections are always present; fields the
//! source did not provide are `None` or empty, never missing.
//!
//! # Examples
//!
//! ```
//! use apex_fusion_lib::status::{ControllerStatus, DataSource};
//!
//! let status = ControllerStatus::new(DataSource::Xml);
//! assert_eq!(status.meta.source, DataSource::Xml);
//! assert!(status.probes.is_empty());
//! assert!(!status.trident.present);
//! ```

mod trident;

pub use trident::{REAGENT_EMPTY_THRESHOLD_ML, Trident, WASTE_FULL_MARGIN_ML};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ModuleConfig, MxmDevice, NetworkConfig};
use crate::types::{OutletMode, is_energized_state};

/// Transport a status record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Session-authenticated `/rest/status`.
    Rest,
    /// Legacy `/cgi-bin/status.json`.
    CgiJson,
    /// Legacy `/cgi-bin/status.xml`.
    Xml,
}

impl DataSource {
    /// Returns the source tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::CgiJson => "cgi_json",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized status of one controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    /// Identity and firmware.
    pub meta: Meta,
    /// Network settings (REST only).
    pub network: Network,
    /// Probes and inputs keyed by device id.
    pub probes: BTreeMap<String, Probe>,
    /// Outlets and outputs in controller order.
    pub outlets: Vec<Outlet>,
    /// Feed-mode state, when reported.
    pub feed: Option<Feed>,
    /// Most recent alert.
    pub alerts: Alerts,
    /// Trident reagent tester.
    pub trident: Trident,
    /// Sanitized configuration subsets.
    pub config: ConfigSection,
    /// Devices attached to MXM modules, keyed by name.
    pub mxm_devices: Option<BTreeMap<String, MxmDevice>>,
    /// The original payload (REST and CGI-JSON only).
    pub raw: Option<Value>,
}

impl ControllerStatus {
    /// Creates an empty record tagged with `source`.
    #[must_use]
    pub fn new(source: DataSource) -> Self {
        Self {
            meta: Meta::new(source),
            network: Network::default(),
            probes: BTreeMap::new(),
            outlets: Vec::new(),
            feed: None,
            alerts: Alerts::default(),
            trident: Trident::default(),
            config: ConfigSection::default(),
            mxm_devices: None,
            raw: None,
        }
    }

    /// Bus address of a detected Trident.
    #[must_use]
    pub fn trident_abaddr(&self) -> Option<i64> {
        if self.trident.present {
            self.trident.abaddr
        } else {
            None
        }
    }

    /// Finds an outlet by device id.
    #[must_use]
    pub fn outlet(&self, device_id: &str) -> Option<&Outlet> {
        self.outlets.iter().find(|o| o.device_id == device_id)
    }
}

/// Controller identity and version fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Firmware version.
    pub software: Option<String>,
    /// Hardware family.
    pub hardware: Option<String>,
    /// Network hostname.
    pub hostname: Option<String>,
    /// Controller serial number.
    pub serial: Option<String>,
    /// Configured timezone.
    pub timezone: Option<String>,
    /// Report date as sent by the controller.
    pub date: Option<String>,
    /// Controller model (REST only).
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    /// Newest firmware the controller knows about (REST only).
    pub firmware_latest: Option<String>,
    /// Transport this record came from.
    pub source: DataSource,
}

impl Meta {
    /// Creates empty metadata for `source`.
    #[must_use]
    pub fn new(source: DataSource) -> Self {
        Self {
            software: None,
            hardware: None,
            hostname: None,
            serial: None,
            timezone: None,
            date: None,
            device_type: None,
            firmware_latest: None,
            source,
        }
    }

    /// Parses [`date`](Self::date) into a timestamp.
    ///
    /// Understands the controller's `MM/DD/YYYY HH:MM:SS` format, ISO-8601
    /// and Unix epoch seconds. The controller reports local time without an
    /// offset, so the result is naive.
    ///
    /// ```
    /// use apex_fusion_lib::status::{DataSource, Meta};
    ///
    /// let mut meta = Meta::new(DataSource::Xml);
    /// meta.date = Some("02/14/2024 18:30:05".to_string());
    /// let ts = meta.report_time().unwrap();
    /// assert_eq!(ts.to_string(), "2024-02-14 18:30:05");
    /// ```
    #[must_use]
    pub fn report_time(&self) -> Option<NaiveDateTime> {
        parse_report_time(self.date.as_deref()?)
    }
}

const REPORT_TIME_FORMATS: [&str; 4] = [
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

fn parse_report_time(raw: &str) -> Option<NaiveDateTime> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    if t.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = t.parse().ok()?;
        return DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_local());
    }
    REPORT_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
}

/// Network settings from `nstat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// IPv4 address.
    pub ipaddr: Option<String>,
    /// Default gateway.
    pub gateway: Option<String>,
    /// Subnet mask.
    pub netmask: Option<String>,
    /// DHCP enabled.
    pub dhcp: Option<bool>,
    /// Wi-Fi enabled.
    pub wifi_enable: Option<bool>,
    /// Wi-Fi network name.
    pub ssid: Option<String>,
    /// Wi-Fi signal strength.
    pub strength: Option<i64>,
    /// Wi-Fi link quality.
    pub quality: Option<i64>,
}

/// A probe or input reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    /// Display name.
    pub name: String,
    /// Probe type token (`Temp`, `pH`, `Amps`, ...).
    #[serde(rename = "type")]
    pub probe_type: Option<String>,
    /// Reading as sent by the controller.
    pub value_raw: Option<String>,
    /// Reading parsed as a number.
    pub value: Option<f64>,
    /// Bus address of the owning module.
    pub module_abaddr: Option<i64>,
    /// Hardware type of the owning module.
    pub module_hwtype: Option<String>,
}

impl Probe {
    /// Creates a probe with only its name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe_type: None,
            value_raw: None,
            value: None,
            module_abaddr: None,
            module_hwtype: None,
        }
    }
}

/// An outlet or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlet {
    /// Device id used to address the outlet (`2_1`, `base_Var1`, ...).
    pub device_id: String,
    /// Display name.
    pub name: String,
    /// Numeric output id.
    pub output_id: Option<String>,
    /// Raw state token (`AON`, `AOF`, `ON`, `OFF`, `TBL`, ...).
    pub state: Option<String>,
    /// Output type (`outlet`, `variable`, ...).
    #[serde(rename = "type")]
    pub output_type: Option<String>,
    /// Group id.
    pub gid: Option<String>,
    /// Intensity for variable outputs (0-100).
    pub intensity: Option<u8>,
    /// Bus address of the owning module.
    pub module_abaddr: Option<i64>,
    /// Hardware type of the owning module.
    pub module_hwtype: Option<String>,
    /// The raw status array.
    pub status: Option<Vec<Value>>,
}

impl Outlet {
    /// Creates an outlet with only its id and name set.
    #[must_use]
    pub fn new(device_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            output_id: None,
            state: None,
            output_type: None,
            gid: None,
            intensity: None,
            module_abaddr: None,
            module_hwtype: None,
            status: None,
        }
    }

    /// Control mode implied by the state token.
    #[must_use]
    pub fn mode(&self) -> Option<OutletMode> {
        self.state.as_deref().map(OutletMode::from_state)
    }

    /// Whether the outlet is powered.
    #[must_use]
    pub fn is_energized(&self) -> Option<bool> {
        self.state.as_deref().map(is_energized_state)
    }
}

/// Feed-mode state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Active feed timer (1-4), 0 when none.
    pub id: Option<i64>,
    /// Whether a feed cycle is running.
    pub active: Option<bool>,
}

/// Most recent alert text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alerts {
    /// The program statement that raised the alert.
    pub last_statement: Option<String>,
    /// The full alert message.
    pub last_message: Option<String>,
}

/// Sanitized configuration subsets. Never holds credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSection {
    /// Module configuration.
    pub mconf: Option<Vec<ModuleConfig>>,
    /// Firmware update information.
    pub nconf: Option<NetworkConfig>,
}
