// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sanitized subsets of the controller's `/rest/config` payload.
//!
//! The full configuration is large and carries credentials (Wi-Fi keys,
//! e-mail passwords, ...). Only the handful of fields consumers need are
//! ever kept:
//!
//! - per-module identity and update state (`mconf`)
//! - firmware update information (`nconf`)
//! - devices attached to MXM modules, parsed from their status text
//!
//! # Examples
//!
//! ```
//! use apex_fusion_lib::config::{sanitize_mconf, sanitize_nconf};
//! use serde_json::json;
//!
//! let payload = json!({
//!     "mconf": [{"hwtype": "tri", "abaddr": 5, "extra": {"wasteSize": 450, "pin": "1234"}}],
//!     "nconf": {"latestFirmware": "5.12", "wifiPassword": "secret"}
//! });
//!
//! let modules = sanitize_mconf(&payload);
//! assert_eq!(modules[0].hwtype, "TRI");
//! assert_eq!(modules[0].waste_size(), Some(450.0));
//!
//! let nconf = sanitize_nconf(&payload).unwrap();
//! assert_eq!(nconf.latest_firmware.as_deref(), Some("5.12"));
//! ```

mod cache;
mod modules;
mod mxm;

pub use cache::ConfigCache;
pub use modules::{CandidateSource, ModuleCandidate, best_module_candidates};
pub use mxm::{parse_mxm_devices, parse_mxm_line};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extract::{first_present, non_empty_str, objects, scalar_string};
use crate::status::ConfigSection;

/// Hardware type of MXM (Mobius) bridge modules.
pub const MXM_HWTYPE: &str = "MXM";

/// Hardware types reported by Trident modules.
pub const TRIDENT_HWTYPES: [&str; 2] = ["TRI", "TNP"];

/// One sanitized `mconf` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Uppercase hardware type.
    pub hwtype: String,
    /// Aquabus address.
    pub abaddr: Option<i64>,
    /// Configured module name.
    pub name: Option<String>,
    /// A firmware update is pending.
    pub update: Option<bool>,
    /// Firmware update progress code.
    #[serde(rename = "updateStat")]
    pub update_stat: Option<i64>,
    /// Whitelisted `extra` fields.
    pub extra: Option<ModuleExtra>,
}

impl ModuleConfig {
    /// Creates an entry with only the hardware type set.
    #[must_use]
    pub fn new(hwtype: impl Into<String>) -> Self {
        Self {
            hwtype: hwtype.into(),
            abaddr: None,
            name: None,
            update: None,
            update_stat: None,
            extra: None,
        }
    }

    /// Whether this entry describes a Trident.
    #[must_use]
    pub fn is_trident(&self) -> bool {
        TRIDENT_HWTYPES.contains(&self.hwtype.as_str())
    }

    /// Configured waste container size in mL.
    #[must_use]
    pub fn waste_size(&self) -> Option<f64> {
        self.extra.as_ref().and_then(|e| e.waste_size)
    }
}

/// Whitelisted keys of a module's `extra` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleExtra {
    /// Trident waste container size in mL.
    #[serde(rename = "wasteSize")]
    pub waste_size: Option<f64>,
    /// MXM attached-device status block.
    pub status: Option<String>,
}

impl ModuleExtra {
    fn is_empty(&self) -> bool {
        self.waste_size.is_none() && self.status.is_none()
    }
}

/// Sanitized `nconf`: firmware update fields only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Newest firmware version offered.
    #[serde(rename = "latestFirmware")]
    pub latest_firmware: Option<String>,
    /// A firmware update is available.
    #[serde(rename = "updateFirmware")]
    pub update_firmware: Option<bool>,
}

/// Metadata of a device attached to an MXM module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxmDevice {
    /// Hardware revision.
    pub rev: String,
    /// Serial number.
    pub serial: String,
    /// Link status text.
    pub status: String,
}

/// Result of a configuration refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Sanitized `mconf` and `nconf`.
    pub config: ConfigSection,
    /// MXM attached devices.
    pub mxm_devices: BTreeMap<String, MxmDevice>,
}

impl ConfigSnapshot {
    /// Sanitizes a raw `/rest/config` payload.
    #[must_use]
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            config: ConfigSection {
                mconf: Some(sanitize_mconf(payload)),
                nconf: sanitize_nconf(payload),
            },
            mxm_devices: parse_mxm_devices(payload),
        }
    }

    /// Sanitized module entries.
    #[must_use]
    pub fn modules(&self) -> &[ModuleConfig] {
        self.config.mconf.as_deref().unwrap_or_default()
    }
}

/// Waste container size of the first Trident entry that has one.
#[must_use]
pub fn trident_waste_size(mconf: &[ModuleConfig]) -> Option<f64> {
    mconf
        .iter()
        .filter(|m| m.is_trident())
        .find_map(ModuleConfig::waste_size)
}

/// Keeps the non-sensitive fields of every `mconf` entry.
///
/// Entries without a hardware type are dropped. `extra` keeps only
/// `wasteSize` and, for MXM modules, the `status` text.
#[must_use]
pub fn sanitize_mconf(payload: &Value) -> Vec<ModuleConfig> {
    let Some(entries) = payload.get("mconf") else {
        return Vec::new();
    };
    objects(entries)
        .into_iter()
        .filter_map(sanitize_module)
        .collect()
}

fn sanitize_module(module: &Map<String, Value>) -> Option<ModuleConfig> {
    let hwtype = first_present(module, &["hwtype", "hwType"])
        .and_then(scalar_string)?
        .to_uppercase();

    let extra = module.get("extra").and_then(Value::as_object).map(|extra| {
        let status = if hwtype == MXM_HWTYPE {
            extra
                .get("status")
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(ToString::to_string)
        } else {
            None
        };
        ModuleExtra {
            waste_size: extra.get("wasteSize").and_then(Value::as_f64),
            status,
        }
    });

    Some(ModuleConfig {
        abaddr: module.get("abaddr").and_then(Value::as_i64),
        name: module.get("name").and_then(non_empty_str),
        update: module.get("update").and_then(Value::as_bool),
        update_stat: module.get("updateStat").and_then(Value::as_i64),
        extra: extra.filter(|e| !e.is_empty()),
        hwtype,
    })
}

/// Keeps only the firmware update fields of `nconf`.
///
/// Returns `None` when neither field is present.
#[must_use]
pub fn sanitize_nconf(payload: &Value) -> Option<NetworkConfig> {
    let nconf = payload.get("nconf")?.as_object()?;
    let out = NetworkConfig {
        latest_firmware: nconf.get("latestFirmware").and_then(non_empty_str),
        update_firmware: nconf.get("updateFirmware").and_then(Value::as_bool),
    };
    (out != NetworkConfig::default()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mconf_keeps_whitelisted_fields_only() {
        let payload = json!({
            "mconf": [
                {
                    "hwtype": "eb832",
                    "abaddr": 3,
                    "name": " EB832_3 ",
                    "update": false,
                    "updateStat": 0,
                    "extra": {"pumps": [1, 2], "status": "not kept"},
                    "secret": "x"
                },
                {"hwType": "TRI", "abaddr": 5, "extra": {"wasteSize": 450.5}},
                {"hwtype": "MXM", "abaddr": 8, "extra": {"status": "Nero 5(x) - Rev 1 Ser #: S - OK"}},
                {"name": "no hwtype"},
                "nope"
            ]
        });

        let mconf = sanitize_mconf(&payload);
        assert_eq!(mconf.len(), 3);

        let eb = &mconf[0];
        assert_eq!(eb.hwtype, "EB832");
        assert_eq!(eb.abaddr, Some(3));
        assert_eq!(eb.name.as_deref(), Some("EB832_3"));
        assert_eq!(eb.update, Some(false));
        assert_eq!(eb.update_stat, Some(0));
        assert_eq!(eb.extra, None);

        assert_eq!(mconf[1].waste_size(), Some(450.5));
        assert!(mconf[1].is_trident());

        let mxm = mconf[2].extra.as_ref().unwrap();
        assert!(mxm.status.as_deref().unwrap().starts_with("Nero 5"));

        let serialized = serde_json::to_string(&mconf).unwrap();
        assert!(!serialized.contains("secret"));
        assert!(!serialized.contains("pumps"));
    }

    #[test]
    fn mconf_rejects_wrong_types() {
        let payload = json!({"mconf": [{
            "hwtype": "FMM",
            "abaddr": "4",
            "update": 1,
            "updateStat": "2",
            "extra": {"wasteSize": "450"}
        }]});
        let m = &sanitize_mconf(&payload)[0];
        assert_eq!(m.abaddr, None);
        assert_eq!(m.update, None);
        assert_eq!(m.update_stat, None);
        assert_eq!(m.extra, None);
    }

    #[test]
    fn mconf_missing_or_malformed() {
        assert!(sanitize_mconf(&json!({})).is_empty());
        assert!(sanitize_mconf(&json!({"mconf": {"a": 1}})).is_empty());
        assert!(sanitize_mconf(&json!([1, 2])).is_empty());
    }

    #[test]
    fn nconf_drops_credentials() {
        let payload = json!({"nconf": {
            "latestFirmware": " 5.12_7B24 ",
            "updateFirmware": true,
            "password": "hunter2",
            "emailPassword": "secret",
            "wifiKey": "k"
        }});
        let nconf = sanitize_nconf(&payload).unwrap();
        assert_eq!(nconf.latest_firmware.as_deref(), Some("5.12_7B24"));
        assert_eq!(nconf.update_firmware, Some(true));

        let serialized = serde_json::to_string(&nconf).unwrap();
        assert!(!serialized.contains("hunter2"));
        assert!(!serialized.contains("secret"));
    }

    #[test]
    fn nconf_empty_is_none() {
        assert_eq!(sanitize_nconf(&json!({"nconf": {"password": "x"}})), None);
        assert_eq!(sanitize_nconf(&json!({"nconf": "x"})), None);
        assert_eq!(sanitize_nconf(&json!({})), None);
    }

    #[test]
    fn trident_waste_size_skips_other_modules() {
        let mut other = ModuleConfig::new("EB832");
        other.extra = Some(ModuleExtra {
            waste_size: Some(1.0),
            status: None,
        });
        let mut tri = ModuleConfig::new("TNP");
        tri.extra = Some(ModuleExtra {
            waste_size: Some(300.0),
            status: None,
        });
        assert_eq!(trident_waste_size(&[other.clone(), tri]), Some(300.0));
        assert_eq!(trident_waste_size(&[other]), None);
    }

    #[test]
    fn snapshot_from_payload() {
        let payload = json!({
            "mconf": [{"hwtype": "MXM", "extra": {"status": "Nero 5(x) - Rev 1 Ser #: S123 - OK"}}],
            "nconf": {"updateFirmware": false}
        });
        let snapshot = ConfigSnapshot::from_payload(&payload);
        assert_eq!(snapshot.modules().len(), 1);
        assert_eq!(snapshot.mxm_devices["Nero 5"].serial, "S123");
        assert_eq!(
            snapshot.config.nconf.and_then(|n| n.update_firmware),
            Some(false)
        );
    }
}
