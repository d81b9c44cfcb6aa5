// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `/cgi-bin/status.json` normalizer.
//!
//! The legacy endpoint nests everything under `istat` and always identifies
//! probes and outlets by a string `did`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::common::{ModuleKeys, feed_from_value, parse_outlet, parse_probe};
use super::trident::trident_from_modules;
use crate::extract::{non_empty_str, scalar_string};
use crate::status::{ControllerStatus, DataSource, Meta, Outlet, Probe};

const KEYS: ModuleKeys = ModuleKeys {
    abaddr: &["module_abaddr", "abaddr", "abAddr"],
    hwtype: &["module_hwtype", "hwtype", "hwType"],
    nested: false,
};

const ISTAT_SERIAL_KEYS: [&str; 4] = ["serial", "serialNo", "serialNO", "serial_number"];
const ROOT_SERIAL_KEYS: [&str; 2] = ["serial", "serialNo"];

/// Normalizes a CGI-JSON status payload.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::payload::cgi_json::parse_status_cgi_json;
/// use serde_json::json;
///
/// let status = parse_status_cgi_json(&json!({
///     "istat": {
///         "hostname": "reef",
///         "serial": 12345,
///         "outputs": [{"did": "2_1", "name": "Return", "status": ["AON"]}]
///     }
/// }));
/// assert_eq!(status.meta.serial.as_deref(), Some("12345"));
/// assert_eq!(status.outlets[0].state.as_deref(), Some("AON"));
/// ```
#[must_use]
pub fn parse_status_cgi_json(payload: &Value) -> ControllerStatus {
    let empty = Map::new();
    let root = payload.as_object().unwrap_or(&empty);
    let istat = root.get("istat").and_then(Value::as_object).unwrap_or(&empty);

    let mut status = ControllerStatus::new(DataSource::CgiJson);
    let text = |key: &str| istat.get(key).and_then(scalar_string).filter(|s| !s.is_empty());

    status.meta = Meta {
        hardware: text("hardware"),
        hostname: text("hostname"),
        serial: find_serial(root, istat),
        date: text("date"),
        ..Meta::new(DataSource::CgiJson)
    };
    status.probes = parse_probes(istat);
    status.outlets = parse_outlets(istat);
    status.feed = istat
        .get("feed")
        .filter(|v| !v.is_null())
        .or_else(|| root.get("feed"))
        .and_then(feed_from_value);
    status.trident = trident_from_modules(payload);
    status.raw = Some(payload.clone());
    status
}

fn serial_value(value: &Value) -> Option<String> {
    match value {
        Value::String(_) => non_empty_str(value),
        Value::Number(n) => n.as_i64().map(|n| n.to_string()),
        _ => None,
    }
}

fn find_serial(root: &Map<String, Value>, istat: &Map<String, Value>) -> Option<String> {
    let system_serial = root
        .get("system")
        .and_then(Value::as_object)
        .and_then(|system| system.get("serial"));

    ISTAT_SERIAL_KEYS
        .iter()
        .filter_map(|k| istat.get(*k))
        .chain(ROOT_SERIAL_KEYS.iter().filter_map(|k| root.get(*k)))
        .chain(system_serial)
        .find_map(serial_value)
}

/// `did` of a legacy entry; it must be a non-empty string.
fn did(item: &Map<String, Value>) -> Option<&str> {
    item.get("did")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn entries<'a>(
    istat: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    istat
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn parse_probes(istat: &Map<String, Value>) -> BTreeMap<String, Probe> {
    entries(istat, "inputs")
        .filter_map(|item| {
            let did = did(item)?;
            Some((did.to_string(), parse_probe(item, did, &KEYS)))
        })
        .collect()
}

fn parse_outlets(istat: &Map<String, Value>) -> Vec<Outlet> {
    entries(istat, "outputs")
        .filter_map(|item| Some(parse_outlet(item, did(item)?, &KEYS, &["ID"])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Feed;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "istat": {
                "hostname": "reef-apex",
                "hardware": "1.0",
                "serialNo": " AC5:12345 ",
                "date": "01/02/2024 10:11:12",
                "inputs": [
                    {"did": "2_0", "name": "Tmp", "type": "Temp", "value": 25.4},
                    {"did": "base_pH", "name": "pH", "type": "pH", "value": "8.1",
                     "module": {"abaddr": 9}},
                    {"did": "base_ORP", "name": "ORP", "abAddr": 3, "hwType": "pm3"},
                    {"did": 7, "name": "numeric did"},
                    {"name": "no did"}
                ],
                "outputs": [
                    {"did": "2_1", "name": "Return", "ID": 1, "status": ["AON", "", "OK", ""],
                     "type": "outlet", "gid": "g1", "intensity": 100},
                    {"did": "", "name": "Blank"}
                ],
                "feed": {"name": 2, "active": 1}
            }
        })
    }

    #[test]
    fn meta_from_istat() {
        let status = parse_status_cgi_json(&sample());
        assert_eq!(status.meta.source, DataSource::CgiJson);
        assert_eq!(status.meta.hostname.as_deref(), Some("reef-apex"));
        assert_eq!(status.meta.hardware.as_deref(), Some("1.0"));
        assert_eq!(status.meta.serial.as_deref(), Some("AC5:12345"));
        assert_eq!(status.meta.date.as_deref(), Some("01/02/2024 10:11:12"));
        assert_eq!(status.meta.software, None);
        assert_eq!(status.meta.timezone, None);
        assert_eq!(status.meta.device_type, None);
    }

    #[test]
    fn probes_need_string_did() {
        let status = parse_status_cgi_json(&sample());
        assert_eq!(status.probes.len(), 3);
        assert_eq!(status.probes["2_0"].module_abaddr, Some(2));
        // No nested `module` lookup on this endpoint.
        assert_eq!(status.probes["base_pH"].module_abaddr, None);
        assert_eq!(status.probes["base_pH"].value, Some(8.1));
        assert_eq!(status.probes["base_ORP"].module_abaddr, Some(3));
        assert_eq!(status.probes["base_ORP"].module_hwtype.as_deref(), Some("PM3"));
    }

    #[test]
    fn outlets_and_feed() {
        let status = parse_status_cgi_json(&sample());
        assert_eq!(status.outlets.len(), 1);
        let o = &status.outlets[0];
        assert_eq!(o.device_id, "2_1");
        assert_eq!(o.output_id.as_deref(), Some("1"));
        assert_eq!(o.gid.as_deref(), Some("g1"));
        assert_eq!(o.intensity, Some(100));
        assert_eq!(o.module_abaddr, Some(2));

        assert_eq!(
            status.feed,
            Some(Feed {
                id: Some(2),
                active: Some(true)
            })
        );
    }

    #[test]
    fn serial_fallback_order() {
        let root_serial = json!({"istat": {"serial": "  "}, "serialNo": 42});
        assert_eq!(
            parse_status_cgi_json(&root_serial).meta.serial.as_deref(),
            Some("42")
        );

        let system_serial = json!({"istat": {}, "system": {"serial": "SYS-1"}});
        assert_eq!(
            parse_status_cgi_json(&system_serial).meta.serial.as_deref(),
            Some("SYS-1")
        );

        let none = json!({"istat": {"serial": true}, "serial": 4.5});
        assert_eq!(parse_status_cgi_json(&none).meta.serial, None);
    }

    #[test]
    fn top_level_feed_fallback() {
        let payload = json!({"istat": {}, "feed": 0});
        assert_eq!(
            parse_status_cgi_json(&payload).feed,
            Some(Feed {
                id: Some(0),
                active: Some(false)
            })
        );
        // Lists are not a feed shape on this endpoint.
        let payload = json!({"istat": {"feed": [{"id": 1, "active": true}]}});
        assert_eq!(parse_status_cgi_json(&payload).feed, None);
    }

    #[test]
    fn trident_from_istat_modules() {
        let payload = json!({"istat": {"modules": [
            {"hwtype": "TNP", "abaddr": 6, "extra": {"status": "idle", "levels": [10, 1, 2, 3]}}
        ]}});
        let status = parse_status_cgi_json(&payload);
        assert_eq!(status.trident_abaddr(), Some(6));
        assert_eq!(status.trident.status.as_deref(), Some("Idle"));
    }

    #[test]
    fn missing_istat_is_empty_record() {
        let status = parse_status_cgi_json(&json!({"other": 1}));
        assert!(status.probes.is_empty());
        assert!(status.outlets.is_empty());
        assert_eq!(status.meta.hostname, None);
        assert!(status.raw.is_some());
    }
}
