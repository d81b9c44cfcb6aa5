// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `/rest/status` normalizer.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::common::{
    ModuleKeys, coerce_id, feed_from_list, feed_from_value, flag, parse_outlet, parse_probe,
};
use super::trident::trident_from_modules;
use crate::extract::{
    find, find_array, find_object, first_present, non_empty_str, scalar_string, to_int,
};
use crate::status::{Alerts, ControllerStatus, DataSource, Feed, Meta, Network, Outlet, Probe};

const ID_KEYS: [&str; 4] = ["did", "device_id", "deviceID", "id"];

const PROBE_KEYS: ModuleKeys = ModuleKeys {
    abaddr: &["module_abaddr", "abaddr", "abAddr"],
    hwtype: &["module_hwtype", "hwtype", "hwType"],
    nested: true,
};

const OUTLET_KEYS: ModuleKeys = ModuleKeys {
    abaddr: &["module_abaddr", "abaddr", "abAddr", "moduleAbAddr"],
    hwtype: &["module_hwtype", "hwtype", "hwType", "moduleHwType"],
    nested: true,
};

const ALERT_LIST_KEYS: [&str; 5] = ["notifications", "alerts", "alarms", "warnings", "messages"];

static STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\b)Statement:\s*(.+)$").expect("statement pattern compiles"));

/// Normalizes a REST status payload.
///
/// Every section is optional; a payload of unexpected shape produces a record
/// whose fields are all absent. The Trident's derived fields are not computed
/// here.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::payload::rest::parse_status_rest;
/// use serde_json::json;
///
/// let status = parse_status_rest(&json!({
///     "data": {
///         "system": {"hostname": "reef", "serial": "AC5:12345"},
///         "inputs": [{"did": "2_0", "name": "Tmp", "type": "Temp", "value": 25.4}]
///     }
/// }));
/// assert_eq!(status.meta.hostname.as_deref(), Some("reef"));
/// assert_eq!(status.probes["2_0"].module_abaddr, Some(2));
/// ```
#[must_use]
pub fn parse_status_rest(payload: &Value) -> ControllerStatus {
    let empty = Map::new();
    let system = find_object(payload, "system").unwrap_or(&empty);
    let nstat = find_object(payload, "nstat").unwrap_or(&empty);

    let mut status = ControllerStatus::new(DataSource::Rest);
    status.meta = parse_meta(system, nstat);
    status.network = parse_network(nstat);
    status.probes = parse_probes(payload);
    status.outlets = parse_outlets(payload);
    status.feed = parse_feed(payload);
    status.alerts = parse_alerts(payload);
    status.trident = trident_from_modules(payload);
    status.raw = Some(payload.clone());
    status
}

fn parse_meta(system: &Map<String, Value>, nstat: &Map<String, Value>) -> Meta {
    let text = |key: &str| system.get(key).and_then(scalar_string).filter(|s| !s.is_empty());

    Meta {
        software: text("software"),
        hardware: text("hardware"),
        hostname: text("hostname").or_else(|| nstat.get("hostname").and_then(non_empty_str)),
        serial: text("serial"),
        timezone: text("timezone"),
        date: text("date"),
        device_type: text("type"),
        firmware_latest: nstat
            .get("latestFirmware")
            .and_then(scalar_string)
            .filter(|s| !s.is_empty()),
        ..Meta::new(DataSource::Rest)
    }
}

fn parse_network(nstat: &Map<String, Value>) -> Network {
    Network {
        ipaddr: nstat.get("ipaddr").and_then(non_empty_str),
        gateway: nstat.get("gateway").and_then(non_empty_str),
        netmask: nstat.get("netmask").and_then(non_empty_str),
        dhcp: flag(nstat, "dhcp"),
        wifi_enable: flag(nstat, "wifiEnable"),
        ssid: nstat.get("ssid").and_then(non_empty_str),
        strength: nstat.get("strength").and_then(to_int),
        quality: nstat.get("quality").and_then(to_int),
    }
}

/// Device id of a probe or outlet entry; `name` is the last resort.
fn device_id(item: &Map<String, Value>) -> Option<String> {
    coerce_id(item, &ID_KEYS).or_else(|| coerce_id(item, &["name"]))
}

/// The list under `primary`, else under `fallback`.
fn list<'a>(payload: &'a Value, primary: &str, fallback: &str) -> &'a [Value] {
    find_array(payload, primary)
        .or_else(|| find_array(payload, fallback))
        .map_or(&[][..], Vec::as_slice)
}

fn parse_probes(payload: &Value) -> BTreeMap<String, Probe> {
    list(payload, "inputs", "probes")
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let did = device_id(item)?;
            let probe = parse_probe(item, &did, &PROBE_KEYS);
            Some((did, probe))
        })
        .collect()
}

fn parse_outlets(payload: &Value) -> Vec<Outlet> {
    list(payload, "outputs", "outlets")
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            let did = device_id(item)?;
            Some(parse_outlet(item, &did, &OUTLET_KEYS, &["ID", "output_id"]))
        })
        .collect()
}

fn parse_feed(payload: &Value) -> Option<Feed> {
    let feed = find(payload, "feed").or_else(|| find(payload, "feeds"))?;
    match feed {
        Value::Array(items) => Some(feed_from_list(items)),
        other => feed_from_value(other),
    }
}

/// Last alert from the first non-empty alert list.
///
/// Entries that carry neither a statement nor a message let the search move
/// on to the next list.
fn parse_alerts(payload: &Value) -> Alerts {
    ALERT_LIST_KEYS
        .iter()
        .filter_map(|key| find_array(payload, key))
        .filter_map(|items| items.last())
        .find_map(alert_from_entry)
        .unwrap_or_default()
}

fn alert_from_entry(entry: &Value) -> Option<Alerts> {
    match entry {
        Value::Object(item) => {
            if let Some(statement) = first_present(item, &["statement", "Statement", "detail", "details"])
                .and_then(non_empty_str)
            {
                return Some(Alerts {
                    last_statement: Some(statement),
                    last_message: None,
                });
            }
            first_present(item, &["message", "msg", "text", "title"])
                .and_then(non_empty_str)
                .map(|msg| alert_from_message(&msg))
        }
        Value::String(s) => {
            let msg = s.trim();
            (!msg.is_empty()).then(|| alert_from_message(msg))
        }
        _ => None,
    }
}

fn alert_from_message(msg: &str) -> Alerts {
    Alerts {
        last_statement: statement_in(msg),
        last_message: Some(msg.to_string()),
    }
}

/// Text following a `Statement:` marker that starts a word.
fn statement_in(msg: &str) -> Option<String> {
    STATEMENT
        .captures(msg)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}
