// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pieces shared by the JSON normalizers.

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::extract::{
    first_present, module_abaddr_from_did, non_empty_str, scalar_string, to_bool, to_int,
    to_number,
};
use crate::status::{Feed, Outlet, Probe};

/// Parses a JSON body whose root must be an object. An empty body is an
/// empty object.
pub(crate) fn json_object(text: &str) -> Result<Value, ParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_str(text)?;
    super::ensure_object(&value)?;
    Ok(value)
}

/// Key spellings used to find the owning module of a probe or outlet.
pub(crate) struct ModuleKeys {
    pub abaddr: &'static [&'static str],
    pub hwtype: &'static [&'static str],
    /// Also look inside a nested `module` object.
    pub nested: bool,
}

/// First non-blank string among `keys`, then the first integer.
pub(crate) fn coerce_id(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find_map(non_empty_str)
        .or_else(|| {
            keys.iter()
                .filter_map(|k| item.get(*k))
                .find_map(|v| v.as_i64().map(|n| n.to_string()))
        })
}

fn nested_module(item: &Map<String, Value>) -> Option<&Map<String, Value>> {
    item.get("module").and_then(Value::as_object)
}

pub(crate) fn module_abaddr(item: &Map<String, Value>, did: &str, keys: &ModuleKeys) -> Option<i64> {
    first_present(item, keys.abaddr)
        .or_else(|| {
            keys.nested
                .then(|| nested_module(item))
                .flatten()
                .and_then(|m| first_present(m, &["abaddr", "abAddr"]))
        })
        .and_then(Value::as_i64)
        .or_else(|| module_abaddr_from_did(did))
}

pub(crate) fn module_hwtype(item: &Map<String, Value>, keys: &ModuleKeys) -> Option<String> {
    first_present(item, keys.hwtype)
        .or_else(|| {
            keys.nested
                .then(|| nested_module(item))
                .flatten()
                .and_then(|m| first_present(m, &["hwtype", "hwType"]))
        })
        .and_then(non_empty_str)
        .map(|t| t.to_uppercase())
}

pub(crate) fn parse_probe(item: &Map<String, Value>, did: &str, keys: &ModuleKeys) -> Probe {
    let value = item.get("value");
    Probe {
        name: item
            .get("name")
            .and_then(scalar_string)
            .unwrap_or_else(|| did.to_string()),
        probe_type: item.get("type").and_then(scalar_string),
        value_raw: value.and_then(scalar_string),
        value: value.and_then(to_number),
        module_abaddr: module_abaddr(item, did, keys),
        module_hwtype: module_hwtype(item, keys),
    }
}

pub(crate) fn parse_outlet(
    item: &Map<String, Value>,
    did: &str,
    keys: &ModuleKeys,
    output_id_keys: &[&str],
) -> Outlet {
    let status = item.get("status").and_then(Value::as_array);
    let name = item
        .get("name")
        .and_then(scalar_string)
        .unwrap_or_else(|| did.to_string());

    Outlet {
        output_id: first_present(item, output_id_keys).and_then(scalar_string),
        state: status
            .and_then(|s| s.first())
            .and_then(scalar_string),
        output_type: item.get("type").and_then(non_empty_str),
        gid: item.get("gid").and_then(non_empty_str),
        intensity: item
            .get("intensity")
            .and_then(to_int)
            .and_then(|n| u8::try_from(n).ok())
            .filter(|n| *n <= 100),
        module_abaddr: module_abaddr(item, did, keys),
        module_hwtype: module_hwtype(item, keys),
        status: status.cloned(),
        ..Outlet::new(did, name)
    }
}

/// Feed state from a scalar id or a single feed object.
///
/// Returns `None` for any other shape, including lists.
pub(crate) fn feed_from_value(value: &Value) -> Option<Feed> {
    match value {
        Value::Number(_) | Value::String(_) => {
            let id = to_int(value)?;
            Some(Feed {
                id: Some(id),
                active: Some(id != 0),
            })
        }
        Value::Object(feed) => {
            let id = first_present(feed, &["name", "id", "sel"]).and_then(to_int);
            let active = feed
                .get("active")
                .and_then(to_bool_or_flag)
                .or_else(|| id.map(|n| (1..=4).contains(&n)));
            Some(Feed { id, active })
        }
        _ => None,
    }
}

/// Feed state from a list of feed objects: the first running one wins.
pub(crate) fn feed_from_list(items: &[Value]) -> Feed {
    let active_id = items
        .iter()
        .filter_map(Value::as_object)
        .find(|item| {
            first_present(item, &["active", "running"])
                .and_then(to_bool_or_flag)
                .unwrap_or(false)
        })
        .and_then(|item| first_present(item, &["name", "id"]).and_then(to_int));

    Feed {
        id: Some(active_id.unwrap_or(0)),
        active: Some(active_id.is_some_and(|n| n != 0)),
    }
}

/// A boolean, or an integer where only `1` means true.
fn to_bool_or_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        other => to_int(other).map(|n| n == 1),
    }
}

/// Boolean network flag (`dhcp`, `wifiEnable`).
pub(crate) fn flag(map: &Map<String, Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(to_bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEYS: ModuleKeys = ModuleKeys {
        abaddr: &["module_abaddr", "abaddr", "abAddr"],
        hwtype: &["module_hwtype", "hwtype", "hwType"],
        nested: true,
    };

    fn obj(v: &Value) -> &Map<String, Value> {
        v.as_object().unwrap()
    }

    #[test]
    fn json_object_rules() {
        assert_eq!(json_object("").unwrap(), json!({}));
        assert_eq!(json_object(" {\"a\": 1} ").unwrap(), json!({"a": 1}));
        assert!(matches!(
            json_object("[1, 2]"),
            Err(ParseError::UnexpectedFormat(_))
        ));
        assert!(matches!(json_object("{nope"), Err(ParseError::Json(_))));
    }

    #[test]
    fn ids_prefer_strings_then_integers() {
        let item = json!({"did": " ", "device_id": 7, "id": "X1"});
        assert_eq!(coerce_id(obj(&item), &["did", "device_id", "id"]), Some("X1".to_string()));
        let item = json!({"did": "", "id": 123});
        assert_eq!(coerce_id(obj(&item), &["did", "id"]), Some("123".to_string()));
        let item = json!({"did": true});
        assert_eq!(coerce_id(obj(&item), &["did"]), None);
    }

    #[test]
    fn module_address_sources() {
        let explicit = json!({"abAddr": 4});
        assert_eq!(module_abaddr(obj(&explicit), "9_I1", &KEYS), Some(4));

        let nested = json!({"module": {"abaddr": 6, "hwType": "pm2"}});
        assert_eq!(module_abaddr(obj(&nested), "9_I1", &KEYS), Some(6));
        assert_eq!(module_hwtype(obj(&nested), &KEYS), Some("PM2".to_string()));

        let from_did = json!({});
        assert_eq!(module_abaddr(obj(&from_did), "5_I1", &KEYS), Some(5));
        assert_eq!(module_abaddr(obj(&from_did), "Tmp", &KEYS), None);

        let flat = ModuleKeys {
            nested: false,
            ..KEYS
        };
        assert_eq!(module_abaddr(obj(&nested), "Tmp", &flat), None);
    }

    #[test]
    fn probe_values() {
        let item = json!({"did": "T1", "name": "Tmp", "type": "Temp", "value": " 25.5 "});
        let probe = parse_probe(obj(&item), "T1", &KEYS);
        assert_eq!(probe.value_raw.as_deref(), Some("25.5"));
        assert_eq!(probe.value, Some(25.5));
        assert_eq!(probe.probe_type.as_deref(), Some("Temp"));

        let item = json!({"value": 7.25});
        let probe = parse_probe(obj(&item), "4_0", &KEYS);
        assert_eq!(probe.name, "4_0");
        assert_eq!(probe.value_raw.as_deref(), Some("7.25"));
        assert_eq!(probe.module_abaddr, Some(4));

        let item = json!({"value": "n/a"});
        let probe = parse_probe(obj(&item), "T2", &KEYS);
        assert_eq!(probe.value_raw.as_deref(), Some("n/a"));
        assert_eq!(probe.value, None);
    }

    #[test]
    fn outlet_fields() {
        let item = json!({
            "did": "2_1", "name": "Return", "ID": 3, "status": ["AON", "", "OK", ""],
            "type": "outlet", "gid": "", "intensity": "55"
        });
        let outlet = parse_outlet(obj(&item), "2_1", &KEYS, &["ID", "output_id"]);
        assert_eq!(outlet.output_id.as_deref(), Some("3"));
        assert_eq!(outlet.state.as_deref(), Some("AON"));
        assert_eq!(outlet.gid, None);
        assert_eq!(outlet.intensity, Some(55));
        assert_eq!(outlet.module_abaddr, Some(2));
        assert_eq!(outlet.status.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn outlet_intensity_is_conservative() {
        for (raw, expected) in [
            (json!(40), Some(40)),
            (json!(40.0), Some(40)),
            (json!(40.5), None),
            (json!(true), None),
            (json!("x"), None),
            (json!(140), None),
            (json!(-1), None),
        ] {
            let item = json!({"intensity": raw});
            let outlet = parse_outlet(obj(&item), "O1", &KEYS, &["ID"]);
            assert_eq!(outlet.intensity, expected, "{raw}");
        }
    }

    #[test]
    fn outlet_state_needs_list_status() {
        let item = json!({"status": "AON"});
        let outlet = parse_outlet(obj(&item), "O1", &KEYS, &["ID"]);
        assert_eq!(outlet.state, None);
        assert_eq!(outlet.status, None);

        let item = json!({"status": [null, "x"]});
        let outlet = parse_outlet(obj(&item), "O1", &KEYS, &["ID"]);
        assert_eq!(outlet.state, None);
    }

    #[test]
    fn feed_scalar_and_object() {
        assert_eq!(
            feed_from_value(&json!(2)),
            Some(Feed { id: Some(2), active: Some(true) })
        );
        assert_eq!(
            feed_from_value(&json!("0")),
            Some(Feed { id: Some(0), active: Some(false) })
        );
        assert_eq!(feed_from_value(&json!("x")), None);
        assert_eq!(
            feed_from_value(&json!({"name": 3, "active": 0})),
            Some(Feed { id: Some(3), active: Some(false) })
        );
        assert_eq!(
            feed_from_value(&json!({"id": "4"})),
            Some(Feed { id: Some(4), active: Some(true) })
        );
        assert_eq!(
            feed_from_value(&json!({"sel": 5})),
            Some(Feed { id: Some(5), active: Some(false) })
        );
        assert_eq!(
            feed_from_value(&json!({})),
            Some(Feed { id: None, active: None })
        );
        assert_eq!(feed_from_value(&json!([1])), None);
    }

    #[test]
    fn feed_list_first_active_wins() {
        let items = json!([
            {"name": 1, "active": false},
            "nope",
            {"name": 2, "running": 1},
            {"name": 3, "active": true}
        ]);
        assert_eq!(
            feed_from_list(items.as_array().unwrap()),
            Feed { id: Some(2), active: Some(true) }
        );

        let idle = json!([{"name": 1, "active": 0}]);
        assert_eq!(
            feed_from_list(idle.as_array().unwrap()),
            Feed { id: Some(0), active: Some(false) }
        );
    }
}
