// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema-tolerant extraction helpers.
//!
//! Controllers nest their status payloads inconsistently across firmware
//! versions: the same key may sit at the top level or one level down under
//! `data`, `status`, `istat`, `systat` or `result`. The helpers here look in
//! all of those places and never fail: anything that does not have the
//! expected shape is simply treated as absent.
//!
//! # Examples
//!
//! ```
//! use apex_fusion_lib::extract::find;
//! use serde_json::json;
//!
//! let payload = json!({"istat": {"hostname": "apex"}});
//! assert_eq!(find(&payload, "hostname"), Some(&json!("apex")));
//! assert_eq!(find(&payload, "serial"), None);
//! ```

mod coerce;

pub use coerce::{
    first_present, non_empty_str, objects, scalar_string, to_bool, to_int, to_number, to_percent,
};
pub(crate) use coerce::parse_number;

use serde_json::{Map, Value};

/// Container keys checked, in order, when a key is not found at the top level.
pub const CONTAINER_KEYS: [&str; 5] = ["data", "status", "istat", "systat", "result"];

/// Looks up `key` at the top level of `payload`, then inside each of the
/// [`CONTAINER_KEYS`] whose value is an object.
///
/// Null values count as absent. Non-object payloads and containers are
/// skipped rather than treated as errors.
#[must_use]
pub fn find<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    let root = payload.as_object()?;

    if let Some(direct) = root.get(key).filter(|v| !v.is_null()) {
        return Some(direct);
    }

    CONTAINER_KEYS.iter().find_map(|container_key| {
        root.get(*container_key)
            .and_then(Value::as_object)
            .and_then(|container| container.get(key))
            .filter(|v| !v.is_null())
    })
}

/// Like [`find`], but only returns objects.
#[must_use]
pub fn find_object<'a>(payload: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    find(payload, key).and_then(Value::as_object)
}

/// Like [`find`], but only returns arrays.
#[must_use]
pub fn find_array<'a>(payload: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    find(payload, key).and_then(Value::as_array)
}

/// Extracts the Aquabus module address from a device id like `5_I1` or `4_0`.
///
/// Returns `None` unless the id starts with one or more digits followed by `_`.
#[must_use]
pub fn module_abaddr_from_did(did: &str) -> Option<i64> {
    let (prefix, _) = did.trim().split_once('_')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

/// Returns the object entries of the payload's `modules` list.
#[must_use]
pub fn modules_from_raw(raw: &Value) -> Vec<&Map<String, Value>> {
    find(raw, "modules").map(objects).unwrap_or_default()
}

/// Returns `false` only when a module is explicitly marked `"present": false`.
#[must_use]
pub fn module_is_present(module: &Map<String, Value>) -> bool {
    module
        .get("present")
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

/// Iterates over the modules that are not explicitly marked absent.
pub fn iter_present_modules<'a, I>(modules: I) -> impl Iterator<Item = &'a Map<String, Value>>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    modules.into_iter().filter(|m| module_is_present(m))
}

/// Normalized hardware-type token of a module (`hwtype`, `hwType` or `type`).
#[must_use]
pub fn module_hwtype(module: &Map<String, Value>) -> Option<String> {
    first_present(module, &["hwtype", "hwType", "type"])
        .and_then(scalar_string)
        .map(|t| t.to_uppercase())
}
