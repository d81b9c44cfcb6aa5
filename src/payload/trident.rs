// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trident detection in a status payload's `modules` list.

use serde_json::{Map, Value};

use crate::config::TRIDENT_HWTYPES;
use crate::extract::{find_array, first_present, module_hwtype, scalar_string, to_number, to_percent};
use crate::status::Trident;

/// Builds the raw Trident fields from the first `TRI`/`TNP` module that
/// carries an `extra` object. Derived fields are left to
/// [`Trident::finalize`].
pub(crate) fn trident_from_modules(payload: &Value) -> Trident {
    let Some(modules) = find_array(payload, "modules") else {
        return Trident::default();
    };

    modules
        .iter()
        .filter_map(Value::as_object)
        .find_map(|module| {
            let extra = module.get("extra").and_then(Value::as_object)?;
            let hwtype = module_hwtype(module)?;
            TRIDENT_HWTYPES
                .contains(&hwtype.as_str())
                .then(|| trident_from_module(module, extra, hwtype))
        })
        .unwrap_or_default()
}

fn trident_from_module(module: &Map<String, Value>, extra: &Map<String, Value>, hwtype: String) -> Trident {
    let text = |keys: &[&str]| first_present(module, keys).and_then(scalar_string);

    let status = extra
        .get("status")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_status_text);
    let consumables = consumables(extra);

    Trident {
        present: module.get("present").and_then(Value::as_bool).unwrap_or(true),
        abaddr: module.get("abaddr").and_then(Value::as_i64),
        hwrev: text(&["hwrev", "hwRev", "hw_version", "hwVersion", "rev"]),
        swrev: text(&["software", "swrev", "swRev", "sw_version", "swVersion"]),
        serial: text(&["serial", "serialNo", "serialNO", "serial_number"]),
        is_testing: status
            .as_deref()
            .map(|s| s.to_lowercase().contains("testing")),
        status,
        levels_ml: extra.get("levels").and_then(parse_levels),
        reagent_a_remaining: consumables.reagent_a,
        reagent_b_remaining: consumables.reagent_b,
        reagent_c_remaining: consumables.reagent_c,
        waste_container_level: consumables.waste,
        hwtype: Some(hwtype),
        ..Trident::default()
    }
}

/// Numeric readings of a `levels` list. Nulls, booleans and non-numeric
/// strings are skipped; an empty result is `None`.
fn parse_levels(value: &Value) -> Option<Vec<f64>> {
    let levels: Vec<f64> = value
        .as_array()?
        .iter()
        .filter(|v| !v.is_boolean())
        .filter_map(to_number)
        .collect();
    (!levels.is_empty()).then_some(levels)
}

/// Tidies the free-text Trident status for display.
///
/// A leading `testing` is capitalized. Purely alphabetic text is turned into
/// `Capitalized` form unless it is a short all-caps code such as `OK`.
///
/// ```text
/// "testing Alk" -> "Testing Alk"
/// "IDLE"        -> "Idle"
/// "OK"          -> "OK"
/// ```
pub(crate) fn normalize_status_text(status: &str) -> String {
    let mut out = match status.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("testing") => {
            format!("Testing{}", &status[7..])
        }
        _ => status.to_string(),
    };

    if !out.is_empty() && out.chars().all(char::is_alphabetic) {
        let is_upper = out.chars().any(char::is_uppercase) && !out.chars().any(char::is_lowercase);
        if !(is_upper && out.chars().count() <= 3) {
            out = capitalize(&out);
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[derive(Debug, Default, PartialEq)]
struct Consumables {
    reagent_a: Option<u8>,
    reagent_b: Option<u8>,
    reagent_c: Option<u8>,
    waste: Option<u8>,
}

const REAGENT_A_TOKENS: [&str; 5] = ["reagenta", "reagent_a", "reagent1", "reagent_1", "reagent-1"];
const REAGENT_B_TOKENS: [&str; 5] = ["reagentb", "reagent_b", "reagent2", "reagent_2", "reagent-2"];
const REAGENT_C_TOKENS: [&str; 5] = ["reagentc", "reagent_c", "reagent3", "reagent_3", "reagent-3"];
const WASTE_LEVEL_TOKENS: [&str; 3] = ["level", "pct", "percent"];

/// Reagent and waste percentages.
///
/// A `reagents` list with at least three entries supplies A, B and C
/// directly. Otherwise, and for anything the list left open, nested keys are
/// flattened (`a: {b: 1}` becomes `a_b`) and matched by name.
fn consumables(extra: &Map<String, Value>) -> Consumables {
    let mut out = Consumables::default();

    if let Some(reagents) = extra.get("reagents").and_then(Value::as_array)
        && reagents.len() >= 3
    {
        out.reagent_a = to_percent(&reagents[0]);
        out.reagent_b = to_percent(&reagents[1]);
        out.reagent_c = to_percent(&reagents[2]);
    }

    let mut flat = Vec::new();
    flatten(extra, "", &mut flat);

    for (key, value) in flat {
        let Some(pct) = to_percent(value) else {
            continue;
        };
        let k = key.trim().to_lowercase().replace(' ', "_");
        let has = |tokens: &[&str]| tokens.iter().any(|t| k.contains(t));

        if k.contains("reagent") {
            let slot = if out.reagent_a.is_none() && has(&REAGENT_A_TOKENS) {
                Some(&mut out.reagent_a)
            } else if out.reagent_b.is_none() && has(&REAGENT_B_TOKENS) {
                Some(&mut out.reagent_b)
            } else if out.reagent_c.is_none() && has(&REAGENT_C_TOKENS) {
                Some(&mut out.reagent_c)
            } else {
                None
            };
            if let Some(slot) = slot {
                *slot = Some(pct);
                continue;
            }
        }

        if out.waste.is_none() && k.contains("waste") && has(&WASTE_LEVEL_TOKENS) {
            out.waste = Some(pct);
        }
    }

    out
}

fn flatten<'a>(map: &'a Map<String, Value>, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
    for (k, v) in map {
        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}_{k}")
        };
        match v {
            Value::Object(inner) => flatten(inner, &key, out),
            leaf => out.push((key, leaf)),
        }
    }
}
