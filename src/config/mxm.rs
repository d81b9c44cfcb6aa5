// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parser for the MXM module status block.
//!
//! An MXM module lists its wireless devices in `extra.status`, one per line:
//!
//! ```text
//! Nero 5(1A2B) - Rev 1 Ser #: 1234567 - OK
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{MXM_HWTYPE, MxmDevice};
use crate::extract::{first_present, objects, scalar_string};

static MXM_STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<name>[^(]+)\([^)]*\)\s*-\s*Rev\s+(?P<rev>\S+)\s+Ser\s+#:\s+(?P<serial>\S+)\s+-\s*(?P<status>.+?)\s*$",
    )
    .expect("MXM status pattern compiles")
});

/// Collects the devices of every MXM module in a `/rest/config` payload.
///
/// Lines that do not follow the expected shape are skipped.
#[must_use]
pub fn parse_mxm_devices(payload: &Value) -> BTreeMap<String, MxmDevice> {
    let mut out = BTreeMap::new();
    let Some(entries) = payload.get("mconf") else {
        return out;
    };

    for module in objects(entries) {
        let is_mxm = first_present(module, &["hwtype"])
            .and_then(scalar_string)
            .is_some_and(|t| t.eq_ignore_ascii_case(MXM_HWTYPE));
        if !is_mxm {
            continue;
        }
        let Some(text) = module
            .get("extra")
            .and_then(|e| e.get("status"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        out.extend(text.lines().filter_map(parse_mxm_line));
    }

    out
}

/// Parses one `<name>(<id>) - Rev <rev> Ser #: <serial> - <status>` line.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::config::parse_mxm_line;
///
/// let (name, device) = parse_mxm_line("Nero 5(abc) - Rev 1 Ser #: S123 - OK").unwrap();
/// assert_eq!(name, "Nero 5");
/// assert_eq!(device.serial, "S123");
/// assert!(parse_mxm_line("(no match)").is_none());
/// ```
#[must_use]
pub fn parse_mxm_line(line: &str) -> Option<(String, MxmDevice)> {
    let caps = MXM_STATUS_LINE.captures(line)?;
    let name = caps["name"].trim();
    if name.is_empty() {
        return None;
    }

    Some((
        name.to_string(),
        MxmDevice {
            rev: caps["rev"].to_string(),
            serial: caps["serial"].to_string(),
            status: caps["status"].trim().to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_valid_line() {
        let (name, dev) = parse_mxm_line("Nero 5(x) - Rev 1 Ser #: S123 - OK").unwrap();
        assert_eq!(name, "Nero 5");
        assert_eq!(
            dev,
            MxmDevice {
                rev: "1".to_string(),
                serial: "S123".to_string(),
                status: "OK".to_string(),
            }
        );
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let (name, dev) =
            parse_mxm_line("  Gyre XF330 (3F) -Rev  2b  Ser  #:  G-99  -  Link lost  ").unwrap();
        assert_eq!(name, "Gyre XF330");
        assert_eq!(dev.rev, "2b");
        assert_eq!(dev.serial, "G-99");
        assert_eq!(dev.status, "Link lost");
    }

    #[test]
    fn status_keeps_inner_separators() {
        let (_, dev) = parse_mxm_line("Vortech(7) - Rev 4 Ser #: V1 - Link - weak ").unwrap();
        assert_eq!(dev.status, "Link - weak");
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in [
            "",
            "(no match)",
            " (x) - Rev 1 Ser #: S1 - OK",
            "Nero 5(x) - Rev 1 Ser #: S1",
            "Nero 5(x) - Rev 1 Ser #:S1 - OK",
            "Nero 5(x) Rev 1 Ser #: S1 - OK",
            "Nero 5 - Rev 1 Ser #: S1 - OK",
            "Nero 5(x - Rev 1 Ser #: S1 - OK",
        ] {
            assert!(parse_mxm_line(line).is_none(), "{line:?}");
        }
    }

    #[test]
    fn collects_devices_from_mxm_modules_only() {
        let payload = json!({"mconf": [
            "nope",
            {"hwtype": "EB832", "extra": {"status": "Nero 5(x) - Rev 1 Ser #: S1 - OK"}},
            {"hwtype": "MXM", "extra": 1},
            {"hwtype": "mxm", "extra": {"status":
                "Nero 5(abc) - Rev 1 Ser #: S123 - OK\n(no match)\nGyre(1) - Rev 3 Ser #: G7 - OK\n"}},
            {"hwtype": "MXM", "extra": {"status": " \n"}}
        ]});

        let devices = parse_mxm_devices(&payload);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices["Nero 5"].serial, "S123");
        assert_eq!(devices["Gyre"].rev, "3");
    }

    #[test]
    fn missing_mconf_yields_nothing() {
        assert!(parse_mxm_devices(&json!({"mconf": "nope"})).is_empty());
        assert!(parse_mxm_devices(&json!({})).is_empty());
    }
}
