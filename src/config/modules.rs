// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Aquabus module resolution by bus address.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::extract::{iter_present_modules, module_hwtype, modules_from_raw, non_empty_str};
use crate::status::ControllerStatus;

/// Where a module candidate was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// The `modules` list of the status payload.
    Status,
    /// The cached `mconf` configuration.
    Config,
    /// The detected Trident.
    Trident,
}

/// Best-known description of the module at one bus address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate {
    /// Aquabus address.
    pub abaddr: i64,
    /// Uppercase hardware type, when known.
    pub hwtype: Option<String>,
    /// Module name, when known.
    pub name: Option<String>,
    /// Origin of this entry.
    pub source: CandidateSource,
}

/// Merges every known module into one entry per bus address.
///
/// Sources are visited in a fixed order: the status payload's `modules`
/// list, the cached `mconf`, then the Trident when `include_trident` is set.
/// The first entry for an address wins, unless it has no hardware type and a
/// later one does. Entries marked `"present": false` or without an integer
/// address are ignored.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::config::best_module_candidates;
/// use apex_fusion_lib::status::{ControllerStatus, DataSource};
/// use serde_json::json;
///
/// let mut status = ControllerStatus::new(DataSource::Rest);
/// status.raw = Some(json!({"modules": [
///     {"abaddr": 3},
///     {"abaddr": 3, "hwtype": "eb832"},
///     {"abaddr": 4, "hwtype": "FMM", "present": false}
/// ]}));
///
/// let modules = best_module_candidates(&status, true);
/// assert_eq!(modules[&3].hwtype.as_deref(), Some("EB832"));
/// assert!(!modules.contains_key(&4));
/// ```
#[must_use]
pub fn best_module_candidates(
    status: &ControllerStatus,
    include_trident: bool,
) -> BTreeMap<i64, ModuleCandidate> {
    let mut out = BTreeMap::new();

    if let Some(raw) = &status.raw {
        for module in iter_present_modules(modules_from_raw(raw)) {
            let Some(abaddr) = module.get("abaddr").and_then(Value::as_i64) else {
                continue;
            };
            add_candidate(
                &mut out,
                ModuleCandidate {
                    abaddr,
                    hwtype: module_hwtype(module),
                    name: module.get("name").and_then(non_empty_str),
                    source: CandidateSource::Status,
                },
            );
        }
    }

    for module in status.config.mconf.iter().flatten() {
        let Some(abaddr) = module.abaddr else {
            continue;
        };
        add_candidate(
            &mut out,
            ModuleCandidate {
                abaddr,
                hwtype: Some(module.hwtype.clone()).filter(|t| !t.is_empty()),
                name: module.name.clone(),
                source: CandidateSource::Config,
            },
        );
    }

    if include_trident && let Some(abaddr) = status.trident_abaddr() {
        add_candidate(
            &mut out,
            ModuleCandidate {
                abaddr,
                hwtype: Some(
                    status
                        .trident
                        .hwtype
                        .clone()
                        .unwrap_or_else(|| "TRI".to_string()),
                ),
                name: Some("Trident".to_string()),
                source: CandidateSource::Trident,
            },
        );
    }

    out
}

fn add_candidate(out: &mut BTreeMap<i64, ModuleCandidate>, candidate: ModuleCandidate) {
    match out.get(&candidate.abaddr) {
        Some(current) if current.hwtype.is_some() || candidate.hwtype.is_none() => {}
        _ => {
            out.insert(candidate.abaddr, candidate);
        }
    }
}
