// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outlet control modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Control mode of an outlet.
///
/// The controller reports richer state tokens (`AON`, `AOF`, `TBL`, ...) but
/// only these three modes can be written back.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::types::OutletMode;
///
/// assert_eq!(OutletMode::Auto.as_str(), "AUTO");
/// assert_eq!("on".parse::<OutletMode>().unwrap(), OutletMode::On);
/// assert!("dim".parse::<OutletMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutletMode {
    /// Program-controlled.
    Auto,
    /// Forced on.
    On,
    /// Forced off.
    Off,
}

impl OutletMode {
    /// Returns the token sent in the outlet status array.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    /// Derives the mode from a reported state token.
    ///
    /// `AON`, `AOF` and `TBL` are program-controlled states; any other token
    /// is read as a manual override according to [`is_energized_state`].
    #[must_use]
    pub fn from_state(state: &str) -> Self {
        if is_auto_state(state) {
            Self::Auto
        } else if is_energized_state(state) {
            Self::On
        } else {
            Self::Off
        }
    }
}

impl fmt::Display for OutletMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutletMode {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "ON" => Ok(Self::On),
            "OFF" => Ok(Self::Off),
            _ => Err(ValueError::InvalidOutletMode(s.to_string())),
        }
    }
}

/// Whether a state token means the outlet follows its program.
#[must_use]
pub fn is_auto_state(state: &str) -> bool {
    matches!(state.trim().to_uppercase().as_str(), "AON" | "AOF" | "TBL")
}

/// Whether a state token means the outlet is currently powered.
///
/// `TBL` (table-driven) outputs count as energized.
#[must_use]
pub fn is_energized_state(state: &str) -> bool {
    matches!(state.trim().to_uppercase().as_str(), "AON" | "ON" | "TBL")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlet_mode_as_str() {
        assert_eq!(OutletMode::Auto.as_str(), "AUTO");
        assert_eq!(OutletMode::On.as_str(), "ON");
        assert_eq!(OutletMode::Off.as_str(), "OFF");
        assert_eq!(OutletMode::Off.to_string(), "OFF");
    }

    #[test]
    fn outlet_mode_from_str() {
        assert_eq!(" auto ".parse::<OutletMode>().unwrap(), OutletMode::Auto);
        assert_eq!("Off".parse::<OutletMode>().unwrap(), OutletMode::Off);
        assert_eq!(
            "TOGGLE".parse::<OutletMode>().unwrap_err(),
            ValueError::InvalidOutletMode("TOGGLE".to_string())
        );
    }

    #[test]
    fn mode_from_state_tokens() {
        assert_eq!(OutletMode::from_state("AON"), OutletMode::Auto);
        assert_eq!(OutletMode::from_state("aof"), OutletMode::Auto);
        assert_eq!(OutletMode::from_state("TBL"), OutletMode::Auto);
        assert_eq!(OutletMode::from_state("ON"), OutletMode::On);
        assert_eq!(OutletMode::from_state("OFF"), OutletMode::Off);
        assert_eq!(OutletMode::from_state(""), OutletMode::Off);
    }

    #[test]
    fn energized_states() {
        assert!(is_energized_state("AON"));
        assert!(is_energized_state("TBL"));
        assert!(is_energized_state(" on "));
        assert!(!is_energized_state("AOF"));
        assert!(!is_energized_state("OFF"));
    }

    #[test]
    fn serde_uses_uppercase_tokens() {
        let json = serde_json::to_string(&OutletMode::Auto).unwrap();
        assert_eq!(json, "\"AUTO\"");
    }
}
