// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Feed-cycle identifiers.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// One of the four feed timers (A-D).
///
/// The REST API addresses cycles by number (1-4), the legacy CGI form by a
/// zero-based selector.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::types::FeedCycle;
///
/// let cycle = FeedCycle::new(2).unwrap();
/// assert_eq!(cycle, FeedCycle::B);
/// assert_eq!(cycle.id(), 2);
/// assert_eq!(cycle.cgi_selector(), 1);
/// assert!(FeedCycle::new(5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedCycle {
    /// Feed A.
    A,
    /// Feed B.
    B,
    /// Feed C.
    C,
    /// Feed D.
    D,
}

impl FeedCycle {
    /// CGI selector value that cancels any running cycle.
    pub const CGI_CANCEL_SELECTOR: u8 = 5;

    /// All cycles in order.
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Creates a cycle from its REST id (1-4).
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidFeedCycle` for ids outside 1-4.
    pub fn new(id: u8) -> Result<Self, ValueError> {
        match id {
            1 => Ok(Self::A),
            2 => Ok(Self::B),
            3 => Ok(Self::C),
            4 => Ok(Self::D),
            other => Err(ValueError::InvalidFeedCycle(other)),
        }
    }

    /// REST id (1-4).
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::A => 1,
            Self::B => 2,
            Self::C => 3,
            Self::D => 4,
        }
    }

    /// `FeedSel` value for `/cgi-bin/status.cgi` (0-3).
    #[must_use]
    pub const fn cgi_selector(&self) -> u8 {
        self.id() - 1
    }

    /// Letter shown on the controller display.
    #[must_use]
    pub const fn letter(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }
}

impl fmt::Display for FeedCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feed {}", self.letter())
    }
}

impl FromStr for FeedCycle {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let t = t
            .strip_prefix("Feed ")
            .or_else(|| t.strip_prefix("feed "))
            .unwrap_or(t)
            .trim();
        match t.to_uppercase().as_str() {
            "A" | "1" => Ok(Self::A),
            "B" | "2" => Ok(Self::B),
            "C" | "3" => Ok(Self::C),
            "D" | "4" => Ok(Self::D),
            _ => Err(ValueError::InvalidFeedCycle(t.parse().unwrap_or(0))),
        }
    }
}
