// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trident consumable control values.

use std::fmt;

use crate::error::ValueError;

/// Reagent bottle on a Trident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReagentSlot {
    /// Reagent A.
    A,
    /// Reagent B.
    B,
    /// Reagent C.
    C,
}

impl ReagentSlot {
    /// All slots in order.
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    /// Position in the `newReagent` flag list.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }

    /// One-hot `newReagent` flags selecting this slot.
    #[must_use]
    pub fn reset_flags(&self) -> [bool; 3] {
        let mut flags = [false; 3];
        flags[self.index()] = true;
        flags
    }
}

impl fmt::Display for ReagentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
        };
        write!(f, "Reagent {letter}")
    }
}

/// Waste container capacity in millilitres.
///
/// # Examples
///
/// ```
/// use apex_fusion_lib::types::WasteSize;
///
/// let size = WasteSize::new(450.0).unwrap();
/// assert_eq!(size.ml(), 450.0);
/// assert!(WasteSize::new(0.0).is_err());
/// assert!(WasteSize::new(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WasteSize(f64);

impl WasteSize {
    /// Creates a waste size.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidWasteSize` unless `ml` is finite and > 0.
    pub fn new(ml: f64) -> Result<Self, ValueError> {
        if ml.is_finite() && ml > 0.0 {
            Ok(Self(ml))
        } else {
            Err(ValueError::InvalidWasteSize(ml))
        }
    }

    /// Capacity in millilitres.
    #[must_use]
    pub const fn ml(&self) -> f64 {
        self.0
    }
}

/// Pump channel that can be primed (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimeChannel(u8);

impl PrimeChannel {
    /// Number of prime channels.
    pub const COUNT: u8 = 4;

    /// Creates a prime channel.
    ///
    /// # Errors
    ///
    /// Returns `ValueError::InvalidPrimeChannel` for channels above 3.
    pub fn new(channel: u8) -> Result<Self, ValueError> {
        if channel < Self::COUNT {
            Ok(Self(channel))
        } else {
            Err(ValueError::InvalidPrimeChannel(channel))
        }
    }

    /// Channel index.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.0
    }

    /// One-hot `prime` flags selecting this channel.
    #[must_use]
    pub fn prime_flags(&self) -> [bool; 4] {
        let mut flags = [false; 4];
        flags[usize::from(self.0)] = true;
        flags
    }
}
