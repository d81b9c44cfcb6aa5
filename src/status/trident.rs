// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Trident reagent-tester state and derived consumable values.
//!
//! The controller reports container levels as a bare list of millilitre
//! readings. [`Trident::finalize`] turns that list, together with the waste
//! container size from the module configuration, into the per-container
//! values consumers actually display.

use serde::{Deserialize, Serialize};

/// Remaining waste capacity (mL) at or below which the container is full.
pub const WASTE_FULL_MARGIN_ML: f64 = 20.0;

/// Remaining reagent volume (mL) at or below which a bottle is empty.
pub const REAGENT_EMPTY_THRESHOLD_ML: f64 = 20.0;

/// Trident section of a [`ControllerStatus`](super::ControllerStatus).
///
/// Normalizers fill the raw fields; the derived fields are recomputed by
/// [`finalize`](Self::finalize) every time and never read back as input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trident {
    /// A Trident module was found and is not marked absent.
    pub present: bool,
    /// Aquabus address of the module.
    pub abaddr: Option<i64>,
    /// Hardware type token (`TRI` or `TNP`).
    pub hwtype: Option<String>,
    /// Hardware revision.
    pub hwrev: Option<String>,
    /// Software revision.
    pub swrev: Option<String>,
    /// Module serial number.
    pub serial: Option<String>,
    /// Normalized status text, e.g. `Testing Alk`.
    pub status: Option<String>,
    /// Whether a test is running.
    pub is_testing: Option<bool>,
    /// Raw container readings in mL; index 0 is waste used.
    pub levels_ml: Option<Vec<f64>>,

    /// Reagent A remaining, as reported in percent.
    pub reagent_a_remaining: Option<u8>,
    /// Reagent B remaining, as reported in percent.
    pub reagent_b_remaining: Option<u8>,
    /// Reagent C remaining, as reported in percent.
    pub reagent_c_remaining: Option<u8>,
    /// Waste container level, as reported in percent.
    pub waste_container_level: Option<u8>,

    /// Waste container capacity in mL (only kept when > 0).
    pub waste_size_ml: Option<f64>,
    /// Waste volume used in mL.
    pub waste_used_ml: Option<f64>,
    /// Waste capacity left in mL, within `0..=waste_size_ml`.
    pub waste_remaining_ml: Option<f64>,
    /// `100 * used / size`.
    pub waste_percent: Option<f64>,
    /// Remaining capacity is at most [`WASTE_FULL_MARGIN_ML`].
    pub waste_full: Option<bool>,
    /// Reagent A volume in mL.
    pub reagent_a_remaining_ml: Option<f64>,
    /// Reagent B volume in mL.
    pub reagent_b_remaining_ml: Option<f64>,
    /// Reagent C volume in mL.
    pub reagent_c_remaining_ml: Option<f64>,
    /// Reagent A is at most [`REAGENT_EMPTY_THRESHOLD_ML`].
    pub reagent_a_empty: Option<bool>,
    /// Reagent B is at most [`REAGENT_EMPTY_THRESHOLD_ML`].
    pub reagent_b_empty: Option<bool>,
    /// Reagent C is at most [`REAGENT_EMPTY_THRESHOLD_ML`].
    pub reagent_c_empty: Option<bool>,
}

impl Trident {
    /// Recomputes every derived field from `levels_ml` and `waste_size_ml`.
    ///
    /// The reagent mapping is only known for the two list shapes seen on
    /// real hardware: with 5 readings reagents A, B and C sit at indices
    /// 4, 3 and 2; with 4 readings at 3, 2 and 1. Any other length leaves the
    /// reagent fields unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use apex_fusion_lib::status::Trident;
    ///
    /// let mut trident = Trident {
    ///     levels_ml: Some(vec![90.0, 123.0, 30.0, 10.0, 5.0]),
    ///     waste_size_ml: Some(100.0),
    ///     ..Trident::default()
    /// };
    /// trident.finalize();
    ///
    /// assert_eq!(trident.waste_remaining_ml, Some(10.0));
    /// assert_eq!(trident.waste_full, Some(true));
    /// assert_eq!(trident.reagent_c_remaining_ml, Some(30.0));
    /// assert_eq!(trident.reagent_b_empty, Some(true));
    /// ```
    pub fn finalize(&mut self) {
        let levels = self.levels_ml.as_deref().unwrap_or_default();

        let waste_used = levels.first().copied().filter(|v| v.is_finite());

        let (idx_a, idx_b, idx_c) = match levels.len() {
            5 => (Some(4), Some(3), Some(2)),
            4 => (Some(3), Some(2), Some(1)),
            _ => (None, None, None),
        };
        let read = |idx: Option<usize>| {
            idx.and_then(|i| levels.get(i))
                .copied()
                .filter(|v| v.is_finite())
        };
        let (a, b, c) = (read(idx_a), read(idx_b), read(idx_c));

        self.waste_used_ml = waste_used;
        self.reagent_a_remaining_ml = a;
        self.reagent_b_remaining_ml = b;
        self.reagent_c_remaining_ml = c;
        self.reagent_a_empty = a.map(is_reagent_empty);
        self.reagent_b_empty = b.map(is_reagent_empty);
        self.reagent_c_empty = c.map(is_reagent_empty);

        self.waste_size_ml = self.waste_size_ml.filter(|s| s.is_finite() && *s > 0.0);

        match (waste_used, self.waste_size_ml) {
            (Some(used), Some(size)) => {
                let remaining = (size - used).clamp(0.0, size);
                self.waste_percent = Some(used / size * 100.0);
                self.waste_remaining_ml = Some(remaining);
                self.waste_full = Some(remaining <= WASTE_FULL_MARGIN_ML);
            }
            _ => {
                self.waste_percent = None;
                self.waste_remaining_ml = None;
                self.waste_full = None;
            }
        }
    }
}

fn is_reagent_empty(ml: f64) -> bool {
    ml <= REAGENT_EMPTY_THRESHOLD_ML
}
