// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types for controller control operations.
//!
//! Each type checks its range at construction time, so a control call can
//! only fail on the wire, never because of a malformed argument.
//!
//! # Types
//!
//! - [`OutletMode`] - AUTO/ON/OFF outlet modes
//! - [`FeedCycle`] - Feed timers A-D
//! - [`ReagentSlot`] - Trident reagent bottles A-C
//! - [`WasteSize`] - Trident waste container capacity (mL, > 0)
//! - [`PrimeChannel`] - Trident pump channel to prime (0-3)

mod feed;
mod outlet_mode;
mod trident;

pub use feed::FeedCycle;
pub use outlet_mode::{OutletMode, is_auto_state, is_energized_state};
pub use trident::{PrimeChannel, ReagentSlot, WasteSize};
