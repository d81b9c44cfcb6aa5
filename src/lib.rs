// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apex Fusion Lib - A Rust library to poll and control Neptune Apex
//! aquarium controllers.
//!
//! Controllers expose their status through three endpoints that differ by
//! firmware generation. This library reads whichever one answers and
//! normalizes it into a single [`ControllerStatus`] record.
//!
//! # Supported Features
//!
//! - **Status polling**: REST, then CGI-JSON, then XML, with session reuse
//!   and rate-limit back-off
//! - **Trident**: waste and reagent levels with derived remaining/full/empty
//!   values
//! - **Configuration**: sanitized module and firmware-update configuration,
//!   MXM attached devices
//! - **Controls**: outlet modes, feed cycles, Trident consumables
//!
//! # Quick Start
//!
//! ## Polling
//!
//! ```no_run
//! use apex_fusion_lib::ApexClient;
//!
//! #[tokio::main]
//! async fn main() -> apex_fusion_lib::Result<()> {
//!     let mut client = ApexClient::builder("192.168.1.50")
//!         .with_credentials("admin", "secret")
//!         .build()?;
//!
//!     let status = client.fetch_status().await?;
//!     for (did, probe) in &status.probes {
//!         println!("{did}: {:?}", probe.value);
//!     }
//!     if let Some(percent) = status.trident.waste_percent {
//!         println!("Trident waste at {percent:.0}%");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Controls
//!
//! ```no_run
//! use apex_fusion_lib::{ApexClient, FeedCycle, OutletMode, ReagentSlot};
//!
//! #[tokio::main]
//! async fn main() -> apex_fusion_lib::Result<()> {
//!     let mut client = ApexClient::builder("apex.local")
//!         .with_password("secret")
//!         .build()?;
//!
//!     client.set_outlet_mode("3_1", OutletMode::Off).await?;
//!     client.set_feed_cycle(FeedCycle::A).await?;
//!
//!     // Trident controls need the module address from a status poll.
//!     client.fetch_status().await?;
//!     client.trident_reset_reagent(ReagentSlot::B).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Offline Normalization
//!
//! ```
//! use apex_fusion_lib::payload::StatusPayload;
//! use apex_fusion_lib::status::DataSource;
//!
//! let xml = "<status software=\"5.12\"><hostname>reef</hostname></status>";
//! let status = StatusPayload::parse(DataSource::Xml, xml)?.normalize()?;
//! assert_eq!(status.meta.hostname.as_deref(), Some("reef"));
//! # Ok::<(), apex_fusion_lib::ParseError>(())
//! ```

mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod payload;
pub mod protocol;
pub mod status;
pub mod types;

pub use client::ApexClient;
#[cfg(feature = "http")]
pub use client::ApexClientBuilder;
pub use config::{ConfigCache, ConfigSnapshot};
pub use error::{DeviceError, Error, ParseError, ProtocolError, Result, ValueError};
pub use payload::StatusPayload;
pub use protocol::{ControllerConfig, Session, Transport};
#[cfg(feature = "http")]
pub use protocol::HttpTransport;
pub use status::{ControllerStatus, DataSource, Trident};
pub use types::{FeedCycle, OutletMode, PrimeChannel, ReagentSlot, WasteSize};
