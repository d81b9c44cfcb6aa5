// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Time-based cache of the sanitized configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use super::{ConfigSnapshot, ModuleConfig, MxmDevice, NetworkConfig, trident_waste_size};
use crate::status::ControllerStatus;

/// Cached `mconf`/`nconf`/MXM data, refreshed at most every
/// [`DEFAULT_REFRESH_INTERVAL`](Self::DEFAULT_REFRESH_INTERVAL).
///
/// Status polls are cheap; `/rest/config` is not. The cache lets every poll
/// carry configuration-derived fields (module names, Trident waste size)
/// while only hitting the config endpoint occasionally.
///
/// Timestamps are passed in by the caller so that the refresh policy can be
/// tested without a clock.
#[derive(Debug, Clone)]
pub struct ConfigCache {
    mconf: Option<Vec<ModuleConfig>>,
    nconf: Option<NetworkConfig>,
    mxm_devices: Option<BTreeMap<String, MxmDevice>>,
    last_fetch: Option<Instant>,
    refresh_interval: Duration,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    /// Default time between two config fetches.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mconf: None,
            nconf: None,
            mxm_devices: None,
            last_fetch: None,
            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Sets a custom refresh interval.
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Returns `true` when nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mconf.is_none()
    }

    /// Cached module entries.
    #[must_use]
    pub fn mconf(&self) -> Option<&[ModuleConfig]> {
        self.mconf.as_deref()
    }

    /// Cached firmware update information.
    #[must_use]
    pub fn nconf(&self) -> Option<&NetworkConfig> {
        self.nconf.as_ref()
    }

    /// Cached MXM devices.
    #[must_use]
    pub fn mxm_devices(&self) -> Option<&BTreeMap<String, MxmDevice>> {
        self.mxm_devices.as_ref()
    }

    /// Whether the config endpoint should be queried at `now`.
    #[must_use]
    pub fn needs_refresh(&self, now: Instant, force: bool) -> bool {
        force
            || self.is_empty()
            || self
                .last_fetch
                .is_none_or(|at| now.saturating_duration_since(at) >= self.refresh_interval)
    }

    /// Replaces the cache with a fresh snapshot fetched at `now`.
    ///
    /// A snapshot without `nconf` keeps the previously cached one.
    pub fn store(&mut self, snapshot: ConfigSnapshot, now: Instant) {
        let ConfigSnapshot {
            config,
            mxm_devices,
        } = snapshot;
        self.mconf = Some(config.mconf.unwrap_or_default());
        if config.nconf.is_some() {
            self.nconf = config.nconf;
        }
        self.mxm_devices = Some(mxm_devices);
        self.last_fetch = Some(now);
    }

    /// Fills sections `status` does not have yet from the cache.
    ///
    /// Values already present on the record are left alone, including a
    /// Trident waste size.
    pub fn merge_into(&self, status: &mut ControllerStatus) {
        if status.config.mconf.is_none() {
            status.config.mconf.clone_from(&self.mconf);
        }
        if status.config.nconf.is_none() {
            status.config.nconf.clone_from(&self.nconf);
        }
        if status.mxm_devices.is_none() {
            status.mxm_devices.clone_from(&self.mxm_devices);
        }
        if status.trident.waste_size_ml.is_none() {
            status.trident.waste_size_ml = self.mconf.as_deref().and_then(trident_waste_size);
        }
    }

    /// Overwrites the record's config sections with the cached ones.
    ///
    /// Used right after a refresh so that the record reflects the values that
    /// were just fetched rather than older ones it may already carry.
    pub fn apply_to(&self, status: &mut ControllerStatus) {
        if self.mconf.is_some() {
            status.config.mconf.clone_from(&self.mconf);
        }
        if self.nconf.is_some() {
            status.config.nconf.clone_from(&self.nconf);
        }
        if self.mxm_devices.is_some() {
            status.mxm_devices.clone_from(&self.mxm_devices);
        }
        if let Some(size) = self.mconf.as_deref().and_then(trident_waste_size) {
            status.trident.waste_size_ml = Some(size);
        }
    }
}
