// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Control operations.
//!
//! Every control goes through REST with the same session, retry and
//! rate-limit rules as status polling. Feed control alone has a legacy
//! fallback through `/cgi-bin/status.cgi`.

use serde_json::{Value, json};
use tokio::time::Instant;

use super::ApexClient;
use crate::config::ConfigSnapshot;
use crate::error::{DeviceError, Error, ProtocolError, Result, ValueError};
use crate::protocol::{Request, Transport, paths};
use crate::types::{FeedCycle, OutletMode, PrimeChannel, ReagentSlot, WasteSize};

/// `extra.reset` flags; index 0 is the waste counter.
const RESET_WASTE_FLAGS: [bool; 5] = [true, false, false, false, false];

impl<T: Transport> ApexClient<T> {
    /// Sends an authenticated REST `PUT` with a JSON body.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::PasswordRequired`] without a password
    /// - [`Error::NotSupported`] when the path does not exist
    /// - [`Error::Auth`], [`Error::RateLimited`], [`Error::TransportDisabled`]
    ///   or [`Error::Transport`] as for any REST call
    pub async fn authenticated_put(&mut self, path: &str, body: Value) -> Result<()> {
        self.rest_call(Request::put(path).with_json(body), true)
            .await
            .map(|_| ())
    }

    /// Fetches `/rest/config` now and replaces the cached configuration.
    ///
    /// # Errors
    ///
    /// Returns the REST error, or [`Error::Parse`] for an unreadable body.
    pub async fn refresh_config_now(&mut self) -> Result<ConfigSnapshot> {
        let snapshot = self.fetch_config().await?;
        self.cache.store(snapshot.clone(), Instant::now());
        tracing::debug!(modules = snapshot.modules().len(), "Refreshed controller config");
        Ok(snapshot)
    }

    /// Sets an outlet to `AUTO`, `ON` or `OFF`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyDeviceId`] for a blank id, otherwise the
    /// REST error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use apex_fusion_lib::{ApexClient, OutletMode};
    ///
    /// # async fn example() -> apex_fusion_lib::Result<()> {
    /// let mut client = ApexClient::builder("apex.local").with_password("secret").build()?;
    /// client.set_outlet_mode("3_1", OutletMode::Off).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set_outlet_mode(&mut self, device_id: &str, mode: OutletMode) -> Result<()> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            return Err(ValueError::EmptyDeviceId.into());
        }

        tracing::debug!(device_id, %mode, "Setting outlet mode");
        let path = format!("{}/{}", paths::REST_OUTPUTS, urlencoding::encode(device_id));
        self.authenticated_put(
            &path,
            json!({
                "did": device_id,
                "status": [mode.as_str(), "", "OK", ""],
                "type": "outlet",
            }),
        )
        .await
    }

    /// Starts a feed cycle.
    ///
    /// # Errors
    ///
    /// Returns error when both REST and the legacy form fail.
    pub async fn set_feed_cycle(&mut self, cycle: FeedCycle) -> Result<()> {
        self.feed_control(cycle, true).await
    }

    /// Cancels the running feed cycle.
    ///
    /// REST needs a cycle id; the one reported by the last status is used,
    /// Feed A otherwise.
    ///
    /// # Errors
    ///
    /// Returns error when both REST and the legacy form fail.
    pub async fn cancel_feed(&mut self) -> Result<()> {
        let cycle = self.active_feed.unwrap_or(FeedCycle::A);
        self.feed_control(cycle, false).await
    }

    async fn feed_control(&mut self, cycle: FeedCycle, active: bool) -> Result<()> {
        let id = cycle.id();
        let path = format!("{}/{id}", paths::REST_FEED);
        let body = json!({"name": id, "active": u8::from(active)});

        match self.authenticated_put(&path, body).await {
            Ok(()) => {
                self.active_feed = active.then_some(cycle);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, %cycle, active, "REST feed control failed, using CGI");
                let selector = if active {
                    cycle.cgi_selector()
                } else {
                    FeedCycle::CGI_CANCEL_SELECTOR
                };
                self.legacy_feed_control(selector).await?;
                self.active_feed = active.then_some(cycle);
                Ok(())
            }
        }
    }

    async fn legacy_feed_control(&self, selector: u8) -> Result<()> {
        let request = Request::post(paths::CGI_STATUS_CGI)
            .with_basic_auth(self.config.basic_auth())
            .with_form([("FeedSel", selector.to_string())]);
        let response = self.transport.send(&request).await?;

        if response.is_unauthorized() {
            return Err(Error::Auth(format!(
                "{} rejected credentials (HTTP {})",
                paths::CGI_STATUS_CGI,
                response.status
            )));
        }
        if !response.is_success() {
            return Err(ProtocolError::UnexpectedStatus(response.status).into());
        }
        Ok(())
    }

    /// Sets the Trident waste container size and reloads the config so the
    /// derived waste fields use it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::TridentNotDetected`] when no Trident was seen
    /// in the last status, otherwise the REST error.
    pub async fn trident_set_waste_size(&mut self, size: WasteSize) -> Result<()> {
        self.trident_put_extra(json!({"wasteSize": size.ml()})).await?;
        self.refresh_config_now().await.map(|_| ())
    }

    /// Resets the Trident waste counter after emptying the container.
    ///
    /// # Errors
    ///
    /// As for [`trident_set_waste_size`](Self::trident_set_waste_size).
    pub async fn trident_reset_waste(&mut self) -> Result<()> {
        self.trident_put_extra(json!({"reset": RESET_WASTE_FLAGS}))
            .await
    }

    /// Marks a reagent container as replaced.
    ///
    /// # Errors
    ///
    /// As for [`trident_set_waste_size`](Self::trident_set_waste_size).
    pub async fn trident_reset_reagent(&mut self, slot: ReagentSlot) -> Result<()> {
        self.trident_put_extra(json!({"newReagent": slot.reset_flags()}))
            .await
    }

    /// Primes one Trident line.
    ///
    /// # Errors
    ///
    /// As for [`trident_set_waste_size`](Self::trident_set_waste_size).
    pub async fn trident_prime_channel(&mut self, channel: PrimeChannel) -> Result<()> {
        self.trident_put_extra(json!({"prime": channel.prime_flags()}))
            .await
    }

    /// Writes `extra` to the Trident's module config, per module first and
    /// through the bulk endpoint on firmware without it.
    async fn trident_put_extra(&mut self, extra: Value) -> Result<()> {
        let abaddr = self.trident_abaddr.ok_or(DeviceError::TridentNotDetected)?;
        tracing::debug!(abaddr, %extra, "Updating Trident config");

        let path = format!("{}/{abaddr}", paths::REST_MCONF);
        match self
            .authenticated_put(&path, json!({"abaddr": abaddr, "extra": extra}))
            .await
        {
            Err(Error::NotSupported(_)) => {
                self.authenticated_put(
                    paths::REST_MCONF,
                    json!({"mconf": [{"abaddr": abaddr, "extra": extra}]}),
                )
                .await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::ScriptedTransport;
    use super::*;
    use crate::protocol::{Body, ControllerConfig, Method, Response};

    fn client(transport: ScriptedTransport) -> ApexClient<ScriptedTransport> {
        let config = ControllerConfig::new("apex").with_password("pw");
        let mut client = ApexClient::with_transport(config, transport);
        client.session.set_token("sid");
        client
    }

    fn json_body(request: &Request) -> &Value {
        match &request.body {
            Body::Json(body) => body,
            other => panic!("expected JSON body, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn outlet_mode_payload() {
        let mut client = client(ScriptedTransport::new().reply(200, "{}"));

        client.set_outlet_mode(" 3_1 ", OutletMode::Auto).await.unwrap();

        let request = &client.transport().requests()[0];
        assert_eq!(request.method, Method::Put);
        assert_eq!(request.path, "/rest/status/outputs/3_1");
        assert_eq!(request.session.as_deref(), Some("sid"));
        assert_eq!(
            json_body(request),
            &json!({"did": "3_1", "status": ["AUTO", "", "OK", ""], "type": "outlet"})
        );
    }

    #[tokio::test]
    async fn blank_outlet_id_is_rejected() {
        let mut client = client(ScriptedTransport::new());
        assert!(matches!(
            client.set_outlet_mode("  ", OutletMode::On).await,
            Err(Error::Value(ValueError::EmptyDeviceId))
        ));
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn controls_need_a_password() {
        let transport = ScriptedTransport::new();
        let mut client = ApexClient::with_transport(ControllerConfig::new("apex"), transport);
        assert!(matches!(
            client.set_outlet_mode("3_1", OutletMode::On).await,
            Err(Error::Device(DeviceError::PasswordRequired))
        ));
    }

    #[tokio::test]
    async fn feed_cycle_over_rest() {
        let mut client = client(ScriptedTransport::new().reply(200, "{}"));

        client.set_feed_cycle(FeedCycle::B).await.unwrap();

        let request = &client.transport().requests()[0];
        assert_eq!(request.path, "/rest/status/feed/2");
        assert_eq!(json_body(request), &json!({"name": 2, "active": 1}));
    }

    #[tokio::test]
    async fn cancel_targets_running_cycle() {
        let mut client = client(ScriptedTransport::new().reply(200, "{}").reply(200, "{}"));

        client.set_feed_cycle(FeedCycle::C).await.unwrap();
        client.cancel_feed().await.unwrap();

        let request = &client.transport().requests()[1];
        assert_eq!(request.path, "/rest/status/feed/3");
        assert_eq!(json_body(request), &json!({"name": 3, "active": 0}));
    }

    #[tokio::test]
    async fn feed_falls_back_to_cgi_form() {
        let transport = ScriptedTransport::new().reply(404, "").reply(200, "");
        let mut client = client(transport);

        client.set_feed_cycle(FeedCycle::D).await.unwrap();

        let request = &client.transport().requests()[1];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/cgi-bin/status.cgi");
        assert_eq!(request.form_body().as_deref(), Some("FeedSel=3"));
        assert_eq!(
            request.basic_auth,
            Some(("admin".to_string(), "pw".to_string()))
        );
    }

    #[tokio::test]
    async fn feed_cancel_without_password_uses_cgi() {
        let transport = ScriptedTransport::new().reply(200, "");
        let mut client = ApexClient::with_transport(ControllerConfig::new("apex"), transport);

        client.cancel_feed().await.unwrap();

        let requests = client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].form_body().as_deref(), Some("FeedSel=5"));
        assert_eq!(requests[0].basic_auth, None);
    }

    #[tokio::test]
    async fn feed_cgi_rejection_is_auth_error() {
        let transport = ScriptedTransport::new().reply(404, "").reply(401, "");
        let mut client = client(transport);

        let err = client.set_feed_cycle(FeedCycle::A).await.unwrap_err();
        assert!(err.needs_reauth());
    }

    #[tokio::test]
    async fn trident_needs_detected_module() {
        let mut client = client(ScriptedTransport::new());
        assert!(matches!(
            client.trident_reset_waste().await,
            Err(Error::Device(DeviceError::TridentNotDetected))
        ));
        assert!(client.transport().requests().is_empty());
    }

    #[tokio::test]
    async fn trident_commands_target_module() {
        let transport = ScriptedTransport::new()
            .reply(200, "{}")
            .reply(200, "{}")
            .reply(200, "{}");
        let mut client = client(transport);
        client.trident_abaddr = Some(5);

        client.trident_reset_waste().await.unwrap();
        client.trident_reset_reagent(ReagentSlot::B).await.unwrap();
        client
            .trident_prime_channel(PrimeChannel::new(3).unwrap())
            .await
            .unwrap();

        let requests = client.transport().requests();
        assert!(requests.iter().all(|r| r.path == "/rest/config/mconf/5"));
        assert_eq!(
            json_body(&requests[0]),
            &json!({"abaddr": 5, "extra": {"reset": [true, false, false, false, false]}})
        );
        assert_eq!(
            json_body(&requests[1]),
            &json!({"abaddr": 5, "extra": {"newReagent": [false, true, false]}})
        );
        assert_eq!(
            json_body(&requests[2]),
            &json!({"abaddr": 5, "extra": {"prime": [false, false, false, true]}})
        );
    }

    #[tokio::test]
    async fn trident_falls_back_to_bulk_mconf() {
        let transport = ScriptedTransport::new()
            .reply(404, "")
            .reply(200, "{}")
            .reply(
                200,
                r#"{"mconf": [{"hwtype": "TRI", "abaddr": 5, "extra": {"wasteSize": 450}}]}"#,
            );
        let mut client = client(transport);
        client.trident_abaddr = Some(5);

        client
            .trident_set_waste_size(WasteSize::new(450.0).unwrap())
            .await
            .unwrap();

        let requests = client.transport().requests();
        assert_eq!(
            client.transport().paths(),
            vec!["/rest/config/mconf/5", "/rest/config/mconf", "/rest/config"]
        );
        assert_eq!(
            json_body(&requests[1]),
            &json!({"mconf": [{"abaddr": 5, "extra": {"wasteSize": 450.0}}]})
        );
        assert_eq!(
            client.config_cache().mconf().and_then(crate::config::trident_waste_size),
            Some(450.0)
        );
    }

    #[tokio::test]
    async fn refresh_config_now_replaces_cache() {
        let transport = ScriptedTransport::new().reply(
            200,
            r#"{"mconf": [{"hwtype": "EB832", "abaddr": 3, "name": "EB8"}], "nconf": {"latestFirmware": "5.13"}}"#,
        );
        let mut client = client(transport);

        let snapshot = client.refresh_config_now().await.unwrap();

        assert_eq!(snapshot.modules().len(), 1);
        assert_eq!(snapshot.modules()[0].name.as_deref(), Some("EB8"));
        assert_eq!(client.config_cache().mconf().map(<[_]>::len), Some(1));
        assert_eq!(
            client
                .config_cache()
                .nconf()
                .and_then(|n| n.latest_firmware.as_deref()),
            Some("5.13")
        );
    }

    #[tokio::test]
    async fn rate_limited_put_disables_rest() {
        let transport =
            ScriptedTransport::new().push(Ok(Response::new(429, "").with_retry_after("30")));
        let mut client = client(transport);

        assert!(matches!(
            client.authenticated_put("/rest/status/outputs/3_1", json!({})).await,
            Err(Error::RateLimited { .. })
        ));
        assert!(matches!(
            client.authenticated_put("/rest/status/outputs/3_1", json!({})).await,
            Err(Error::TransportDisabled { .. })
        ));
        assert_eq!(client.transport().requests().len(), 1);
    }
}
