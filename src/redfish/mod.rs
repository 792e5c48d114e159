// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The standard Redfish client.
//!
//! One client is bound to exactly one managed system on one BMC endpoint.
//! Operations that change physical state are verified by polling within a
//! finite retry budget; the delay between polls comes from an injectable
//! [`Backoff`](crate::Backoff) strategy.

mod api;
pub mod dell;
mod protocol;
mod types;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use super::client::{Backoff, RemoteClient, TimerBackoff};
use super::session::Session;
use super::utils;
use super::{Error, ErrorKind, Result};

pub use self::api::{HttpApi, RedfishApi};
pub use self::protocol::{Boot, Collection, ComputerSystem, IdRef, SystemLinks, VirtualMedia};
pub use self::types::{BootSource, PowerState, ResetType};

/// Driver type identifier of the standard client.
pub const CLIENT_TYPE: &str = "redfish";

/// Separator between the out-of-band marker and the real URL scheme.
const SCHEME_SEPARATOR: char = '+';

/// A client for one host's baseboard management controller.
pub struct Client {
    system_id: String,
    api: Box<dyn RedfishApi>,
    system_action_retries: usize,
    system_reboot_delay: Duration,
    backoff: Box<dyn Backoff>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Client")
            .field("system_id", &self.system_id)
            .field("system_action_retries", &self.system_action_retries)
            .field("system_reboot_delay", &self.system_reboot_delay)
            .finish()
    }
}

/// Split a BMC URL into the bare endpoint and the system ID.
///
/// The accepted form is `<marker>+<scheme>://<host>:<port>/<...>/<system id>`
/// where the `<marker>+` prefix is optional.
fn parse_bmc_url(bmc_url: &str) -> Result<(Url, String)> {
    if bmc_url.is_empty() {
        return Err(Error::new(ErrorKind::InvalidConfig, "BMC URL is empty"));
    }

    let parsed = Url::parse(bmc_url).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("malformed BMC URL {:?}: {}", bmc_url, e),
        )
    })?;

    let scheme = parsed
        .scheme()
        .rsplit(SCHEME_SEPARATOR)
        .next()
        .expect("rsplit yields at least one item");

    let host = parsed.host_str().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("BMC URL {:?} is missing a host", bmc_url),
        )
    })?;

    let system_id = utils::url::last_segment(&parsed)
        .ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("BMC URL {:?} is missing the system ID path", bmc_url),
            )
        })?
        .to_string();

    let endpoint = match parsed.port() {
        Some(port) => format!("{}://{}:{}", scheme, host, port),
        None => format!("{}://{}", scheme, host),
    };
    let endpoint = Url::parse(&endpoint).map_err(|e| {
        Error::new(
            ErrorKind::InvalidConfig,
            format!("malformed BMC endpoint {:?}: {}", endpoint, e),
        )
    })?;

    Ok((endpoint, system_id))
}

impl Client {
    /// Create a client for the system addressed by the given BMC URL.
    ///
    /// An unparseable URL or one without a system ID path is a construction
    /// error; an absent out-of-band marker is tolerated.
    pub fn new<S1, S2>(
        bmc_url: &str,
        username: S1,
        password: S2,
        insecure: bool,
        use_proxy: bool,
        system_action_retries: usize,
        system_reboot_delay: Duration,
    ) -> Result<Client>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let (endpoint, system_id) = parse_bmc_url(bmc_url)?;
        let session = Session::new(endpoint, username, password, insecure, use_proxy)?;
        Ok(Client {
            system_id,
            api: Box::new(HttpApi::new(session)),
            system_action_retries,
            system_reboot_delay,
            backoff: Box::new(TimerBackoff),
        })
    }

    /// Create a client over a caller-supplied API implementation.
    ///
    /// The URL is still parsed for the system ID; no transport is built.
    pub fn new_with_api(
        bmc_url: &str,
        api: Box<dyn RedfishApi>,
        system_action_retries: usize,
        system_reboot_delay: Duration,
    ) -> Result<Client> {
        let (_endpoint, system_id) = parse_bmc_url(bmc_url)?;
        Ok(Client {
            system_id,
            api,
            system_action_retries,
            system_reboot_delay,
            backoff: Box::new(TimerBackoff),
        })
    }

    /// Replace the delay strategy of the polling loops.
    pub fn with_backoff<B: Backoff + 'static>(mut self, backoff: B) -> Client {
        self.backoff = Box::new(backoff);
        self
    }

    /// Identifier of the managed system.
    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub(crate) fn api(&self) -> &dyn RedfishApi {
        &*self.api
    }

    /// Identifier of the manager responsible for the system.
    pub(crate) async fn manager_id(&self) -> Result<String> {
        let system = self.api.get_system(&self.system_id).await?;
        system
            .links
            .managed_by
            .first()
            .map(|idref| utils::url::odata_id_leaf(&idref.odata_id).to_string())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidResponse,
                    format!("system {} reports no manager", self.system_id),
                )
            })
    }

    /// Report the current power state of the system.
    ///
    /// An unrecognized raw value maps to [`PowerState::Unknown`], never to
    /// an error.
    pub async fn power_status(&self) -> Result<PowerState> {
        let system = self.api.get_system(&self.system_id).await?;
        Ok(system.power_state.unwrap_or(PowerState::Unknown))
    }

    /// Power the system on and wait for it to report on.
    pub async fn power_on(&self) -> Result<()> {
        debug!("Powering on system {}", self.system_id);
        self.api
            .reset_system(&self.system_id, ResetType::On)
            .await?;
        self.wait_for_power_state(PowerState::On).await
    }

    /// Power the system off and wait for it to report off.
    pub async fn power_off(&self) -> Result<()> {
        debug!("Powering off system {}", self.system_id);
        self.api
            .reset_system(&self.system_id, ResetType::ForceOff)
            .await?;
        self.wait_for_power_state(PowerState::Off).await
    }

    /// Power cycle the system.
    pub async fn reboot(&self) -> Result<()> {
        debug!("Rebooting system {}", self.system_id);
        self.power_off().await?;
        self.power_on().await
    }

    /// Eject every currently inserted virtual media slot.
    ///
    /// Slots that are not inserted are skipped. Ejection of each slot is
    /// confirmed by polling within the retry budget; a slot exceeding the
    /// budget fails the whole call, without re-inserting slots already
    /// ejected.
    pub async fn eject_virtual_media(&self) -> Result<()> {
        let manager_id = self.manager_id().await?;
        self.eject_all(&manager_id).await
    }

    /// Insert the image into a virtual media slot that can boot it.
    ///
    /// Runs a full eject pass first so the insert starts from a clean set
    /// of slots.
    pub async fn set_virtual_media(&self, iso_url: &str) -> Result<()> {
        let manager_id = self.manager_id().await?;
        self.eject_all(&manager_id).await?;

        let (media_id, _media_type) = self.find_media_slot(&manager_id).await?;
        debug!(
            "Inserting image {} into media {} on system {}",
            iso_url, media_id, self.system_id
        );
        self.api
            .insert_virtual_media(&manager_id, &media_id, iso_url)
            .await
    }

    /// Set a one-time boot override to the virtual media device.
    ///
    /// Fails if the system does not list a boot source matching the type of
    /// an available virtual media slot.
    pub async fn set_boot_source(&self) -> Result<()> {
        let system = self.api.get_system(&self.system_id).await?;
        let manager_id = system
            .links
            .managed_by
            .first()
            .map(|idref| utils::url::odata_id_leaf(&idref.odata_id).to_string())
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidResponse,
                    format!("system {} reports no manager", self.system_id),
                )
            })?;

        let (_media_id, media_type) = self.find_media_slot(&manager_id).await?;
        for source in &system.boot.allowable_values {
            if source.matches_media_type(&media_type) {
                debug!(
                    "Setting boot source of system {} to {}",
                    self.system_id, source
                );
                return self.api.set_boot_override(&self.system_id, *source).await;
            }
        }

        Err(Error::new(
            ErrorKind::InvalidInput,
            format!(
                "virtual media boot source {} is not available on system {}",
                media_type, self.system_id
            ),
        ))
    }

    async fn eject_all(&self, manager_id: &str) -> Result<()> {
        let media_ids = self.api.list_virtual_media(manager_id).await?;
        for media_id in media_ids {
            let media = self.api.get_virtual_media(manager_id, &media_id).await?;
            if media.inserted != Some(true) {
                trace!("Media {} is not inserted, skipping", media_id);
                continue;
            }

            debug!("Ejecting media {} on system {}", media_id, self.system_id);
            self.api.eject_virtual_media(manager_id, &media_id).await?;
            self.wait_for_media_ejected(manager_id, &media_id).await?;
        }
        Ok(())
    }

    /// Find a slot capable of holding a bootable image.
    ///
    /// The set of slots differs per manager, so it is discovered on every
    /// call rather than assumed.
    async fn find_media_slot(&self, manager_id: &str) -> Result<(String, String)> {
        let media_ids = self.api.list_virtual_media(manager_id).await?;
        for media_id in media_ids {
            let media = self.api.get_virtual_media(manager_id, &media_id).await?;
            for media_type in &media.media_types {
                if media_type.eq_ignore_ascii_case("CD") || media_type.eq_ignore_ascii_case("DVD")
                {
                    return Ok((media_id, media_type.clone()));
                }
            }
        }

        Err(Error::new(
            ErrorKind::InvalidResponse,
            format!(
                "manager {} has no virtual media slot supporting CD or DVD",
                manager_id
            ),
        ))
    }

    /// Poll until the system reports the target power state.
    ///
    /// Performs at most `system_action_retries + 1` polls. A mismatching
    /// state is retried after a backoff delay; a failing poll is fatal
    /// immediately.
    pub(crate) async fn wait_for_power_state(&self, target: PowerState) -> Result<()> {
        debug!(
            "Waiting for power state {} on system {}",
            target, self.system_id
        );
        for attempt in 0..=self.system_action_retries {
            if attempt > 0 {
                self.backoff.sleep(self.system_reboot_delay).await;
            }

            let current = self.power_status().await?;
            if current == target {
                trace!("System {} reached power state {}", self.system_id, target);
                return Ok(());
            }
            trace!(
                "System {} reports power state {}, waiting for {} (attempt {}/{})",
                self.system_id,
                current,
                target,
                attempt + 1,
                self.system_action_retries + 1
            );
        }

        Err(Error::new(
            ErrorKind::RetriesExceeded,
            format!(
                "system {} did not reach power state {} within {} attempts",
                self.system_id,
                target,
                self.system_action_retries + 1
            ),
        ))
    }

    async fn wait_for_media_ejected(&self, manager_id: &str, media_id: &str) -> Result<()> {
        for attempt in 0..=self.system_action_retries {
            if attempt > 0 {
                self.backoff.sleep(self.system_reboot_delay).await;
            }

            let media = self.api.get_virtual_media(manager_id, media_id).await?;
            if media.inserted != Some(true) {
                trace!("Media {} is ejected", media_id);
                return Ok(());
            }
            trace!(
                "Media {} is still inserted (attempt {}/{})",
                media_id,
                attempt + 1,
                self.system_action_retries + 1
            );
        }

        Err(Error::new(
            ErrorKind::RetriesExceeded,
            format!(
                "media {} was still inserted after {} attempts",
                media_id,
                self.system_action_retries + 1
            ),
        ))
    }
}

#[async_trait]
impl RemoteClient for Client {
    fn node_id(&self) -> &str {
        self.system_id()
    }

    async fn power_status(&self) -> Result<PowerState> {
        Client::power_status(self).await
    }

    async fn power_on(&self) -> Result<()> {
        Client::power_on(self).await
    }

    async fn power_off(&self) -> Result<()> {
        Client::power_off(self).await
    }

    async fn reboot(&self) -> Result<()> {
        Client::reboot(self).await
    }

    async fn eject_virtual_media(&self) -> Result<()> {
        Client::eject_virtual_media(self).await
    }

    async fn set_virtual_media(&self, iso_url: &str) -> Result<()> {
        Client::set_virtual_media(self, iso_url).await
    }

    async fn set_boot_source(&self) -> Result<()> {
        Client::set_boot_source(self).await
    }
}
