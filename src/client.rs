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

//! The capability surface of an out-of-band management client.

use std::time::Duration;

use async_trait::async_trait;

use super::redfish::PowerState;
use super::{Error, ErrorKind, Result};

/// Out-of-band operations on one host.
///
/// The standard Redfish client implements the whole surface; per-vendor
/// clients hold a standard client and override only the operations their
/// firmware needs done differently. Either kind is usable wherever the
/// trait is expected.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Identifier of the managed system this client is bound to.
    fn node_id(&self) -> &str;

    /// Report the current power state.
    async fn power_status(&self) -> Result<PowerState>;

    /// Power the host on and wait for it to report on.
    async fn power_on(&self) -> Result<()>;

    /// Power the host off and wait for it to report off.
    async fn power_off(&self) -> Result<()>;

    /// Power cycle the host.
    async fn reboot(&self) -> Result<()>;

    /// Eject every inserted virtual media slot.
    async fn eject_virtual_media(&self) -> Result<()>;

    /// Insert an image into a capable virtual media slot, ejecting whatever
    /// was inserted before.
    async fn set_virtual_media(&self, iso_url: &str) -> Result<()>;

    /// Set a one-time boot override to the virtual media device.
    async fn set_boot_source(&self) -> Result<()>;

    /// Boot the host from a remote image.
    ///
    /// Inserts the image, points the next boot at it and power cycles the
    /// host. The first failing step aborts the rest; completed steps are
    /// not undone.
    async fn remote_direct(&self, iso_url: &str) -> Result<()> {
        if iso_url.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "an image URL is required for remote direct",
            ));
        }

        debug!("Performing remote direct on host {}", self.node_id());
        self.set_virtual_media(iso_url).await?;
        self.set_boot_source().await?;
        self.reboot().await?;
        debug!("Successfully completed remote direct on {}", self.node_id());
        Ok(())
    }
}

/// Delay strategy of the convergence polling loops.
///
/// The default implementation sleeps on the tokio timer; tests substitute
/// [`NoDelay`] so polling is instantaneous.
#[async_trait]
pub trait Backoff: Send + Sync {
    /// Wait before the next poll.
    async fn sleep(&self, delay: Duration);
}

/// The default [`Backoff`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimerBackoff;

#[async_trait]
impl Backoff for TimerBackoff {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// A [`Backoff`] that does not wait at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Backoff for NoDelay {
    async fn sleep(&self, _delay: Duration) {}
}
