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

//! Management configuration.

use std::time::Duration;

use crate::redfish;

/// How to talk to the BMCs of an inventory.
///
/// One configuration applies to a whole inventory; per-host settings live
/// in the host documents.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagementConfiguration {
    /// Driver type identifier, selecting the client implementation.
    #[serde(rename = "type")]
    pub management_type: String,

    /// Skip TLS certificate verification.
    ///
    /// BMCs routinely run with self-signed certificates.
    pub insecure: bool,

    /// Route BMC traffic through the proxy settings of the environment.
    #[serde(rename = "useproxy")]
    pub use_proxy: bool,

    /// How many times a power or media action is re-polled before giving
    /// up.
    pub system_action_retries: usize,

    /// Seconds to wait between re-polls.
    pub system_reboot_delay: u64,
}

impl Default for ManagementConfiguration {
    fn default() -> ManagementConfiguration {
        ManagementConfiguration {
            management_type: redfish::CLIENT_TYPE.to_string(),
            insecure: false,
            use_proxy: false,
            system_action_retries: 30,
            system_reboot_delay: 30,
        }
    }
}

impl ManagementConfiguration {
    /// The re-poll delay as a duration.
    pub fn reboot_delay(&self) -> Duration {
        Duration::from_secs(self.system_reboot_delay)
    }
}
