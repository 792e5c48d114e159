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

//! The Redfish client specialized for Dell iDRAC.
//!
//! iDRAC firmware rejects the standard boot override PATCH, so the boot
//! source is set through the OEM system configuration import action
//! instead. Everything else delegates to the standard client. Only
//! iDRAC 9 firmware 3.3 and newer exposes the import endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::super::client::{Backoff, RemoteClient};
use super::super::{Error, Result};
use super::types::PowerState;
use super::RedfishApi;

/// Driver type identifier of the Dell client.
pub const CLIENT_TYPE: &str = "redfish-dell";

const IMPORT_BUFFER: &str = "<SystemConfiguration>\
     <Component FQDD=\"iDRAC.Embedded.1\">\
     <Attribute Name=\"ServerBoot.1#BootOnce\">Enabled</Attribute>\
     <Attribute Name=\"ServerBoot.1#FirstBootDevice\">VCD-DVD</Attribute>\
     </Component>\
     </SystemConfiguration>";

fn import_body() -> Value {
    serde_json::json!({
        "ShareParameters": {
            "Target": "ALL"
        },
        "ShutdownType": "NoReboot",
        "ImportBuffer": IMPORT_BUFFER
    })
}

#[derive(Debug, Deserialize)]
struct IdracErrorResponse {
    error: IdracError,
}

#[derive(Debug, Deserialize)]
struct IdracError {
    #[serde(rename = "@Message.ExtendedInfo", default)]
    extended_info: Vec<IdracExtendedInfo>,
}

#[derive(Debug, Deserialize)]
struct IdracExtendedInfo {
    #[serde(rename = "Message", default)]
    message: String,
}

/// Replace a raw iDRAC error body with its human-readable message.
fn clarify(error: Error) -> Error {
    let parsed = error
        .message()
        .and_then(|body| serde_json::from_str::<IdracErrorResponse>(body).ok());
    if let Some(info) = parsed.and_then(|resp| resp.error.extended_info.into_iter().next()) {
        return Error::new_with_details(
            error.kind(),
            error.status(),
            Some(format!("unable to set boot device: {}", info.message)),
        );
    }
    error
}

/// A client for one host managed by a Dell iDRAC.
#[derive(Debug)]
pub struct Client {
    inner: super::Client,
}

impl Client {
    /// Create a Dell client for the system addressed by the given BMC URL.
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
        Ok(Client {
            inner: super::Client::new(
                bmc_url,
                username,
                password,
                insecure,
                use_proxy,
                system_action_retries,
                system_reboot_delay,
            )?,
        })
    }

    /// Create a Dell client over a caller-supplied API implementation.
    pub fn new_with_api(
        bmc_url: &str,
        api: Box<dyn RedfishApi>,
        system_action_retries: usize,
        system_reboot_delay: Duration,
    ) -> Result<Client> {
        Ok(Client {
            inner: super::Client::new_with_api(
                bmc_url,
                api,
                system_action_retries,
                system_reboot_delay,
            )?,
        })
    }

    /// Replace the delay strategy of the polling loops.
    pub fn with_backoff<B: Backoff + 'static>(mut self, backoff: B) -> Client {
        self.inner = self.inner.with_backoff(backoff);
        self
    }

    /// Identifier of the managed system.
    pub fn system_id(&self) -> &str {
        self.inner.system_id()
    }
}

#[async_trait]
impl RemoteClient for Client {
    fn node_id(&self) -> &str {
        self.inner.system_id()
    }

    async fn power_status(&self) -> Result<PowerState> {
        self.inner.power_status().await
    }

    async fn power_on(&self) -> Result<()> {
        self.inner.power_on().await
    }

    async fn power_off(&self) -> Result<()> {
        self.inner.power_off().await
    }

    async fn reboot(&self) -> Result<()> {
        self.inner.reboot().await
    }

    async fn eject_virtual_media(&self) -> Result<()> {
        self.inner.eject_virtual_media().await
    }

    async fn set_virtual_media(&self, iso_url: &str) -> Result<()> {
        self.inner.set_virtual_media(iso_url).await
    }

    /// Set the first boot device to the virtual CD through the OEM import
    /// action.
    async fn set_boot_source(&self) -> Result<()> {
        debug!(
            "Setting boot device of system {} to VCD-DVD",
            self.inner.system_id()
        );
        let manager_id = self.inner.manager_id().await?;
        self.inner
            .api()
            .import_system_config(&manager_id, import_body())
            .await
            .map_err(clarify)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use super::super::super::client::{NoDelay, RemoteClient};
    use super::super::super::{Error, ErrorKind};
    use super::super::api::mock::MockApi;
    use super::super::protocol::{Boot, ComputerSystem, IdRef, SystemLinks, VirtualMedia};
    use super::super::types::{BootSource, PowerState};
    use super::{clarify, import_body, Client};

    const BMC_URL: &str = "redfish+https://bmc.local:2224/Systems/System.Embedded.1";
    const ISO_URL: &str = "http://img/os.iso";

    fn system(power_state: Option<PowerState>) -> ComputerSystem {
        ComputerSystem {
            power_state,
            links: SystemLinks {
                managed_by: vec![IdRef {
                    odata_id: "/redfish/v1/Managers/iDRAC.Embedded.1".into(),
                }],
            },
            boot: Boot {
                boot_source_override_target: None,
                allowable_values: vec![BootSource::Cd],
            },
        }
    }

    fn media(inserted: bool) -> VirtualMedia {
        VirtualMedia {
            inserted: Some(inserted),
            image: None,
            media_types: vec!["CD".into(), "DVD".into()],
        }
    }

    fn client(api: MockApi) -> (Client, Arc<MockApi>) {
        let api = Arc::new(api);
        let client = Client::new_with_api(BMC_URL, Box::new(api.clone()), 1, Duration::ZERO)
            .unwrap()
            .with_backoff(NoDelay);
        (client, api)
    }

    #[test]
    fn test_import_body() {
        let body = import_body();
        assert_eq!(body["ShutdownType"], "NoReboot");
        assert_eq!(body["ShareParameters"]["Target"], "ALL");
        let buffer = body["ImportBuffer"].as_str().unwrap();
        assert!(buffer.contains("ServerBoot.1#FirstBootDevice"));
        assert!(buffer.contains("VCD-DVD"));
    }

    #[test]
    fn test_clarify_extracts_extended_info() {
        let body = r#"{"error": {"@Message.ExtendedInfo": [{"Message": "Invalid import buffer"}], "code": "Base.1.0", "message": "error"}}"#;
        let error = Error::new(ErrorKind::InvalidInput, body);
        let clarified = clarify(error);
        assert!(clarified.to_string().contains("Invalid import buffer"));
        assert_eq!(clarified.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_clarify_keeps_unparseable_bodies() {
        let error = Error::new(ErrorKind::InvalidInput, "not json");
        let clarified = clarify(error);
        assert!(clarified.to_string().contains("not json"));
    }

    #[tokio::test]
    async fn test_set_boot_source_uses_import() {
        let api = MockApi::new().with_system(system(Some(PowerState::On)));
        let (client, api) = client(api);
        client.set_boot_source().await.unwrap();
        assert_eq!(
            api.calls(),
            vec!["GetSystem", "ImportSystemConfig(iDRAC.Embedded.1)"]
        );
    }

    #[tokio::test]
    async fn test_set_boot_source_import_error() {
        let api = MockApi::new()
            .with_system(system(Some(PowerState::On)))
            .with_import_error(Error::new(
                ErrorKind::InvalidInput,
                r#"{"error": {"@Message.ExtendedInfo": [{"Message": "Unsupported firmware"}]}}"#,
            ));
        let (client, _) = client(api);
        let err = client.set_boot_source().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("Unsupported firmware"));
    }

    #[tokio::test]
    async fn test_remote_direct_goes_through_import() {
        let on = system(Some(PowerState::On));
        let off = system(Some(PowerState::Off));
        let api = MockApi::new()
            .with_system(on.clone()) // manager lookup for the media pass
            .with_system(on.clone()) // manager lookup for the import
            .with_system(off) // wait for off
            .with_system(on) // wait for on
            .with_media_list(["Cd"])
            .with_media("Cd", media(true))
            .with_media("Cd", media(false));
        let (client, api) = client(api);
        client.remote_direct(ISO_URL).await.unwrap();
        assert_eq!(
            api.calls(),
            vec![
                "GetSystem".to_string(),
                "ListVirtualMedia".to_string(),
                "GetVirtualMedia(Cd)".to_string(),
                "EjectVirtualMedia(Cd)".to_string(),
                "GetVirtualMedia(Cd)".to_string(),
                "ListVirtualMedia".to_string(),
                "GetVirtualMedia(Cd)".to_string(),
                format!("InsertVirtualMedia(Cd, {})", ISO_URL),
                "GetSystem".to_string(),
                "ImportSystemConfig(iDRAC.Embedded.1)".to_string(),
                "ResetSystem(ForceOff)".to_string(),
                "GetSystem".to_string(),
                "ResetSystem(On)".to_string(),
                "GetSystem".to_string(),
            ]
        );
    }
}
