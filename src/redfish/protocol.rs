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

//! JSON structures of the Redfish data model.
//!
//! Only the subset needed for power control, virtual media and boot source
//! overrides is modeled. BMC firmware routinely omits fields, so almost
//! everything is optional with a default.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::types::{BootSource, PowerState, ResetType};

/// A reference to another resource by its odata identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdRef {
    #[serde(default, rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemLinks {
    #[serde(default, rename = "ManagedBy")]
    pub managed_by: Vec<IdRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Boot {
    #[serde(default, rename = "BootSourceOverrideTarget")]
    pub boot_source_override_target: Option<BootSource>,
    #[serde(
        default,
        rename = "BootSourceOverrideTarget@Redfish.AllowableValues"
    )]
    pub allowable_values: Vec<BootSource>,
}

/// A computer system as reported by the BMC.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComputerSystem {
    #[serde(default, rename = "PowerState")]
    pub power_state: Option<PowerState>,
    #[serde(default, rename = "Links")]
    pub links: SystemLinks,
    #[serde(default, rename = "Boot")]
    pub boot: Boot,
}

/// A removable-media device exposed by a manager.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VirtualMedia {
    #[serde(default, rename = "Inserted")]
    pub inserted: Option<bool>,
    #[serde(default, rename = "Image")]
    pub image: Option<String>,
    #[serde(default, rename = "MediaTypes")]
    pub media_types: Vec<String>,
}

/// A collection of resources (used for the virtual media listing).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collection {
    #[serde(default, rename = "Members")]
    pub members: Vec<IdRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetRequestBody {
    #[serde(rename = "ResetType")]
    pub reset_type: ResetType,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertMediaRequestBody {
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Inserted")]
    pub inserted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootOverrideRequestBody {
    #[serde(rename = "Boot")]
    pub boot: BootOverride,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootOverride {
    #[serde(rename = "BootSourceOverrideTarget")]
    pub target: BootSource,
    #[serde(rename = "BootSourceOverrideEnabled")]
    pub enabled: &'static str,
}

impl BootOverrideRequestBody {
    /// A one-time boot override to the given source.
    pub fn once(target: BootSource) -> BootOverrideRequestBody {
        BootOverrideRequestBody {
            boot: BootOverride {
                target,
                enabled: "Once",
            },
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::super::types::{BootSource, PowerState};
    use super::*;

    #[test]
    fn test_computer_system() {
        let system_json = json!({
            "Id": "Embedded.1",
            "PowerState": "On",
            "Links": {
                "ManagedBy": [
                    {"@odata.id": "/redfish/v1/Managers/iDRAC.Embedded.1"}
                ]
            },
            "Boot": {
                "BootSourceOverrideTarget": "None",
                "BootSourceOverrideTarget@Redfish.AllowableValues": ["Cd", "Hdd", "Pxe"]
            }
        });

        let system: ComputerSystem = serde_json::from_value(system_json).unwrap();
        assert_eq!(system.power_state, Some(PowerState::On));
        assert_eq!(
            system.links.managed_by[0].odata_id,
            "/redfish/v1/Managers/iDRAC.Embedded.1"
        );
        assert_eq!(
            system.boot.allowable_values,
            vec![BootSource::Cd, BootSource::Hdd, BootSource::Pxe]
        );
    }

    #[test]
    fn test_computer_system_sparse() {
        // Firmware that omits everything still parses.
        let system: ComputerSystem = serde_json::from_value(json!({})).unwrap();
        assert!(system.power_state.is_none());
        assert!(system.links.managed_by.is_empty());
        assert!(system.boot.allowable_values.is_empty());
    }

    #[test]
    fn test_virtual_media() {
        let media_json = json!({
            "Inserted": true,
            "Image": "http://img/os.iso",
            "MediaTypes": ["CD", "DVD"]
        });

        let media: VirtualMedia = serde_json::from_value(media_json).unwrap();
        assert_eq!(media.inserted, Some(true));
        assert_eq!(media.image.as_deref(), Some("http://img/os.iso"));
        assert_eq!(media.media_types, vec!["CD", "DVD"]);
    }

    #[test]
    fn test_boot_override_body() {
        let body = BootOverrideRequestBody::once(BootSource::Cd);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({"Boot": {"BootSourceOverrideTarget": "Cd", "BootSourceOverrideEnabled": "Once"}})
        );
    }
}
