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

use std::fmt;

use serde::{Deserialize, Serialize};

/// Power state of a system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum PowerState {
    /// System is powered on.
    On,
    /// System is powered off.
    Off,
    /// System is transitioning to on.
    PoweringOn,
    /// System is transitioning to off.
    PoweringOff,
    /// Reported power state is not recognized.
    #[serde(other)]
    Unknown,
}

/// Type of a system reset action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResetType {
    /// Power on the system.
    On,
    /// Power off the system immediately.
    ForceOff,
}

/// A boot source override target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum BootSource {
    None,
    Pxe,
    Floppy,
    Cd,
    Dvd,
    Usb,
    Hdd,
    BiosSetup,
    Utilities,
    Diags,
    UefiTarget,
    SDCard,
    UefiHttp,
    /// Reported boot source is not recognized.
    #[serde(other)]
    Unknown,
}

impl PowerState {
    /// The raw wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "On",
            PowerState::Off => "Off",
            PowerState::PoweringOn => "PoweringOn",
            PowerState::PoweringOff => "PoweringOff",
            PowerState::Unknown => "Unknown",
        }
    }
}

impl BootSource {
    /// The raw wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BootSource::None => "None",
            BootSource::Pxe => "Pxe",
            BootSource::Floppy => "Floppy",
            BootSource::Cd => "Cd",
            BootSource::Dvd => "Dvd",
            BootSource::Usb => "Usb",
            BootSource::Hdd => "Hdd",
            BootSource::BiosSetup => "BiosSetup",
            BootSource::Utilities => "Utilities",
            BootSource::Diags => "Diags",
            BootSource::UefiTarget => "UefiTarget",
            BootSource::SDCard => "SDCard",
            BootSource::UefiHttp => "UefiHttp",
            BootSource::Unknown => "Unknown",
        }
    }

    /// Whether this boot source corresponds to the given virtual media type.
    ///
    /// Media types use a different capitalization than boot sources
    /// ("CD" vs "Cd"), so the comparison ignores case.
    pub fn matches_media_type(&self, media_type: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(media_type)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BootSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ResetType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ResetType::On => "On",
            ResetType::ForceOff => "ForceOff",
        })
    }
}

#[cfg(test)]
mod test {
    use super::{BootSource, PowerState};

    #[test]
    fn test_power_state_known_values() {
        for (raw, expected) in [
            ("\"On\"", PowerState::On),
            ("\"Off\"", PowerState::Off),
            ("\"PoweringOn\"", PowerState::PoweringOn),
            ("\"PoweringOff\"", PowerState::PoweringOff),
        ] {
            let state: PowerState = serde_json::from_str(raw).unwrap();
            assert_eq!(state, expected);
        }
    }

    #[test]
    fn test_power_state_unknown_value_is_not_an_error() {
        let state: PowerState = serde_json::from_str("\"Hibernating\"").unwrap();
        assert_eq!(state, PowerState::Unknown);
    }

    #[test]
    fn test_boot_source_media_type_matching() {
        assert!(BootSource::Cd.matches_media_type("CD"));
        assert!(BootSource::Cd.matches_media_type("Cd"));
        assert!(BootSource::Dvd.matches_media_type("DVD"));
        assert!(!BootSource::Cd.matches_media_type("DVD"));
        assert!(!BootSource::Hdd.matches_media_type("CD"));
    }
}
