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

//! Host documents and their sources.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use base64::prelude::*;
use serde::Deserialize;

use crate::{Error, ErrorKind, Result};

/// One bare metal host as described by the inventory.
#[derive(Debug, Clone)]
pub struct HostDocument {
    /// Host name, unique within the inventory.
    pub name: String,
    /// Free-form labels used for selection.
    pub labels: HashMap<String, String>,
    /// BMC URL, including the optional out-of-band marker.
    pub bmc_address: String,
    /// Name of the credentials secret for the BMC.
    pub credentials_name: Option<String>,
}

/// BMC credentials.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where host documents and their credentials come from.
pub trait HostSource: Send + Sync {
    /// All host documents of the inventory.
    fn host_documents(&self) -> Result<Vec<HostDocument>>;

    /// Credentials stored under the given secret name.
    fn credentials(&self, name: &str) -> Result<Credentials>;
}

/// Criteria narrowing a selection down to some hosts.
///
/// An empty selector matches every host. A populated one requires the
/// name and every label to match.
#[derive(Debug, Clone, Default)]
pub struct HostSelector {
    name: Option<String>,
    labels: Vec<String>,
}

impl HostSelector {
    /// Require an exact host name.
    pub fn by_name<S: Into<String>>(mut self, name: S) -> HostSelector {
        self.name = Some(name.into());
        self
    }

    /// Require a `key=value` label.
    pub fn by_label<S: Into<String>>(mut self, label: S) -> HostSelector {
        self.labels.push(label.into());
        self
    }

    /// Whether the given host satisfies all criteria.
    ///
    /// A label without a `=` separator is rejected as invalid input.
    pub fn matches(&self, host: &HostDocument) -> Result<bool> {
        if let Some(name) = &self.name {
            if *name != host.name {
                return Ok(false);
            }
        }

        for label in &self.labels {
            let (key, value) = label.split_once('=').ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidInput,
                    format!("label selector {:?} is not of the form key=value", label),
                )
            })?;
            if host.labels.get(key).map(String::as_str) != Some(value) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: RawMetadata,
    #[serde(default)]
    spec: RawHostSpec,
    #[serde(default, rename = "stringData")]
    string_data: HashMap<String, String>,
    #[serde(default)]
    data: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHostSpec {
    #[serde(default)]
    bmc: RawBmc,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBmc {
    #[serde(default)]
    address: String,
    #[serde(default)]
    credentials_name: Option<String>,
}

/// A [`HostSource`] backed by a multi-document YAML bundle.
///
/// Recognizes `BareMetalHost` and `Secret` documents; everything else in
/// the bundle is ignored. Secret values come from `stringData` verbatim
/// or from `data` base64-encoded.
#[derive(Debug, Default)]
pub struct YamlSource {
    hosts: Vec<HostDocument>,
    secrets: HashMap<String, HashMap<String, String>>,
}

impl YamlSource {
    /// Parse a bundle from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<YamlSource> {
        let mut source = YamlSource::default();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let raw = RawDocument::deserialize(document).map_err(|e| {
                Error::new(
                    ErrorKind::InvalidConfig,
                    format!("malformed inventory document: {}", e),
                )
            })?;
            source.add(raw)?;
        }
        Ok(source)
    }

    /// Parse a bundle from a file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<YamlSource> {
        let yaml = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("cannot read inventory {}: {}", path.as_ref().display(), e),
            )
        })?;
        YamlSource::from_yaml(&yaml)
    }

    fn add(&mut self, raw: RawDocument) -> Result<()> {
        match raw.kind.as_str() {
            "BareMetalHost" => {
                trace!("Found host document {}", raw.metadata.name);
                self.hosts.push(HostDocument {
                    name: raw.metadata.name,
                    labels: raw.metadata.labels,
                    bmc_address: raw.spec.bmc.address,
                    credentials_name: raw.spec.bmc.credentials_name,
                });
            }
            "Secret" => {
                trace!("Found secret document {}", raw.metadata.name);
                let mut values = raw.string_data;
                for (key, encoded) in raw.data {
                    let decoded = BASE64_STANDARD.decode(&encoded).map_err(|e| {
                        Error::new(
                            ErrorKind::InvalidConfig,
                            format!("secret {} has undecodable data: {}", raw.metadata.name, e),
                        )
                    })?;
                    let value = String::from_utf8(decoded).map_err(|e| {
                        Error::new(
                            ErrorKind::InvalidConfig,
                            format!("secret {} has non-UTF-8 data: {}", raw.metadata.name, e),
                        )
                    })?;
                    values.insert(key, value);
                }
                self.secrets.insert(raw.metadata.name, values);
            }
            other => {
                trace!("Ignoring document of kind {:?}", other);
            }
        }
        Ok(())
    }
}

impl HostSource for YamlSource {
    fn host_documents(&self) -> Result<Vec<HostDocument>> {
        Ok(self.hosts.clone())
    }

    fn credentials(&self, name: &str) -> Result<Credentials> {
        let values = self.secrets.get(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidConfig,
                format!("credentials secret {} does not exist", name),
            )
        })?;
        let field = |key: &str| {
            values.get(key).cloned().ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidConfig,
                    format!("secret {} has no field named {}", name, key),
                )
            })
        };
        Ok(Credentials {
            username: field("username")?,
            password: field("password")?,
        })
    }
}
