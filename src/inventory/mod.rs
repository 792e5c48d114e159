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

//! Host inventory and batch operations.

mod hosts;

use std::fmt;
use std::str::FromStr;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::client::RemoteClient;
use crate::config::ManagementConfiguration;
use crate::events::{Event, EventSender};
use crate::redfish;
use crate::{Error, ErrorKind, Result};

pub use self::hosts::{Credentials, HostDocument, HostSelector, HostSource, YamlSource};

/// An operation runnable on a selection of hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Operation {
    /// Power the hosts on.
    PowerOn,
    /// Power the hosts off.
    PowerOff,
    /// Power cycle the hosts.
    Reboot,
    /// Eject all inserted virtual media.
    EjectVirtualMedia,
    /// Boot the hosts from a remote image.
    RemoteDirect {
        /// URL of the image to boot from.
        iso_url: String,
    },
}

impl Operation {
    fn as_str(&self) -> &'static str {
        match self {
            Operation::PowerOn => "power-on",
            Operation::PowerOff => "power-off",
            Operation::Reboot => "reboot",
            Operation::EjectVirtualMedia => "eject-virtual-media",
            Operation::RemoteDirect { .. } => "remote-direct",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Parse an operation identifier.
    ///
    /// Remote direct is not parseable here since it requires an image URL.
    fn from_str(s: &str) -> Result<Operation> {
        match s {
            "power-on" => Ok(Operation::PowerOn),
            "power-off" => Ok(Operation::PowerOff),
            "reboot" => Ok(Operation::Reboot),
            "eject-virtual-media" => Ok(Operation::EjectVirtualMedia),
            other => Err(Error::new(
                ErrorKind::UnsupportedOperation,
                format!("operation {:?} is not supported", other),
            )),
        }
    }
}

/// One selected host, ready for out-of-band operations.
pub struct Host {
    /// Host name from the inventory.
    pub name: String,
    client: Box<dyn RemoteClient>,
}

impl Host {
    /// Pair a host name with a management client.
    pub fn new<S: Into<String>>(name: S, client: Box<dyn RemoteClient>) -> Host {
        Host {
            name: name.into(),
            client,
        }
    }

    /// The management client of this host.
    pub fn client(&self) -> &dyn RemoteClient {
        &*self.client
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("node_id", &self.client.node_id())
            .finish()
    }
}

/// Knobs of one batch run.
#[derive(Debug, Default)]
pub struct BatchRunOptions {
    /// Cap on concurrently running per-host operations.
    ///
    /// Unset means all selected hosts run at once.
    pub max_in_flight: Option<usize>,

    /// Token cancelling host operations that have not finished yet.
    pub cancellation: Option<CancellationToken>,

    /// Channel receiving one event per host as outcomes arrive.
    pub events: Option<EventSender>,
}

/// The host inventory.
///
/// Pairs a source of host documents with a management configuration and
/// hands out hosts with ready-to-use clients.
pub struct Inventory {
    config: ManagementConfiguration,
    source: Box<dyn HostSource>,
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("config", &self.config)
            .finish()
    }
}

impl Inventory {
    /// Create an inventory over the given source.
    pub fn new(config: ManagementConfiguration, source: Box<dyn HostSource>) -> Inventory {
        Inventory { config, source }
    }

    /// All hosts matching the selector.
    ///
    /// Matching no hosts is not an error here; an empty vector is
    /// returned.
    pub fn select(&self, selector: &HostSelector) -> Result<Vec<Host>> {
        let mut result = Vec::new();
        for document in self.source.host_documents()? {
            if !selector.matches(&document)? {
                continue;
            }
            trace!("Host {} matched the selector", document.name);
            let client = self.new_client(&document)?;
            result.push(Host::new(document.name, client));
        }
        Ok(result)
    }

    /// The single host matching the selector.
    pub fn select_one(&self, selector: &HostSelector) -> Result<Host> {
        let mut hosts = self.select(selector)?;
        match hosts.len() {
            0 => Err(Error::new(
                ErrorKind::ResourceNotFound,
                "no hosts matched the selector",
            )),
            1 => Ok(hosts.remove(0)),
            _ => Err(Error::new(
                ErrorKind::TooManyItems,
                "found more than one host matching the selector",
            )),
        }
    }

    /// Run one operation on every host matching the selector.
    ///
    /// Host operations run concurrently, capped by
    /// [`max_in_flight`](BatchRunOptions::max_in_flight). The run always
    /// visits every selected host; per-host failures are aggregated into
    /// one error at the end. Cancellation takes precedence over other
    /// failures in the final verdict.
    pub async fn run_operation(
        &self,
        operation: Operation,
        selector: &HostSelector,
        options: BatchRunOptions,
    ) -> Result<()> {
        if let Operation::RemoteDirect { iso_url } = &operation {
            if iso_url.is_empty() {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    "an image URL is required for remote direct",
                ));
            }
        }

        let hosts = self.select(selector)?;
        if hosts.is_empty() {
            return Err(Error::new(
                ErrorKind::NoHostsMatched,
                "no hosts matched the selector",
            ));
        }

        run_batch(hosts, operation, options).await
    }

    fn new_client(&self, document: &HostDocument) -> Result<Box<dyn RemoteClient>> {
        let credentials = match &document.credentials_name {
            Some(name) => self.source.credentials(name)?,
            None => Credentials::default(),
        };

        match self.config.management_type.as_str() {
            redfish::CLIENT_TYPE => Ok(Box::new(redfish::Client::new(
                &document.bmc_address,
                credentials.username,
                credentials.password,
                self.config.insecure,
                self.config.use_proxy,
                self.config.system_action_retries,
                self.config.reboot_delay(),
            )?)),
            redfish::dell::CLIENT_TYPE => Ok(Box::new(redfish::dell::Client::new(
                &document.bmc_address,
                credentials.username,
                credentials.password,
                self.config.insecure,
                self.config.use_proxy,
                self.config.system_action_retries,
                self.config.reboot_delay(),
            )?)),
            other => Err(Error::new(
                ErrorKind::InvalidConfig,
                format!("management type {:?} is not supported", other),
            )),
        }
    }
}

async fn run_on_host(host: &Host, operation: &Operation) -> Result<()> {
    match operation {
        Operation::PowerOn => host.client.power_on().await,
        Operation::PowerOff => host.client.power_off().await,
        Operation::Reboot => host.client.reboot().await,
        Operation::EjectVirtualMedia => host.client.eject_virtual_media().await,
        Operation::RemoteDirect { iso_url } => host.client.remote_direct(iso_url).await,
    }
}

/// Fan an operation out over already selected hosts.
pub(crate) async fn run_batch(
    hosts: Vec<Host>,
    operation: Operation,
    mut options: BatchRunOptions,
) -> Result<()> {
    debug!("Running {} on {} host(s)", operation, hosts.len());
    let limit = options.max_in_flight.unwrap_or(hosts.len()).max(1);
    let cancellation = options
        .cancellation
        .take()
        .unwrap_or_else(CancellationToken::new);
    let events = options.events.take();

    let outcomes: Vec<(String, Result<()>)> = stream::iter(hosts.into_iter().map(|host| {
        let cancellation = cancellation.clone();
        let operation = operation.clone();
        async move {
            let result = tokio::select! {
                _ = cancellation.cancelled() => Err(Error::new(
                    ErrorKind::Cancelled,
                    format!("{} on host {} was cancelled", operation, host.name),
                )),
                result = run_on_host(&host, &operation) => result,
            };
            (host.name, result)
        }
    }))
    .buffer_unordered(limit)
    .collect()
    .await;

    let mut failures = Vec::new();
    let mut cancelled = false;
    for (name, result) in outcomes {
        let error = result.err().map(|e| e.with_host(&name));
        if let Some(events) = &events {
            // A dropped receiver must not fail the batch.
            let _ = events.send(Event {
                host: name.clone(),
                operation: operation.clone(),
                error: error.clone(),
            });
        }

        match error {
            Some(error) => {
                debug!("{} failed on host {}: {}", operation, name, error);
                if error.kind() == ErrorKind::Cancelled {
                    cancelled = true;
                }
                failures.push(error);
            }
            None => trace!("{} succeeded on host {}", operation, name),
        }
    }

    if cancelled {
        return Err(Error::new(
            ErrorKind::Cancelled,
            format!("{} was cancelled", operation),
        ));
    }
    if !failures.is_empty() {
        return Err(Error::new_operation_failed(failures));
    }
    Ok(())
}
