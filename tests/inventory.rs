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

//! Tests of the public inventory surface.
//!
//! The BMC addresses point at a port nothing listens on, so transport
//! attempts fail fast with a connection error.

use redfish_remote::inventory::{
    BatchRunOptions, HostSelector, Inventory, Operation, YamlSource,
};
use redfish_remote::{events, ErrorKind, ManagementConfiguration, RemoteClient};

const BUNDLE: &str = r#"
apiVersion: metal3.io/v1alpha1
kind: BareMetalHost
metadata:
  name: master-0
  labels:
    host-group: control-plane
spec:
  bmc:
    address: redfish+https://127.0.0.1:1/redfish/v1/Systems/System.Embedded.1
    credentialsName: bmc-creds
---
apiVersion: metal3.io/v1alpha1
kind: BareMetalHost
metadata:
  name: master-1
  labels:
    host-group: control-plane
spec:
  bmc:
    address: redfish+https://127.0.0.1:1/redfish/v1/Systems/System.Embedded.2
    credentialsName: bmc-creds
---
apiVersion: v1
kind: Secret
metadata:
  name: bmc-creds
stringData:
  username: admin
  password: password
"#;

fn new_inventory(management_type: &str) -> Inventory {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = ManagementConfiguration {
        management_type: management_type.to_string(),
        system_action_retries: 1,
        system_reboot_delay: 0,
        ..Default::default()
    };
    let source = YamlSource::from_yaml(BUNDLE).expect("cannot parse the test bundle");
    Inventory::new(config, Box::new(source))
}

#[tokio::test]
async fn test_select_one_builds_a_usable_client() {
    let inventory = new_inventory("redfish");
    let host = inventory
        .select_one(&HostSelector::default().by_name("master-1"))
        .expect("cannot select master-1");
    assert_eq!(host.name, "master-1");
    assert_eq!(host.client().node_id(), "System.Embedded.2");
}

#[tokio::test]
async fn test_power_on_unreachable_bmc_reports_each_host() {
    let inventory = new_inventory("redfish");
    let selector = HostSelector::default().by_label("host-group=control-plane");
    let err = inventory
        .run_operation(Operation::PowerOn, &selector, BatchRunOptions::default())
        .await
        .expect_err("unreachable BMCs must fail the batch");
    assert_eq!(err.kind(), ErrorKind::OperationFailed);
    assert_eq!(err.host_failures().len(), 2);
    let mut hosts: Vec<_> = err
        .host_failures()
        .iter()
        .filter_map(|failure| failure.host())
        .collect();
    hosts.sort_unstable();
    assert_eq!(hosts, vec!["master-0", "master-1"]);
}

#[tokio::test]
async fn test_events_arrive_for_every_host() {
    let inventory = new_inventory("redfish-dell");
    let selector = HostSelector::default().by_label("host-group=control-plane");
    let (sender, mut receiver) = events::channel();
    let options = BatchRunOptions {
        events: Some(sender),
        ..Default::default()
    };
    let result = inventory
        .run_operation(Operation::EjectVirtualMedia, &selector, options)
        .await;
    assert!(result.is_err());

    let mut seen = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        assert!(!event.succeeded());
        seen.push(event.host);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec!["master-0", "master-1"]);
}
