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

//! Out-of-band management of bare metal hosts over Redfish.
//!
//! This crate drives baseboard management controllers: power control,
//! virtual media and boot source overrides, either on one host or fanned
//! out concurrently over a whole inventory.
//!
//! # Example
//!
//! ```rust,no_run
//! use redfish_remote::inventory::{
//!     BatchRunOptions, HostSelector, Inventory, Operation, YamlSource,
//! };
//! use redfish_remote::ManagementConfiguration;
//!
//! # async fn example() -> redfish_remote::Result<()> {
//! let source = YamlSource::from_path("hosts.yaml")?;
//! let inventory = Inventory::new(ManagementConfiguration::default(), Box::new(source));
//!
//! let selector = HostSelector::default().by_label("host-group=control-plane");
//! inventory
//!     .run_operation(Operation::Reboot, &selector, BatchRunOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! A single host can also be picked out and driven directly:
//!
//! ```rust,no_run
//! # use redfish_remote::inventory::{HostSelector, Inventory};
//! # async fn example(inventory: Inventory) -> redfish_remote::Result<()> {
//! let host = inventory.select_one(&HostSelector::default().by_name("master-0"))?;
//! host.client().power_on().await?;
//! # Ok(())
//! # }
//! ```

#![crate_name = "redfish_remote"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
#![deny(
    bare_trait_objects,
    missing_debug_implementations,
    non_shorthand_field_patterns,
    overflowing_literals,
    patterns_in_fns_without_body,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused_allocation,
    unused_comparisons,
    unused_extern_crates,
    unused_import_braces,
    unused_parens,
    while_true
)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

mod client;
pub mod config;
mod error;
pub mod events;
pub mod inventory;
pub mod redfish;
mod session;
mod utils;

pub use client::{Backoff, NoDelay, RemoteClient, TimerBackoff};
pub use config::ManagementConfiguration;
pub use error::{Error, ErrorKind, Result};
pub use session::Session;
