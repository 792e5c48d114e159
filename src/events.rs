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

//! Progress events of batch operations.

use std::fmt;

use tokio::sync::mpsc;

use crate::inventory::Operation;
use crate::Error;

/// Outcome of one operation on one host.
#[derive(Debug, Clone)]
pub struct Event {
    /// Name of the host the operation ran on.
    pub host: String,
    /// The operation that ran.
    pub operation: Operation,
    /// The failure, if the operation did not succeed.
    pub error: Option<Error>,
}

impl Event {
    /// Whether the operation succeeded on this host.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{} failed on {}: {}", self.operation, self.host, error),
            None => write!(f, "{} succeeded on {}", self.operation, self.host),
        }
    }
}

/// Where batch operations report per-host outcomes.
///
/// Unbounded so a slow consumer never stalls the batch.
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Create a channel for batch operation events.
pub fn channel() -> (EventSender, mpsc::UnboundedReceiver<Event>) {
    mpsc::unbounded_channel()
}
