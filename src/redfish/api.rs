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

use async_trait::async_trait;
use serde_json::Value;

use super::protocol::*;
use super::types::{BootSource, ResetType};
use crate::session::Session;
use crate::utils;
use crate::Result;

/// The out-of-band REST operations this crate consumes.
///
/// Implemented over a live [`Session`] by [`HttpApi`]; tests substitute a
/// scripted double so no transport is involved.
#[async_trait]
pub trait RedfishApi: Send + Sync {
    /// Fetch one computer system.
    async fn get_system(&self, system_id: &str) -> Result<ComputerSystem>;

    /// Request a system reset.
    async fn reset_system(&self, system_id: &str, reset_type: ResetType) -> Result<()>;

    /// Set a one-time boot source override.
    async fn set_boot_override(&self, system_id: &str, target: BootSource) -> Result<()>;

    /// List the identifiers of the manager's virtual media slots.
    async fn list_virtual_media(&self, manager_id: &str) -> Result<Vec<String>>;

    /// Fetch one virtual media slot.
    async fn get_virtual_media(&self, manager_id: &str, media_id: &str) -> Result<VirtualMedia>;

    /// Eject the image from a virtual media slot.
    async fn eject_virtual_media(&self, manager_id: &str, media_id: &str) -> Result<()>;

    /// Insert an image into a virtual media slot.
    async fn insert_virtual_media(&self, manager_id: &str, media_id: &str, image: &str)
        -> Result<()>;

    /// Invoke the OEM system configuration import action of a manager.
    ///
    /// Not part of the standard data model; used by vendor-specialized
    /// clients (currently the Dell iDRAC one).
    async fn import_system_config(&self, manager_id: &str, body: Value) -> Result<()>;
}

/// Live implementation of [`RedfishApi`] over an HTTP session.
#[derive(Debug, Clone)]
pub struct HttpApi {
    session: Session,
}

impl HttpApi {
    /// Create an API implementation bound to the given session.
    pub fn new(session: Session) -> HttpApi {
        HttpApi { session }
    }
}

const ROOT: &[&str] = &["redfish", "v1"];

fn path<'a>(segments: &'a [&'a str]) -> Vec<&'a str> {
    let mut result = Vec::with_capacity(ROOT.len() + segments.len());
    result.extend_from_slice(ROOT);
    result.extend_from_slice(segments);
    result
}

#[async_trait]
impl RedfishApi for HttpApi {
    async fn get_system(&self, system_id: &str) -> Result<ComputerSystem> {
        let system: ComputerSystem = self
            .session
            .get_json(&path(&["Systems", system_id]))
            .await?;
        trace!("Received {:?}", system);
        Ok(system)
    }

    async fn reset_system(&self, system_id: &str, reset_type: ResetType) -> Result<()> {
        trace!("Resetting system {} with {}", system_id, reset_type);
        let body = ResetRequestBody { reset_type };
        let _ = self
            .session
            .post(
                &path(&["Systems", system_id, "Actions", "ComputerSystem.Reset"]),
                &body,
            )
            .await?;
        Ok(())
    }

    async fn set_boot_override(&self, system_id: &str, target: BootSource) -> Result<()> {
        trace!("Overriding boot source of {} to {}", system_id, target);
        let body = BootOverrideRequestBody::once(target);
        let _ = self
            .session
            .patch(&path(&["Systems", system_id]), &body)
            .await?;
        Ok(())
    }

    async fn list_virtual_media(&self, manager_id: &str) -> Result<Vec<String>> {
        let collection: Collection = self
            .session
            .get_json(&path(&["Managers", manager_id, "VirtualMedia"]))
            .await?;
        trace!("Received virtual media collection {:?}", collection);
        Ok(collection
            .members
            .iter()
            .map(|member| utils::url::odata_id_leaf(&member.odata_id).to_string())
            .collect())
    }

    async fn get_virtual_media(&self, manager_id: &str, media_id: &str) -> Result<VirtualMedia> {
        let media: VirtualMedia = self
            .session
            .get_json(&path(&["Managers", manager_id, "VirtualMedia", media_id]))
            .await?;
        trace!("Received {:?}", media);
        Ok(media)
    }

    async fn eject_virtual_media(&self, manager_id: &str, media_id: &str) -> Result<()> {
        trace!("Ejecting media {} on manager {}", media_id, manager_id);
        let _ = self
            .session
            .post(
                &path(&[
                    "Managers",
                    manager_id,
                    "VirtualMedia",
                    media_id,
                    "Actions",
                    "VirtualMedia.EjectMedia",
                ]),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    async fn insert_virtual_media(
        &self,
        manager_id: &str,
        media_id: &str,
        image: &str,
    ) -> Result<()> {
        trace!("Inserting {} into media {}", image, media_id);
        let body = InsertMediaRequestBody {
            image: image.to_string(),
            inserted: true,
        };
        let _ = self
            .session
            .post(
                &path(&[
                    "Managers",
                    manager_id,
                    "VirtualMedia",
                    media_id,
                    "Actions",
                    "VirtualMedia.InsertMedia",
                ]),
                &body,
            )
            .await?;
        Ok(())
    }

    async fn import_system_config(&self, manager_id: &str, body: Value) -> Result<()> {
        trace!("Importing system configuration on manager {}", manager_id);
        let _ = self
            .session
            .post(
                &path(&[
                    "Managers",
                    manager_id,
                    "Actions",
                    "Oem",
                    "EID_674_Manager.ImportSystemConfiguration",
                ]),
                &body,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! A scripted stand-in for the live transport.
    //!
    //! Responses are queued per call kind; the last queued response repeats
    //! once the queue runs down to it, matching how firmware keeps
    //! answering the same thing. Every call is recorded so tests can
    //! assert exact call order.

    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::super::protocol::{ComputerSystem, VirtualMedia};
    use super::super::types::{BootSource, ResetType};
    use super::RedfishApi;
    use crate::{Error, Result};

    #[derive(Default)]
    pub(crate) struct MockApi {
        calls: Mutex<Vec<String>>,
        systems: Mutex<VecDeque<::std::result::Result<ComputerSystem, Error>>>,
        media_list: Vec<String>,
        media: Mutex<HashMap<String, VecDeque<VirtualMedia>>>,
        reset_error: Option<Error>,
        insert_error: Option<Error>,
        boot_override_error: Option<Error>,
        import_error: Option<Error>,
    }

    fn pop<T: Clone>(queue: &mut VecDeque<T>, what: &str) -> T {
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| panic!("no scripted response for {}", what))
        }
    }

    impl MockApi {
        pub(crate) fn new() -> MockApi {
            MockApi::default()
        }

        pub(crate) fn with_system(self, system: ComputerSystem) -> Self {
            self.systems.lock().unwrap().push_back(Ok(system));
            self
        }

        pub(crate) fn with_system_error(self, error: Error) -> Self {
            self.systems.lock().unwrap().push_back(Err(error));
            self
        }

        pub(crate) fn with_media_list<I: IntoIterator<Item = &'static str>>(
            mut self,
            ids: I,
        ) -> Self {
            self.media_list = ids.into_iter().map(String::from).collect();
            self
        }

        pub(crate) fn with_media(self, id: &str, media: VirtualMedia) -> Self {
            self.media
                .lock()
                .unwrap()
                .entry(id.to_string())
                .or_default()
                .push_back(media);
            self
        }

        pub(crate) fn with_reset_error(mut self, error: Error) -> Self {
            self.reset_error = Some(error);
            self
        }

        pub(crate) fn with_insert_error(mut self, error: Error) -> Self {
            self.insert_error = Some(error);
            self
        }

        pub(crate) fn with_import_error(mut self, error: Error) -> Self {
            self.import_error = Some(error);
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl RedfishApi for MockApi {
        async fn get_system(&self, _system_id: &str) -> Result<ComputerSystem> {
            self.record("GetSystem".into());
            pop(&mut self.systems.lock().unwrap(), "GetSystem")
        }

        async fn reset_system(&self, _system_id: &str, reset_type: ResetType) -> Result<()> {
            self.record(format!("ResetSystem({})", reset_type));
            match &self.reset_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn set_boot_override(&self, _system_id: &str, target: BootSource) -> Result<()> {
            self.record(format!("SetBootOverride({})", target));
            match &self.boot_override_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn list_virtual_media(&self, _manager_id: &str) -> Result<Vec<String>> {
            self.record("ListVirtualMedia".into());
            Ok(self.media_list.clone())
        }

        async fn get_virtual_media(
            &self,
            _manager_id: &str,
            media_id: &str,
        ) -> Result<VirtualMedia> {
            self.record(format!("GetVirtualMedia({})", media_id));
            let mut media = self.media.lock().unwrap();
            let queue = media
                .get_mut(media_id)
                .unwrap_or_else(|| panic!("no scripted media {}", media_id));
            Ok(pop(queue, media_id))
        }

        async fn eject_virtual_media(&self, _manager_id: &str, media_id: &str) -> Result<()> {
            self.record(format!("EjectVirtualMedia({})", media_id));
            Ok(())
        }

        async fn insert_virtual_media(
            &self,
            _manager_id: &str,
            media_id: &str,
            image: &str,
        ) -> Result<()> {
            self.record(format!("InsertVirtualMedia({}, {})", media_id, image));
            match &self.insert_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        async fn import_system_config(&self, manager_id: &str, _body: Value) -> Result<()> {
            self.record(format!("ImportSystemConfig({})", manager_id));
            match &self.import_error {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }
    }

    // Tests hand the client a clone of the handle and keep the other to
    // inspect the call log afterwards.
    #[async_trait]
    impl RedfishApi for Arc<MockApi> {
        async fn get_system(&self, system_id: &str) -> Result<ComputerSystem> {
            <MockApi as RedfishApi>::get_system(&**self, system_id).await
        }

        async fn reset_system(&self, system_id: &str, reset_type: ResetType) -> Result<()> {
            <MockApi as RedfishApi>::reset_system(&**self, system_id, reset_type).await
        }

        async fn set_boot_override(&self, system_id: &str, target: BootSource) -> Result<()> {
            <MockApi as RedfishApi>::set_boot_override(&**self, system_id, target).await
        }

        async fn list_virtual_media(&self, manager_id: &str) -> Result<Vec<String>> {
            <MockApi as RedfishApi>::list_virtual_media(&**self, manager_id).await
        }

        async fn get_virtual_media(
            &self,
            manager_id: &str,
            media_id: &str,
        ) -> Result<VirtualMedia> {
            <MockApi as RedfishApi>::get_virtual_media(&**self, manager_id, media_id).await
        }

        async fn eject_virtual_media(&self, manager_id: &str, media_id: &str) -> Result<()> {
            <MockApi as RedfishApi>::eject_virtual_media(&**self, manager_id, media_id).await
        }

        async fn insert_virtual_media(
            &self,
            manager_id: &str,
            media_id: &str,
            image: &str,
        ) -> Result<()> {
            <MockApi as RedfishApi>::insert_virtual_media(&**self, manager_id, media_id, image).await
        }

        async fn import_system_config(&self, manager_id: &str, body: Value) -> Result<()> {
            <MockApi as RedfishApi>::import_system_config(&**self, manager_id, body).await
        }
    }
}
