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

//! Session structure definition.
//!
//! The Session object serves as a wrapper around an HTTP(s) client, handling
//! the BMC endpoint, basic authentication and response checking.

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::kind_from_status;
use super::utils;
use super::{Error, ErrorKind, Result};

/// A session with one BMC endpoint.
///
/// Owns the credentials and the underlying HTTP client. All request paths
/// are rooted at the Redfish service root of the endpoint.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl Session {
    /// Create a new session against the given endpoint.
    ///
    /// `endpoint` is the bare `scheme://host:port` of the BMC. With
    /// `insecure`, certificate verification is disabled (self-signed BMC
    /// certificates are the rule, not the exception). Unless `use_proxy` is
    /// set, system proxy settings are ignored.
    pub fn new<S1, S2>(
        endpoint: Url,
        username: S1,
        password: S2,
        insecure: bool,
        use_proxy: bool,
    ) -> Result<Session>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let mut builder = Client::builder().danger_accept_invalid_certs(insecure);
        if !use_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build()?;
        Ok(Session {
            client,
            endpoint,
            username: username.into(),
            password: password.into(),
        })
    }

    /// The BMC endpoint this session is bound to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Start a request against a path under the Redfish service root.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = utils::url::extend(self.endpoint.clone(), segments);
        let mut builder = self.client.request(method, url);
        if !self.username.is_empty() || !self.password.is_empty() {
            builder = builder.basic_auth(&self.username, Some(&self.password));
        }
        builder
    }

    /// Issue a GET request and decode the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = check(self.request(Method::GET, segments).send().await?).await?;
        response.json::<T>().await.map_err(|e| {
            Error::new(
                ErrorKind::InvalidResponse,
                format!("Failed to decode BMC response: {}", e),
            )
        })
    }

    /// Issue a POST request with a JSON body.
    pub(crate) async fn post<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<Response> {
        check(
            self.request(Method::POST, segments)
                .json(body)
                .send()
                .await?,
        )
        .await
    }

    /// Issue a PATCH request with a JSON body.
    pub(crate) async fn patch<B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<Response> {
        check(
            self.request(Method::PATCH, segments)
                .json(body)
                .send()
                .await?,
        )
        .await
    }
}

/// Convert a non-success response into a typed error carrying its status
/// and body.
pub(crate) async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    trace!("BMC returned HTTP {}: {}", status, body);
    Err(Error::new_with_details(
        kind_from_status(status),
        Some(status),
        Some(body),
    ))
}
