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

//! Various utilities.

pub mod url {
    //! Handy primitives for working with URLs.

    use reqwest::Url;

    #[inline]
    #[allow(unused_results)]
    pub fn extend(mut url: Url, segments: &[&str]) -> Url {
        url.path_segments_mut()
            .expect("URL cannot be a base")
            .pop_if_empty()
            .extend(segments);
        url
    }

    /// The last non-empty path segment, if any.
    #[inline]
    pub fn last_segment(url: &Url) -> Option<&str> {
        url.path_segments()?.filter(|x| !x.is_empty()).next_back()
    }

    /// The last segment of an odata identifier path.
    ///
    /// Redfish references resources by `@odata.id` paths like
    /// `/redfish/v1/Managers/iDRAC.Embedded.1`; only the trailing segment is
    /// needed to address the resource through the typed API.
    #[inline]
    pub fn odata_id_leaf(odata_id: &str) -> &str {
        odata_id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(odata_id)
    }
}
