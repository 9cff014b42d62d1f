// Copyright 2025 eraflo
//
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

//! URL resolution from host server templates.

use depot_core::{DepotConfig, DepotResult, RemoteService};

/// A [`RemoteService`] built from the primary and fallback host templates.
///
/// `{package}` expands to the package name and `{file}` to the requested file
/// name. A template without `{file}` has the file name appended as a path
/// segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostServerRemote {
    package_name: String,
    primary: String,
    fallback: String,
}

impl HostServerRemote {
    /// Creates a remote from explicit templates.
    pub fn new(
        package_name: impl Into<String>,
        primary: impl Into<String>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Creates a remote from the host servers of a configuration.
    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        Ok(Self::new(
            config.package_name.clone(),
            config.require_host_server()?,
            config.fallback_host_server()?,
        ))
    }

    fn expand(&self, template: &str, file_name: &str) -> String {
        let with_package = template.replace("{package}", &self.package_name);
        if with_package.contains("{file}") {
            with_package.replace("{file}", file_name)
        } else {
            format!("{}/{}", with_package.trim_end_matches('/'), file_name)
        }
    }
}

impl RemoteService for HostServerRemote {
    fn remote_url(&self, file_name: &str) -> String {
        self.expand(&self.primary, file_name)
    }

    fn fallback_remote_url(&self, file_name: &str) -> String {
        self.expand(&self.fallback, file_name)
    }
}
