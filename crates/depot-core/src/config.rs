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

//! Startup configuration of the resource runtime, read from `Depot.toml`.

use crate::checksum::ChecksumAlgorithm;
use crate::error::{DepotError, DepotResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which kernel drives the file systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Rebuild a local package from sources on every run. Development only.
    EditorSimulate,
    /// Built-in package plus a cache updated from a remote origin.
    #[default]
    Online,
}

/// Represents the structure of the `Depot.toml` configuration file.
///
/// Host server entries are URL templates. `{package}` is replaced with the
/// package name and `{file}` with the requested file name; a template without
/// `{file}` gets the file name appended as a path segment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepotConfig {
    /// Kernel mode.
    pub mode: BuildMode,
    /// Name of the main package.
    pub package_name: String,
    /// Primary origin URL template.
    pub host_server: Option<String>,
    /// Fallback origin URL template. Defaults to the primary one.
    pub fallback_host_server: Option<String>,
    /// Maximum number of simultaneous bundle downloads.
    pub max_concurrent_downloads: usize,
    /// Attempts per bundle before a download failure becomes terminal.
    pub failed_retry_count: u32,
    /// Per-attempt download timeout, in seconds.
    pub download_timeout_secs: u64,
    /// Timeout of local reads (version marker, manifest), in seconds.
    pub io_timeout_secs: u64,
    /// Checksum algorithm of manifests and bundles.
    pub checksum: ChecksumAlgorithm,
    /// Root of the package shipped with the executable.
    pub builtin_root: PathBuf,
    /// Root of the writable cache.
    pub cache_root: PathBuf,
    /// Source directory packed by the editor simulation build.
    pub simulate_source: PathBuf,
    /// Output directory of the editor simulation build.
    pub simulate_output: PathBuf,
}

impl Default for DepotConfig {
    /// Provides a default configuration if `Depot.toml` is not found.
    fn default() -> Self {
        Self {
            mode: BuildMode::Online,
            package_name: "DefaultPackage".to_string(),
            host_server: None,
            fallback_host_server: None,
            max_concurrent_downloads: 10,
            failed_retry_count: 3,
            download_timeout_secs: 60,
            io_timeout_secs: 10,
            checksum: ChecksumAlgorithm::Md5,
            builtin_root: PathBuf::from("package"),
            cache_root: PathBuf::from(".cache/depot"),
            simulate_source: PathBuf::from("resources/assets"),
            simulate_output: PathBuf::from(".dist/simulate"),
        }
    }
}

impl DepotConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> DepotResult<Self> {
        let config: DepotConfig =
            toml::from_str(text).map_err(|e| DepotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> DepotResult<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loading depot configuration from '{}'", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!(
                    "No '{}' found. Using default configuration.",
                    path.display()
                );
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(DepotError::io(path, e)),
        }
    }

    /// Rejects configurations the kernel cannot start with.
    pub fn validate(&self) -> DepotResult<()> {
        if self.package_name.trim().is_empty() {
            return Err(DepotError::Config("package_name must not be empty".into()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(DepotError::Config(
                "max_concurrent_downloads must be at least 1".into(),
            ));
        }
        if self.failed_retry_count == 0 {
            return Err(DepotError::Config(
                "failed_retry_count must be at least 1".into(),
            ));
        }
        if self.download_timeout_secs == 0 || self.io_timeout_secs == 0 {
            return Err(DepotError::Config("timeouts must be at least 1s".into()));
        }
        Ok(())
    }

    /// Primary host template. Only the online kernel requires one, so its
    /// absence is reported here rather than by [`DepotConfig::validate`].
    pub fn require_host_server(&self) -> DepotResult<&str> {
        self.host_server
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| DepotError::Config("online mode requires host_server".into()))
    }

    /// Fallback host template, or the primary one when none is configured.
    pub fn fallback_host_server(&self) -> DepotResult<&str> {
        match self.fallback_host_server.as_deref() {
            Some(fallback) if !fallback.trim().is_empty() => Ok(fallback),
            _ => self.require_host_server(),
        }
    }

    /// Per-attempt download timeout.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Local read timeout.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}
