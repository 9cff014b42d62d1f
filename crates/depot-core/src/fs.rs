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

//! The contract shared by every storage backend, and the naming conventions
//! that lay a package out on disk or on a remote origin.
//!
//! A package root looks the same wherever it lives:
//!
//! ```text
//! <root>/
//!   <package>.version           version marker (text)
//!   <package>_<version>.hash    checksum of the binary manifest (text)
//!   <package>_<version>.bytes   binary manifest
//!   bundles/<file_name>         one file per bundle
//! ```

use crate::error::{DepotError, DepotResult};
use crate::manifest::{Manifest, ManifestBundle};
use crate::resource::ResourceVersion;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Outcome of [`FileSystem::init`].
pub type InitResult = DepotResult<()>;

/// Outcome of [`FileSystem::load_manifest`].
pub type ManifestResult = DepotResult<Manifest>;

/// Name of the directory holding bundle files under a package root.
pub const BUNDLE_DIRECTORY: &str = "bundles";

/// Suffix of a download that has not been verified yet.
pub const PARTIAL_SUFFIX: &str = ".part";

/// The file names that make up one package, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    package_name: String,
}

impl PackageLayout {
    /// Creates the layout of the named package.
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
        }
    }

    /// The package name.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// File name of the version marker.
    pub fn version_file_name(&self) -> String {
        format!("{}.version", self.package_name)
    }

    /// File name of the hash marker for `version`.
    pub fn hash_file_name(&self, version: &ResourceVersion) -> String {
        format!("{}_{}.hash", self.package_name, version)
    }

    /// File name of the binary manifest for `version`.
    pub fn manifest_file_name(&self, version: &ResourceVersion) -> String {
        format!("{}_{}.bytes", self.package_name, version)
    }

    /// Path of a bundle below `root`.
    pub fn bundle_path(&self, root: &Path, file_name: &str) -> PathBuf {
        let mut path = root.join(BUNDLE_DIRECTORY);
        for segment in file_name.split('/') {
            path.push(segment);
        }
        path
    }

    /// Bundle directory below `root`.
    pub fn bundle_directory(&self, root: &Path) -> PathBuf {
        root.join(BUNDLE_DIRECTORY)
    }
}

/// Identifies a backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileSystemKind {
    /// Read-only package shipped with the executable.
    Builtin,
    /// Development package rebuilt from sources on every run.
    EditorSimulated,
    /// Writable local storage fronted by a remote origin.
    Cache,
}

impl FileSystemKind {
    /// Human-readable backend name, used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Builtin => "built-in",
            Self::EditorSimulated => "editor-simulated",
            Self::Cache => "cache",
        }
    }
}

impl fmt::Display for FileSystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A storage backend able to answer version, manifest and bundle queries.
///
/// Every suspending operation takes an explicit timeout and completes with a
/// [`DepotError::Timeout`] rather than hanging. Operations a backend does not
/// implement fail with [`DepotError::Unsupported`]; they are never silent
/// no-ops.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Which variant this is.
    fn kind(&self) -> FileSystemKind;

    /// The storage root. Empty until a backend that discovers its root at
    /// init time has been initialized.
    fn root_directory(&self) -> &Path;

    /// Number of bundle files materialized under the root.
    fn file_count(&self) -> usize;

    /// Validates the root and counts its files. Call once.
    async fn init(&self) -> InitResult;

    /// Reads the version marker.
    async fn load_resource_version(&self, timeout: Duration) -> DepotResult<ResourceVersion>;

    /// Loads the manifest of `version`, verifying its checksum before decoding.
    async fn load_manifest(&self, version: &ResourceVersion, timeout: Duration) -> ManifestResult;

    /// Reads the bytes of a bundle, verified against its manifest hash.
    async fn load_bundle_bytes(
        &self,
        bundle: &ManifestBundle,
        timeout: Duration,
    ) -> DepotResult<Vec<u8>>;

    /// Whether the bundle is absent locally or stored with a different checksum.
    async fn check_bundle_updatable(
        &self,
        _bundle: &ManifestBundle,
        _version: &ResourceVersion,
        _timeout: Duration,
    ) -> DepotResult<bool> {
        Err(DepotError::unsupported(
            "check_bundle_updatable",
            self.kind().name(),
        ))
    }

    /// Fetches one bundle from the remote origin into local storage.
    async fn download_file(
        &self,
        _bundle: &ManifestBundle,
        _version: &ResourceVersion,
        _retry_count: u32,
        _timeout: Duration,
    ) -> DepotResult<()> {
        Err(DepotError::unsupported("download_file", self.kind().name()))
    }

    /// Removes every bundle file. Returns how many were removed.
    async fn clear_all_bundle_files(&self) -> DepotResult<usize> {
        Err(DepotError::unsupported(
            "clear_all_bundle_files",
            self.kind().name(),
        ))
    }

    /// Removes every bundle file `manifest` does not reference. Returns how
    /// many were removed.
    async fn clear_all_unused_bundle_files(&self, _manifest: &Manifest) -> DepotResult<usize> {
        Err(DepotError::unsupported(
            "clear_all_unused_bundle_files",
            self.kind().name(),
        ))
    }
}
