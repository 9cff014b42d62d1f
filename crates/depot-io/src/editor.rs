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

//! A development backend that rebuilds its package from sources on init.

use crate::BuiltinFileSystem;
use async_trait::async_trait;
use depot_core::{
    ChecksumAlgorithm, DepotError, DepotResult, FileSystem, FileSystemKind, InitResult,
    ManifestBundle, ManifestResult, PackageBuilder, ResourceVersion,
};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Stands in for a shipped package during development.
///
/// `init` runs the external build step, then serves the produced directory
/// read-only. The root directory is empty until the build has run.
pub struct EditorSimulatedFileSystem {
    builder: Arc<dyn PackageBuilder>,
    package_name: String,
    checksum: ChecksumAlgorithm,
    package: OnceLock<BuiltinFileSystem>,
}

impl EditorSimulatedFileSystem {
    /// Creates a backend that builds its package with `builder`.
    pub fn new(
        builder: Arc<dyn PackageBuilder>,
        package_name: impl Into<String>,
        checksum: ChecksumAlgorithm,
    ) -> Self {
        Self {
            builder,
            package_name: package_name.into(),
            checksum,
            package: OnceLock::new(),
        }
    }

    fn package(&self) -> DepotResult<&BuiltinFileSystem> {
        self.package
            .get()
            .ok_or(DepotError::NotInitialized("editor-simulated file system"))
    }
}

#[async_trait]
impl FileSystem for EditorSimulatedFileSystem {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::EditorSimulated
    }

    fn root_directory(&self) -> &Path {
        self.package
            .get()
            .map(|package| package.root_directory())
            .unwrap_or(Path::new(""))
    }

    fn file_count(&self) -> usize {
        self.package.get().map_or(0, |package| package.file_count())
    }

    async fn init(&self) -> InitResult {
        log::info!(
            "Simulating a build of '{}' into '{}'",
            self.package_name,
            self.builder.output_directory().display()
        );
        let root = self.builder.build().await?;

        let package = BuiltinFileSystem::new(root, self.package_name.clone(), self.checksum);
        package.init().await?;
        if self.package.set(package).is_err() {
            log::warn!("Editor-simulated file system was initialized twice; keeping the first build");
        }
        Ok(())
    }

    async fn load_resource_version(&self, timeout: Duration) -> DepotResult<ResourceVersion> {
        self.package()?.load_resource_version(timeout).await
    }

    async fn load_manifest(&self, version: &ResourceVersion, timeout: Duration) -> ManifestResult {
        self.package()?.load_manifest(version, timeout).await
    }

    async fn load_bundle_bytes(
        &self,
        bundle: &ManifestBundle,
        timeout: Duration,
    ) -> DepotResult<Vec<u8>> {
        self.package()?.load_bundle_bytes(bundle, timeout).await
    }
}
