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

//! The development kernel over a package rebuilt from sources.

use crate::report::{UpdateOptions, UpdateReport};
use crate::state::{LoadedState, StateCell};
use crate::traits::ResourceKernel;
use async_trait::async_trait;
use depot_core::{
    BuildMode, DepotError, DepotResult, FileSystem, InitResult, ManifestBundle,
};
use depot_io::EditorSimulatedFileSystem;
use std::sync::Arc;
use std::time::Duration;

const KERNEL: &str = "editor-simulate kernel";

/// Serves an [`EditorSimulatedFileSystem`]. The package is rebuilt at init,
/// so it is always current: there is nothing to diff or download.
pub struct EditorSimulateKernel {
    file_system: EditorSimulatedFileSystem,
    io_timeout: Duration,
    state: StateCell,
}

impl EditorSimulateKernel {
    /// Creates a kernel over `file_system`.
    pub fn new(file_system: EditorSimulatedFileSystem, io_timeout: Duration) -> Self {
        Self {
            file_system,
            io_timeout,
            state: StateCell::default(),
        }
    }

    /// The simulated file system.
    pub fn file_system(&self) -> &EditorSimulatedFileSystem {
        &self.file_system
    }
}

#[async_trait]
impl ResourceKernel for EditorSimulateKernel {
    fn mode(&self) -> BuildMode {
        BuildMode::EditorSimulate
    }

    async fn init(&self) -> InitResult {
        self.file_system.init().await?;
        let version = self.file_system.load_resource_version(self.io_timeout).await?;
        let manifest = self.file_system.load_manifest(&version, self.io_timeout).await?;
        log::info!(
            "Editor simulation serves {} ({} bundles)",
            version,
            manifest.len()
        );
        self.state.store(LoadedState::new(manifest));
        Ok(())
    }

    fn state(&self) -> Option<Arc<LoadedState>> {
        self.state.load()
    }

    async fn get_updatable_bundles(&self) -> DepotResult<Vec<ManifestBundle>> {
        self.state.require(KERNEL)?;
        Ok(Vec::new())
    }

    async fn update_bundles(
        &self,
        bundles: &[ManifestBundle],
        _options: UpdateOptions,
    ) -> DepotResult<UpdateReport> {
        self.state.require(KERNEL)?;
        if bundles.is_empty() {
            Ok(UpdateReport::default())
        } else {
            Err(DepotError::unsupported(
                "update_bundles",
                self.file_system.kind().name(),
            ))
        }
    }

    async fn load_asset_by_path(&self, path: &str) -> DepotResult<Vec<u8>> {
        let state = self.state.require(KERNEL)?;
        let bundle = state
            .manifest()
            .bundle(path)
            .ok_or_else(|| DepotError::NotFound {
                location: path.to_string(),
            })?;
        self.file_system
            .load_bundle_bytes(bundle, self.io_timeout)
            .await
    }
}
