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

//! The capability interface shared by every kernel.

use crate::report::{UpdateOptions, UpdateReport};
use crate::state::LoadedState;
use async_trait::async_trait;
use depot_core::{BuildMode, DepotResult, InitResult, ManifestBundle, ResourceName};
use std::sync::Arc;

/// A kernel owns the file systems of one build mode and the currently
/// loaded version and manifest.
///
/// The loaded state is replaced as a whole, so readers always observe a
/// version together with the manifest that belongs to it.
#[async_trait]
pub trait ResourceKernel: Send + Sync {
    /// The build mode this kernel implements.
    fn mode(&self) -> BuildMode;

    /// Initializes the file systems and loads the current manifest.
    ///
    /// Every later operation fails with
    /// [`DepotError::NotInitialized`](depot_core::DepotError::NotInitialized)
    /// until this has succeeded.
    async fn init(&self) -> InitResult;

    /// The loaded version and manifest, if [`ResourceKernel::init`] succeeded.
    fn state(&self) -> Option<Arc<LoadedState>>;

    /// Bundles of the loaded manifest that must be downloaded, in manifest
    /// order.
    async fn get_updatable_bundles(&self) -> DepotResult<Vec<ManifestBundle>>;

    /// Downloads `bundles` with bounded concurrency.
    ///
    /// A failing bundle never aborts the batch: every distinct input bundle
    /// ends up in the returned report, either as succeeded or as failed with
    /// its own error.
    async fn update_bundles(
        &self,
        bundles: &[ManifestBundle],
        options: UpdateOptions,
    ) -> DepotResult<UpdateReport>;

    /// Returns the verified bytes of the bundle whose file name is `path`.
    async fn load_asset_by_path(&self, path: &str) -> DepotResult<Vec<u8>>;

    /// Returns the verified bytes of the bundle named by `address`.
    async fn load_asset_by_address(&self, address: &ResourceName) -> DepotResult<Vec<u8>> {
        self.load_asset_by_path(&address.full_name()).await
    }
}
