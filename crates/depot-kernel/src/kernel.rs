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

//! Kernel selection from configuration.

use crate::editor::EditorSimulateKernel;
use crate::online::OnlineKernel;
use crate::report::{UpdateOptions, UpdateReport};
use crate::state::LoadedState;
use crate::traits::ResourceKernel;
use async_trait::async_trait;
use depot_core::{
    BuildMode, ByteFetcher, DecryptionService, DepotConfig, DepotResult, InitResult,
    ManifestBundle, PackageBuilder, RemoteService, ResourceName,
};
use depot_io::{
    BuiltinFileSystem, CacheFileSystem, DirectoryPackageBuilder, DownloadPipeline,
    EditorSimulatedFileSystem, HostServerRemote, HttpFetcher,
};
use std::sync::Arc;

/// Collaborators injected into a kernel. Anything left unset is derived
/// from the configuration.
#[derive(Clone, Default)]
pub struct KernelServices {
    /// Transport for remote files. Defaults to [`HttpFetcher`].
    pub fetcher: Option<Arc<dyn ByteFetcher>>,
    /// URL resolution. Defaults to the configured host server templates.
    pub remote: Option<Arc<dyn RemoteService>>,
    /// Decryption of downloaded bundles. None stores bytes as fetched.
    pub decryption: Option<Arc<dyn DecryptionService>>,
    /// Build step of the editor simulation. Defaults to a
    /// [`DirectoryPackageBuilder`] over the configured source directory.
    pub builder: Option<Arc<dyn PackageBuilder>>,
}

/// The kernel of one build mode, chosen once at construction.
pub enum Kernel {
    /// Development kernel.
    EditorSimulate(EditorSimulateKernel),
    /// Production kernel.
    Online(OnlineKernel),
}

impl Kernel {
    /// Builds the kernel selected by `config.mode`.
    ///
    /// An online configuration without a host server is rejected here with
    /// [`DepotError::Config`](depot_core::DepotError::Config).
    pub fn from_config(config: &DepotConfig, services: KernelServices) -> DepotResult<Self> {
        config.validate()?;
        match config.mode {
            BuildMode::EditorSimulate => {
                let builder = match services.builder {
                    Some(builder) => builder,
                    None => Arc::new(DirectoryPackageBuilder::new(
                        &config.simulate_source,
                        &config.simulate_output,
                        config.package_name.clone(),
                        config.checksum,
                    )),
                };
                let file_system = EditorSimulatedFileSystem::new(
                    builder,
                    config.package_name.clone(),
                    config.checksum,
                );
                Ok(Self::EditorSimulate(EditorSimulateKernel::new(
                    file_system,
                    config.io_timeout(),
                )))
            }
            BuildMode::Online => {
                let remote = match services.remote {
                    Some(remote) => remote,
                    None => Arc::new(HostServerRemote::from_config(config)?),
                };
                let fetcher = services
                    .fetcher
                    .unwrap_or_else(|| Arc::new(HttpFetcher::new()));
                let mut pipeline = DownloadPipeline::new(
                    remote,
                    fetcher,
                    config.checksum,
                    config.max_concurrent_downloads,
                );
                if let Some(decryption) = services.decryption {
                    pipeline = pipeline.with_decryption(decryption);
                }

                let builtin = BuiltinFileSystem::new(
                    &config.builtin_root,
                    config.package_name.clone(),
                    config.checksum,
                );
                let cache = CacheFileSystem::new(
                    &config.cache_root,
                    config.package_name.clone(),
                    config.checksum,
                    pipeline,
                );
                Ok(Self::Online(OnlineKernel::new(
                    builtin,
                    cache,
                    config.io_timeout(),
                )))
            }
        }
    }

    fn inner(&self) -> &dyn ResourceKernel {
        match self {
            Self::EditorSimulate(kernel) => kernel,
            Self::Online(kernel) => kernel,
        }
    }

    /// The online kernel, when this is one.
    pub fn as_online(&self) -> Option<&OnlineKernel> {
        match self {
            Self::Online(kernel) => Some(kernel),
            Self::EditorSimulate(_) => None,
        }
    }
}

#[async_trait]
impl ResourceKernel for Kernel {
    fn mode(&self) -> BuildMode {
        self.inner().mode()
    }

    async fn init(&self) -> InitResult {
        log::info!("Initializing the {:?} resource kernel", self.mode());
        self.inner().init().await
    }

    fn state(&self) -> Option<Arc<LoadedState>> {
        self.inner().state()
    }

    async fn get_updatable_bundles(&self) -> DepotResult<Vec<ManifestBundle>> {
        self.inner().get_updatable_bundles().await
    }

    async fn update_bundles(
        &self,
        bundles: &[ManifestBundle],
        options: UpdateOptions,
    ) -> DepotResult<UpdateReport> {
        self.inner().update_bundles(bundles, options).await
    }

    async fn load_asset_by_path(&self, path: &str) -> DepotResult<Vec<u8>> {
        self.inner().load_asset_by_path(path).await
    }

    async fn load_asset_by_address(&self, address: &ResourceName) -> DepotResult<Vec<u8>> {
        self.inner().load_asset_by_address(address).await
    }
}
