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

//! The production kernel: a built-in package plus a cache kept in sync with
//! a remote origin.

use crate::report::{BundleFailure, UpdateOptions, UpdateReport};
use crate::state::{LoadedState, StateCell};
use crate::traits::ResourceKernel;
use async_trait::async_trait;
use depot_core::{
    BuildMode, DepotError, DepotResult, FileSystem, InitResult, Manifest, ManifestBundle,
    ResourceVersion,
};
use depot_io::{BuiltinFileSystem, CacheFileSystem};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

const KERNEL: &str = "online kernel";

/// Drives a [`BuiltinFileSystem`] and a [`CacheFileSystem`].
///
/// The cache is authoritative for the current version. On a first run the
/// version is requested from the remote origin, and when the origin cannot
/// be reached the built-in package's version and manifest seed the cache.
/// Diffing and downloading are explicit steps driven by the caller.
pub struct OnlineKernel {
    builtin: Arc<BuiltinFileSystem>,
    cache: Arc<CacheFileSystem>,
    io_timeout: Duration,
    state: StateCell,
}

impl OnlineKernel {
    /// Creates a kernel over both file systems. `io_timeout` bounds version
    /// and manifest reads and fetches.
    pub fn new(builtin: BuiltinFileSystem, cache: CacheFileSystem, io_timeout: Duration) -> Self {
        Self {
            builtin: Arc::new(builtin),
            cache: Arc::new(cache),
            io_timeout,
            state: StateCell::default(),
        }
    }

    /// The built-in file system.
    pub fn builtin(&self) -> &BuiltinFileSystem {
        &self.builtin
    }

    /// The cache file system.
    pub fn cache(&self) -> &CacheFileSystem {
        &self.cache
    }

    /// Asks the remote origin for its current version. Nothing is persisted
    /// until [`OnlineKernel::update_manifest`] adopts it.
    pub async fn update_resource_version(&self) -> DepotResult<ResourceVersion> {
        self.cache.request_remote_version(self.io_timeout).await
    }

    /// Makes `version` the current one: loads its manifest from the cache,
    /// downloading it first when missing or corrupted, records the version
    /// marker, and swaps the loaded state.
    pub async fn update_manifest(&self, version: &ResourceVersion) -> DepotResult<Arc<LoadedState>> {
        let manifest = self.resolve_manifest(version).await?;
        self.cache.save_resource_version(version).await?;
        log::info!(
            "Online kernel now serves {} ({} bundles)",
            version,
            manifest.len()
        );
        Ok(self.state.store(LoadedState::new(manifest)))
    }

    async fn resolve_version(&self) -> DepotResult<ResourceVersion> {
        match self.cache.load_resource_version(self.io_timeout).await {
            Ok(version) => return Ok(version),
            Err(e) if e.is_not_found() => {
                log::info!("No cached resource version, asking the remote origin");
            }
            Err(e) => return Err(e),
        }

        match self.update_resource_version().await {
            Ok(version) => Ok(version),
            Err(e) if e.is_retryable() => {
                log::warn!(
                    "Remote origin unreachable ({}), starting from the built-in version",
                    e
                );
                self.builtin.load_resource_version(self.io_timeout).await
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_manifest(&self, version: &ResourceVersion) -> DepotResult<Manifest> {
        match self.cache.load_manifest(version, self.io_timeout).await {
            Ok(manifest) => return Ok(manifest),
            Err(e) if e.is_not_found() || e.is_corrupted() => {
                log::info!("Cached manifest {} unusable ({}), downloading it", version, e);
            }
            Err(e) => return Err(e),
        }

        let download_error = match self.cache.download_manifest(version, self.io_timeout).await {
            Ok(manifest) => return Ok(manifest),
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        match self.builtin.load_manifest(version, self.io_timeout).await {
            Ok(manifest) => {
                log::warn!(
                    "Manifest {} could not be downloaded ({}), importing the built-in copy",
                    version,
                    download_error
                );
                self.cache.import_manifest(&manifest).await?;
                Ok(manifest)
            }
            Err(_) => Err(download_error),
        }
    }

    /// Loads from the cache first, then from the built-in package.
    async fn load_bundle(&self, bundle: &ManifestBundle) -> DepotResult<Vec<u8>> {
        match self.cache.load_bundle_bytes(bundle, self.io_timeout).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_not_found() || e.is_corrupted() => {
                log::debug!(
                    "'{}' not usable in cache ({}), reading the built-in package",
                    bundle.file_name,
                    e
                );
                self.builtin.load_bundle_bytes(bundle, self.io_timeout).await
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ResourceKernel for OnlineKernel {
    fn mode(&self) -> BuildMode {
        BuildMode::Online
    }

    async fn init(&self) -> InitResult {
        self.builtin.init().await?;
        self.cache.init().await?;

        let version = self.resolve_version().await?;
        self.update_manifest(&version).await?;
        Ok(())
    }

    fn state(&self) -> Option<Arc<LoadedState>> {
        self.state.load()
    }

    async fn get_updatable_bundles(&self) -> DepotResult<Vec<ManifestBundle>> {
        let state = self.state.require(KERNEL)?;
        let mut updatable = Vec::new();
        for bundle in state.manifest().bundles() {
            if self
                .cache
                .check_bundle_updatable(bundle, state.version(), self.io_timeout)
                .await?
            {
                updatable.push(bundle.clone());
            }
        }
        log::info!(
            "{} of {} bundles of {} need downloading",
            updatable.len(),
            state.manifest().len(),
            state.version()
        );
        Ok(updatable)
    }

    async fn update_bundles(
        &self,
        bundles: &[ManifestBundle],
        options: UpdateOptions,
    ) -> DepotResult<UpdateReport> {
        let state = self.state.require(KERNEL)?;
        let mut results: Vec<Option<DepotResult<()>>> = Vec::new();
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();

        for bundle in bundles {
            if !seen.insert(bundle.file_name.as_str()) {
                log::debug!("'{}' requested twice in one batch", bundle.file_name);
                continue;
            }
            let index = names.len();
            names.push(bundle.file_name.clone());
            results.push(None);

            if state.manifest().bundle(&bundle.file_name) != Some(bundle) {
                results[index] = Some(Err(DepotError::InvalidManifest(format!(
                    "'{}' is not part of manifest {}",
                    bundle.file_name,
                    state.version()
                ))));
                continue;
            }

            // Slots are granted in input order; running tasks free them.
            let slot = match self.cache.admit(bundle).await {
                Ok(slot) => slot,
                Err(e) => {
                    results[index] = Some(Err(e));
                    continue;
                }
            };
            let cache = Arc::clone(&self.cache);
            let version = state.version().clone();
            tasks.spawn(async move {
                let outcome = cache
                    .download_admitted(slot, &version, options.retry_count, options.timeout)
                    .await;
                (index, outcome.map(|_| ()))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => results[index] = Some(outcome),
                Err(e) => log::error!("A download task ended abnormally: {}", e),
            }
        }

        let mut report = UpdateReport::default();
        for (file_name, result) in names.into_iter().zip(results) {
            match result {
                Some(Ok(())) => report.succeeded.push(file_name),
                Some(Err(error)) => report.failed.push(BundleFailure { file_name, error }),
                // A task that panicked or was cancelled never reported back.
                None => report.failed.push(BundleFailure {
                    error: DepotError::TaskAborted {
                        file_name: file_name.clone(),
                    },
                    file_name,
                }),
            }
        }
        log::info!(
            "Bundle update finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn load_asset_by_path(&self, path: &str) -> DepotResult<Vec<u8>> {
        let state = self.state.require(KERNEL)?;
        let bundle = state
            .manifest()
            .bundle(path)
            .ok_or_else(|| DepotError::NotFound {
                location: path.to_string(),
            })?;
        self.load_bundle(bundle).await
    }
}
