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

//! Fixtures shared by the kernel integration tests: an in-memory origin and
//! helpers that publish packages to it and to disk.

#![allow(dead_code)]

use async_trait::async_trait;
use depot_core::fs::PackageLayout;
use depot_core::{
    ByteFetcher, ChecksumAlgorithm, DepotError, DepotResult, Manifest, RemoteService,
};
use depot_io::DirectoryPackageBuilder;
use depot_kernel::OnlineKernel;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PACKAGE: &str = "Main";
pub const TIMEOUT: Duration = Duration::from_secs(5);

/// An origin serving files by name. Failures and latency can be scripted
/// per file; concurrent requests are counted.
#[derive(Default)]
pub struct MemoryOrigin {
    files: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<String, u32>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryOrigin {
    pub fn publish(&self, file_name: &str, bytes: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), bytes.to_vec());
    }

    pub fn withdraw(&self, file_name: &str) {
        self.files.lock().unwrap().remove(file_name);
    }

    /// Makes the next `count` requests for `file_name` fail.
    pub fn fail_next(&self, file_name: &str, count: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(file_name.to_string(), count);
    }

    /// Holds every response for `file_name` back by `delay`.
    pub fn delay(&self, file_name: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(file_name.to_string(), delay);
    }

    /// Highest number of requests that were being served at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// File names in the order their first request arrived.
    pub fn first_requested(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for url in self.requests.lock().unwrap().iter() {
            let name = file_name_of(url);
            if !order.contains(&name) {
                order.push(name);
            }
        }
        order
    }

    pub fn clear(&self) {
        self.files.lock().unwrap().clear();
    }

    pub fn requests_for(&self, file_name: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.ends_with(&format!("/{file_name}")))
            .count()
    }

    /// Publishes every file of a package directory under its bare name.
    pub fn publish_package(&self, root: &Path, manifest: &Manifest) {
        let layout = PackageLayout::new(manifest.package_name());
        let version = manifest.resource_version();
        for name in [
            layout.version_file_name(),
            layout.hash_file_name(version),
            layout.manifest_file_name(version),
        ] {
            self.publish(&name, &std::fs::read(root.join(&name)).unwrap());
        }
        for bundle in manifest.bundles() {
            let path = layout.bundle_path(root, &bundle.file_name);
            self.publish(&bundle.file_name, &std::fs::read(path).unwrap());
        }
    }
}

#[async_trait]
impl ByteFetcher for MemoryOrigin {
    async fn fetch(&self, url: &str, _timeout: Duration) -> DepotResult<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        let file_name = file_name_of(url);

        let delay = self.delays.lock().unwrap().get(&file_name).copied();
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(&file_name) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DepotError::NetworkFailure {
                    url: url.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
        }

        self.files
            .lock()
            .unwrap()
            .get(&file_name)
            .cloned()
            .ok_or_else(|| DepotError::NotFound {
                location: url.to_string(),
            })
    }
}

fn file_name_of(url: &str) -> String {
    url.split_once("/Main/")
        .map(|(_, name)| name.to_string())
        .unwrap_or_default()
}

/// Primary and fallback hosts of the in-memory origin.
pub struct Hosts;

impl RemoteService for Hosts {
    fn remote_url(&self, file_name: &str) -> String {
        format!("http://primary/{PACKAGE}/{file_name}")
    }

    fn fallback_remote_url(&self, file_name: &str) -> String {
        format!("http://fallback/{PACKAGE}/{file_name}")
    }
}

/// Writes `files` below `source` and packs them into `output` as `version`.
pub async fn build_package(
    source: &Path,
    output: &Path,
    version: &str,
    files: &[(&str, &str)],
) -> Manifest {
    let _ = std::fs::remove_dir_all(source);
    for (name, text) in files {
        let path = source.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }
    DirectoryPackageBuilder::new(source, output, PACKAGE, ChecksumAlgorithm::Md5)
        .with_version(version)
        .build_manifest()
        .await
        .unwrap()
}

/// A temporary workspace holding a built-in package, a cache root and an
/// origin.
pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub origin: Arc<MemoryOrigin>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            origin: Arc::default(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Builds the built-in package.
    pub async fn ship_builtin(&self, version: &str, files: &[(&str, &str)]) -> Manifest {
        build_package(&self.path("builtin-src"), &self.path("builtin"), version, files).await
    }

    /// Builds a package and publishes it on the origin.
    pub async fn publish(&self, version: &str, files: &[(&str, &str)]) -> Manifest {
        let staging = self.path(&format!("staging-{version}"));
        let manifest =
            build_package(&self.path(&format!("src-{version}")), &staging, version, files).await;
        self.origin.publish_package(&staging, &manifest);
        manifest
    }

    pub fn kernel(&self, max_concurrent: usize) -> OnlineKernel {
        use depot_io::{BuiltinFileSystem, CacheFileSystem, DownloadPipeline};

        let pipeline = DownloadPipeline::new(
            Arc::new(Hosts),
            self.origin.clone(),
            ChecksumAlgorithm::Md5,
            max_concurrent,
        );
        OnlineKernel::new(
            BuiltinFileSystem::new(self.path("builtin"), PACKAGE, ChecksumAlgorithm::Md5),
            CacheFileSystem::new(self.path("cache"), PACKAGE, ChecksumAlgorithm::Md5, pipeline),
            TIMEOUT,
        )
    }
}
