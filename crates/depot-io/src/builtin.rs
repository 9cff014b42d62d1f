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

//! The read-only package shipped inside the executable.

use crate::{codec, files};
use async_trait::async_trait;
use depot_core::fs::PackageLayout;
use depot_core::{
    ChecksumAlgorithm, DepotError, DepotResult, FileSystem, FileSystemKind, InitResult,
    ManifestBundle, ManifestResult, ResourceVersion,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// A file system over a package directory that is never written to.
///
/// A built-in package must always carry a version marker: its absence is a
/// hard failure, unlike in the cache. Download and cleanup operations are
/// rejected with [`DepotError::Unsupported`].
#[derive(Debug)]
pub struct BuiltinFileSystem {
    root: PathBuf,
    layout: PackageLayout,
    checksum: ChecksumAlgorithm,
    file_count: AtomicUsize,
    initialized: AtomicBool,
}

impl BuiltinFileSystem {
    /// Creates a built-in file system over `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        package_name: impl Into<String>,
        checksum: ChecksumAlgorithm,
    ) -> Self {
        Self {
            root: root.into(),
            layout: PackageLayout::new(package_name),
            checksum,
            file_count: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    /// The package layout this file system reads.
    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    fn ensure_initialized(&self) -> DepotResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DepotError::NotInitialized("built-in file system"))
        }
    }
}

#[async_trait]
impl FileSystem for BuiltinFileSystem {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Builtin
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }

    fn file_count(&self) -> usize {
        self.file_count.load(Ordering::Acquire)
    }

    async fn init(&self) -> InitResult {
        let metadata = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| DepotError::io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(DepotError::not_found(&self.root));
        }

        let count = files::count_bundle_files(&self.layout.bundle_directory(&self.root)).await?;
        self.file_count.store(count, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        log::info!(
            "Built-in file system ready at '{}' ({} bundle files)",
            self.root.display(),
            count
        );
        Ok(())
    }

    async fn load_resource_version(&self, timeout: Duration) -> DepotResult<ResourceVersion> {
        self.ensure_initialized()?;
        let path = self.root.join(self.layout.version_file_name());
        ResourceVersion::parse(files::read_text(&path, timeout).await?, path.display())
    }

    async fn load_manifest(&self, version: &ResourceVersion, timeout: Duration) -> ManifestResult {
        self.ensure_initialized()?;
        codec::load_verified_manifest(&self.root, &self.layout, version, self.checksum, timeout)
            .await
    }

    async fn load_bundle_bytes(
        &self,
        bundle: &ManifestBundle,
        timeout: Duration,
    ) -> DepotResult<Vec<u8>> {
        self.ensure_initialized()?;
        let path = self.layout.bundle_path(&self.root, &bundle.file_name);
        let bytes = files::read_bytes(&path, timeout).await?;
        codec::verify_bundle_bytes(&bytes, bundle, self.checksum, &path)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::Manifest;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn package(dir: &Path) -> Manifest {
        let layout = PackageLayout::new("Main");
        let algo = ChecksumAlgorithm::Md5;
        std::fs::create_dir_all(dir.join("bundles")).unwrap();
        std::fs::write(dir.join("bundles/a.bundle"), b"alpha").unwrap();
        let manifest = Manifest::new(
            "Main",
            ResourceVersion::from("v1"),
            algo,
            vec![ManifestBundle::new("a.bundle", algo.hex_digest(b"alpha"), 5)],
        )
        .unwrap();
        codec::write_manifest(dir, &layout, &manifest, algo).await.unwrap();
        codec::write_version(dir, &layout, manifest.resource_version())
            .await
            .unwrap();
        manifest
    }

    #[tokio::test]
    async fn test_init_counts_bundles_and_loads_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let expected = package(dir.path()).await;
        let fs = BuiltinFileSystem::new(dir.path(), "Main", ChecksumAlgorithm::Md5);
        fs.init().await.unwrap();
        assert_eq!(fs.file_count(), 1);

        let version = fs.load_resource_version(TIMEOUT).await.unwrap();
        assert_eq!(version.as_str(), "v1");
        let manifest = fs.load_manifest(&version, TIMEOUT).await.unwrap();
        assert_eq!(manifest, expected);

        let bytes = fs
            .load_bundle_bytes(&manifest.bundles()[0], TIMEOUT)
            .await
            .unwrap();
        assert_eq!(bytes, b"alpha");
    }

    #[tokio::test]
    async fn test_missing_root_fails_init() {
        let dir = tempfile::tempdir().unwrap();
        let fs = BuiltinFileSystem::new(dir.path().join("absent"), "Main", ChecksumAlgorithm::Md5);
        assert!(fs.init().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_missing_version_marker_is_a_hard_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fs = BuiltinFileSystem::new(dir.path(), "Main", ChecksumAlgorithm::Md5);
        fs.init().await.unwrap();
        let err = fs.load_resource_version(TIMEOUT).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Main.version"));
    }

    #[tokio::test]
    async fn test_queries_before_init_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path()).await;
        let fs = BuiltinFileSystem::new(dir.path(), "Main", ChecksumAlgorithm::Md5);
        let err = fs.load_resource_version(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DepotError::NotInitialized(_)));
    }

    #[tokio::test]
    async fn test_download_and_cleanup_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = package(dir.path()).await;
        let fs = BuiltinFileSystem::new(dir.path(), "Main", ChecksumAlgorithm::Md5);
        fs.init().await.unwrap();
        let bundle = &manifest.bundles()[0];

        let err = fs
            .download_file(bundle, manifest.resource_version(), 3, TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_unsupported());
        assert!(fs
            .check_bundle_updatable(bundle, manifest.resource_version(), TIMEOUT)
            .await
            .unwrap_err()
            .is_unsupported());
        assert!(fs.clear_all_bundle_files().await.unwrap_err().is_unsupported());
        assert!(fs
            .clear_all_unused_bundle_files(&manifest)
            .await
            .unwrap_err()
            .is_unsupported());

        // Nothing was touched.
        assert!(dir.path().join("bundles/a.bundle").exists());
    }

    #[tokio::test]
    async fn test_tampered_bundle_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = package(dir.path()).await;
        std::fs::write(dir.path().join("bundles/a.bundle"), b"omega").unwrap();
        let fs = BuiltinFileSystem::new(dir.path(), "Main", ChecksumAlgorithm::Md5);
        fs.init().await.unwrap();
        let err = fs
            .load_bundle_bytes(&manifest.bundles()[0], TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_corrupted());
        assert_eq!(fs.file_count(), 1);
    }
}
