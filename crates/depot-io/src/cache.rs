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

//! The writable local backend fronted by a remote origin.

use crate::download::{DownloadOutcome, DownloadPipeline, DownloadSlot};
use crate::{codec, files};
use async_trait::async_trait;
use depot_core::fs::{PackageLayout, PARTIAL_SUFFIX};
use depot_core::{
    with_timeout, ChecksumAlgorithm, DepotError, DepotResult, FileSystem, FileSystemKind,
    InitResult, Manifest, ManifestBundle, ManifestResult, ResourceVersion,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Persistent storage that is filled from a remote origin.
///
/// A missing version marker means nothing has been cached yet and is
/// reported as [`DepotError::NotFound`] for the caller to resolve. Bundles
/// only appear under the root once their checksum has been verified.
pub struct CacheFileSystem {
    root: PathBuf,
    layout: PackageLayout,
    checksum: ChecksumAlgorithm,
    pipeline: DownloadPipeline,
    file_count: AtomicUsize,
    initialized: AtomicBool,
}

impl CacheFileSystem {
    /// Creates a cache over `root`, downloading through `pipeline`.
    pub fn new(
        root: impl Into<PathBuf>,
        package_name: impl Into<String>,
        checksum: ChecksumAlgorithm,
        pipeline: DownloadPipeline,
    ) -> Self {
        Self {
            root: root.into(),
            layout: PackageLayout::new(package_name),
            checksum,
            pipeline,
            file_count: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    /// The package layout this cache stores.
    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    /// The pipeline bundles are downloaded through.
    pub fn pipeline(&self) -> &DownloadPipeline {
        &self.pipeline
    }

    fn ensure_initialized(&self) -> DepotResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(DepotError::NotInitialized("cache file system"))
        }
    }

    /// Persists the version marker.
    pub async fn save_resource_version(&self, version: &ResourceVersion) -> DepotResult<()> {
        self.ensure_initialized()?;
        version.validate().map_err(DepotError::InvalidManifest)?;
        codec::write_version(&self.root, &self.layout, version).await?;
        log::info!("Cached resource version is now {}", version);
        Ok(())
    }

    /// Asks the remote origin for its current resource version.
    pub async fn request_remote_version(&self, timeout: Duration) -> DepotResult<ResourceVersion> {
        let file_name = self.layout.version_file_name();
        let bytes = self.fetch_remote(&file_name, timeout).await?;
        let text = String::from_utf8(bytes).map_err(|e| DepotError::Decode {
            location: file_name.clone(),
            reason: e.to_string(),
        })?;
        let version = ResourceVersion::parse(text, &file_name)?;
        log::info!("Remote resource version is {}", version);
        Ok(version)
    }

    /// Downloads the manifest of `version` and its hash marker, verifies
    /// them together and only then commits both under the cache root.
    pub async fn download_manifest(
        &self,
        version: &ResourceVersion,
        timeout: Duration,
    ) -> ManifestResult {
        self.ensure_initialized()?;
        version
            .validate()
            .map_err(DepotError::InvalidManifest)?;
        let hash_name = self.layout.hash_file_name(version);
        let manifest_name = self.layout.manifest_file_name(version);
        let manifest_path = self.root.join(&manifest_name);

        let hash_marker = String::from_utf8(self.fetch_remote(&hash_name, timeout).await?)
            .map_err(|e| DepotError::Decode {
                location: hash_name.clone(),
                reason: e.to_string(),
            })?;
        let bytes = self.fetch_remote(&manifest_name, timeout).await?;
        codec::verify_manifest_bytes(&bytes, &hash_marker, self.checksum, &manifest_path)?;

        let manifest = codec::decode_manifest(&bytes, &manifest_path)?;
        if manifest.checksum() != self.checksum
            || manifest.resource_version() != version
            || manifest.package_name() != self.layout.package_name()
        {
            return Err(DepotError::InvalidManifest(format!(
                "remote '{}' describes {} {} ({}) instead of {} {} ({})",
                manifest_name,
                manifest.package_name(),
                manifest.resource_version(),
                manifest.checksum(),
                self.layout.package_name(),
                version,
                self.checksum
            )));
        }

        files::write_atomic(&manifest_path, &bytes).await?;
        files::write_atomic(&self.root.join(&hash_name), hash_marker.trim().as_bytes()).await?;
        log::info!(
            "Downloaded manifest {} ({} bundles)",
            version,
            manifest.len()
        );
        Ok(manifest)
    }

    /// Stores a manifest obtained elsewhere, such as the built-in package,
    /// together with a freshly computed hash marker.
    pub async fn import_manifest(&self, manifest: &Manifest) -> DepotResult<()> {
        self.ensure_initialized()?;
        if manifest.checksum() != self.checksum {
            return Err(DepotError::InvalidManifest(format!(
                "cannot import a {} manifest into a {} cache",
                manifest.checksum(),
                self.checksum
            )));
        }
        codec::write_manifest(&self.root, &self.layout, manifest, self.checksum).await
    }

    /// Reserves a download slot for `bundle`. See [`DownloadPipeline::admit`].
    pub async fn admit(&self, bundle: &ManifestBundle) -> DepotResult<DownloadSlot> {
        self.ensure_initialized()?;
        self.pipeline.admit(bundle).await
    }

    /// Downloads an admitted bundle into the cache.
    pub async fn download_admitted(
        &self,
        slot: DownloadSlot,
        version: &ResourceVersion,
        retry_count: u32,
        timeout: Duration,
    ) -> DepotResult<DownloadOutcome> {
        let destination = self.layout.bundle_path(&self.root, &slot.bundle().file_name);
        let existed = files::exists(&destination).await?;
        let outcome = self
            .pipeline
            .download(slot, version, &destination, retry_count, timeout)
            .await?;
        if !existed {
            self.file_count.fetch_add(1, Ordering::AcqRel);
        }
        Ok(outcome)
    }

    /// Fetches a package-level file, trying the fallback origin once when
    /// the primary one fails with a retryable error.
    async fn fetch_remote(&self, file_name: &str, timeout: Duration) -> DepotResult<Vec<u8>> {
        let remote = self.pipeline.remote();
        let fetcher = self.pipeline.fetcher();

        let primary = remote.remote_url(file_name);
        match with_timeout(
            format!("fetching '{primary}'"),
            timeout,
            fetcher.fetch(&primary, timeout),
        )
        .await
        {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_retryable() => {
                let fallback = remote.fallback_remote_url(file_name);
                log::warn!("Fetching '{}' failed ({}), trying '{}'", primary, e, fallback);
                with_timeout(
                    format!("fetching '{fallback}'"),
                    timeout,
                    fetcher.fetch(&fallback, timeout),
                )
                .await
            }
            Err(e) => Err(e),
        }
    }

    async fn remove_bundle_files(
        &self,
        keep: impl Fn(&str) -> bool + Send,
    ) -> DepotResult<usize> {
        self.ensure_initialized()?;
        let directory = self.layout.bundle_directory(&self.root);
        let mut removed = 0;
        for entry in files::list_bundle_files(&directory).await? {
            let partial = entry.file_name.ends_with(PARTIAL_SUFFIX);
            if !partial && keep(&entry.file_name) {
                continue;
            }
            if files::remove_if_exists(&entry.path).await? && !partial {
                removed += 1;
            }
        }
        let count = files::count_bundle_files(&directory).await?;
        self.file_count.store(count, Ordering::Release);
        Ok(removed)
    }
}

#[async_trait]
impl FileSystem for CacheFileSystem {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Cache
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }

    fn file_count(&self) -> usize {
        self.file_count.load(Ordering::Acquire)
    }

    async fn init(&self) -> InitResult {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DepotError::io(&self.root, e))?;
        let count = files::count_bundle_files(&self.layout.bundle_directory(&self.root)).await?;
        self.file_count.store(count, Ordering::Release);
        self.initialized.store(true, Ordering::Release);
        log::info!(
            "Cache file system ready at '{}' ({} bundle files)",
            self.root.display(),
            count
        );
        Ok(())
    }

    async fn load_resource_version(&self, timeout: Duration) -> DepotResult<ResourceVersion> {
        self.ensure_initialized()?;
        let path = self.root.join(self.layout.version_file_name());
        let text = files::read_text(&path, timeout).await?;
        if text.trim().is_empty() {
            return Err(DepotError::not_found(&path));
        }
        ResourceVersion::parse(text, path.display())
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

    async fn check_bundle_updatable(
        &self,
        bundle: &ManifestBundle,
        _version: &ResourceVersion,
        timeout: Duration,
    ) -> DepotResult<bool> {
        self.ensure_initialized()?;
        let path = self.layout.bundle_path(&self.root, &bundle.file_name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(DepotError::io(&path, e)),
        };
        if !metadata.is_file() || metadata.len() != bundle.size_bytes {
            return Ok(true);
        }
        let bytes = files::read_bytes(&path, timeout).await?;
        Ok(!self.checksum.matches(&bytes, &bundle.hash))
    }

    async fn download_file(
        &self,
        bundle: &ManifestBundle,
        version: &ResourceVersion,
        retry_count: u32,
        timeout: Duration,
    ) -> DepotResult<()> {
        let slot = self.admit(bundle).await?;
        self.download_admitted(slot, version, retry_count, timeout)
            .await
            .map(|_| ())
    }

    async fn clear_all_bundle_files(&self) -> DepotResult<usize> {
        let removed = self.remove_bundle_files(|_| false).await?;
        log::info!("Removed {} cached bundle files", removed);
        Ok(removed)
    }

    async fn clear_all_unused_bundle_files(&self, manifest: &Manifest) -> DepotResult<usize> {
        let removed = self
            .remove_bundle_files(|file_name| manifest.contains(file_name))
            .await?;
        log::info!(
            "Removed {} cached bundle files unused by manifest {}",
            removed,
            manifest.resource_version()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{ByteFetcher, RemoteService};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const ORIGIN: &str = "http://origin";

    /// Serves fixed bodies by URL and counts requests.
    #[derive(Default)]
    struct MemoryOrigin {
        bodies: Mutex<HashMap<String, Vec<u8>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MemoryOrigin {
        fn publish(&self, file_name: &str, bytes: &[u8]) {
            self.bodies
                .lock()
                .unwrap()
                .insert(format!("{ORIGIN}/{file_name}"), bytes.to_vec());
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ByteFetcher for MemoryOrigin {
        async fn fetch(&self, url: &str, _timeout: Duration) -> DepotResult<Vec<u8>> {
            self.requests.lock().unwrap().push(url.to_string());
            self.bodies
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| DepotError::NotFound {
                    location: url.to_string(),
                })
        }
    }

    struct Flat;

    impl RemoteService for Flat {
        fn remote_url(&self, file_name: &str) -> String {
            format!("{ORIGIN}/{file_name}")
        }

        fn fallback_remote_url(&self, file_name: &str) -> String {
            format!("{ORIGIN}/{file_name}")
        }
    }

    fn bundle(name: &str, content: &[u8]) -> ManifestBundle {
        ManifestBundle::new(
            name,
            ChecksumAlgorithm::Md5.hex_digest(content),
            content.len() as u64,
        )
    }

    async fn cache(root: &Path, origin: Arc<MemoryOrigin>) -> CacheFileSystem {
        let pipeline = DownloadPipeline::new(Arc::new(Flat), origin, ChecksumAlgorithm::Md5, 4);
        let cache = CacheFileSystem::new(root, "Main", ChecksumAlgorithm::Md5, pipeline);
        cache.init().await.unwrap();
        cache
    }

    fn v1() -> ResourceVersion {
        ResourceVersion::from("v1")
    }

    #[tokio::test]
    async fn test_missing_version_marker_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(&dir.path().join("cache"), Arc::default()).await;
        let err = cache.load_resource_version(TIMEOUT).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(cache.file_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_version_cannot_leave_cache_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("sandbox/cache");
        let origin = Arc::new(MemoryOrigin::default());
        let escaping = ResourceVersion::new("x/../../../escaped");
        let manifest = Manifest::new(
            "Main",
            ResourceVersion::from("v1"),
            ChecksumAlgorithm::Md5,
            vec![bundle("a", b"alpha")],
        )
        .unwrap();
        let bytes = codec::encode_manifest(&manifest).unwrap();
        let layout = PackageLayout::new("Main");
        origin.publish(&layout.version_file_name(), b"x/../../../escaped");
        origin.publish(
            &layout.hash_file_name(&escaping),
            ChecksumAlgorithm::Md5.hex_digest(&bytes).as_bytes(),
        );
        origin.publish(&layout.manifest_file_name(&escaping), &bytes);
        let cache = cache(&root, origin.clone()).await;

        let err = cache.request_remote_version(TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DepotError::Decode { .. }), "{err}");

        let err = cache.download_manifest(&escaping, TIMEOUT).await.unwrap_err();
        assert!(matches!(err, DepotError::InvalidManifest(_)), "{err}");
        assert!(cache.save_resource_version(&escaping).await.is_err());
        assert_eq!(origin.request_count(), 1);

        let strays: Vec<_> = walkdir::WalkDir::new(dir.path())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .collect();
        assert!(strays.is_empty(), "unexpected files: {strays:?}");
    }

    #[tokio::test]
    async fn test_only_absent_or_changed_bundles_are_updatable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Arc::default()).await;
        let a = bundle("a", b"first");
        let b = bundle("b", b"second");
        let layout = cache.layout().clone();
        files::write_atomic(&layout.bundle_path(dir.path(), "a"), b"first")
            .await
            .unwrap();

        assert!(!cache.check_bundle_updatable(&a, &v1(), TIMEOUT).await.unwrap());
        assert!(cache.check_bundle_updatable(&b, &v1(), TIMEOUT).await.unwrap());

        let a_changed = bundle("a", b"fir5t");
        assert!(cache.check_bundle_updatable(&a_changed, &v1(), TIMEOUT).await.unwrap());
    }

    #[tokio::test]
    async fn test_download_commits_verified_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let origin = Arc::new(MemoryOrigin::default());
        origin.publish("maps/level1.bin", b"level data");
        let cache = cache(dir.path(), origin).await;
        let target = bundle("maps/level1.bin", b"level data");

        cache.download_file(&target, &v1(), 3, TIMEOUT).await.unwrap();

        assert_eq!(cache.file_count(), 1);
        assert!(!cache.check_bundle_updatable(&target, &v1(), TIMEOUT).await.unwrap());
        assert_eq!(
            cache.load_bundle_bytes(&target, TIMEOUT).await.unwrap(),
            b"level data"
        );
    }

    #[tokio::test]
    async fn test_missing_remote_bundle_exhausts_retries() {
        let dir = tempfile::tempdir().unwrap();
        let origin = Arc::new(MemoryOrigin::default());
        let cache = cache(dir.path(), origin.clone()).await;

        let err = cache
            .download_file(&bundle("gone", b"x"), &v1(), 2, TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, DepotError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(origin.request_count(), 2);
        assert_eq!(cache.file_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_version_and_manifest_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        let origin = Arc::new(MemoryOrigin::default());
        let manifest = Manifest::new(
            "Main",
            v1(),
            ChecksumAlgorithm::Md5,
            vec![bundle("a", b"first")],
        )
        .unwrap();
        let bytes = codec::encode_manifest(&manifest).unwrap();
        origin.publish("Main.version", b"v1\n");
        origin.publish("Main_v1.hash", ChecksumAlgorithm::Md5.hex_digest(&bytes).as_bytes());
        origin.publish("Main_v1.bytes", &bytes);
        let cache = cache(dir.path(), origin).await;

        let version = cache.request_remote_version(TIMEOUT).await.unwrap();
        assert_eq!(version, v1());
        let downloaded = cache.download_manifest(&version, TIMEOUT).await.unwrap();
        assert_eq!(downloaded, manifest);

        cache.save_resource_version(&version).await.unwrap();
        assert_eq!(cache.load_resource_version(TIMEOUT).await.unwrap(), v1());
        assert_eq!(cache.load_manifest(&v1(), TIMEOUT).await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_corrupt_remote_manifest_is_not_committed() {
        let dir = tempfile::tempdir().unwrap();
        let origin = Arc::new(MemoryOrigin::default());
        origin.publish("Main_v1.hash", b"abc123");
        origin.publish("Main_v1.bytes", b"not a manifest");
        let cache = cache(dir.path(), origin).await;

        let err = cache.download_manifest(&v1(), TIMEOUT).await.unwrap_err();
        assert!(err.is_corrupted());
        assert!(!dir.path().join("Main_v1.bytes").exists());
        assert!(!dir.path().join("Main_v1.hash").exists());
    }

    #[tokio::test]
    async fn test_clear_operations_report_removed_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Arc::default()).await;
        let layout = cache.layout().clone();
        for name in ["a", "b", "sub/c"] {
            files::write_atomic(&layout.bundle_path(dir.path(), name), name.as_bytes())
                .await
                .unwrap();
        }
        let stray = files::partial_path(&layout.bundle_path(dir.path(), "d"));
        tokio::fs::write(&stray, b"half").await.unwrap();

        let manifest = Manifest::new(
            "Main",
            v1(),
            ChecksumAlgorithm::Md5,
            vec![bundle("a", b"a")],
        )
        .unwrap();
        assert_eq!(cache.clear_all_unused_bundle_files(&manifest).await.unwrap(), 2);
        assert!(!stray.exists());
        assert_eq!(cache.file_count(), 1);

        assert_eq!(cache.clear_all_bundle_files().await.unwrap(), 1);
        assert_eq!(cache.file_count(), 0);
    }

    #[tokio::test]
    async fn test_imported_manifest_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), Arc::default()).await;
        let manifest = Manifest::new(
            "Main",
            v1(),
            ChecksumAlgorithm::Md5,
            vec![bundle("a", b"a")],
        )
        .unwrap();

        cache.import_manifest(&manifest).await.unwrap();
        assert_eq!(cache.load_manifest(&v1(), TIMEOUT).await.unwrap(), manifest);
    }
}
