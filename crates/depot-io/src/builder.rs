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

//! Builds a package directory from a tree of source files.

use crate::{codec, files};
use async_trait::async_trait;
use depot_core::fs::PackageLayout;
use depot_core::{
    ChecksumAlgorithm, DepotError, DepotResult, Manifest, ManifestBundle, PackageBuilder,
    ResourceVersion,
};
use std::path::{Path, PathBuf};

/// Number of hex digits kept when a version is derived from content.
const DERIVED_VERSION_LEN: usize = 12;

/// Packs every file below a source directory as one bundle.
///
/// The output directory receives the bundle files, the binary manifest, its
/// hash marker and the version marker, laid out exactly like a built-in
/// package. Without an explicit version, the version is derived from the
/// bundle hashes, so an unchanged source tree always builds the same version.
#[derive(Debug, Clone)]
pub struct DirectoryPackageBuilder {
    source: PathBuf,
    output: PathBuf,
    layout: PackageLayout,
    checksum: ChecksumAlgorithm,
    version: Option<ResourceVersion>,
}

impl DirectoryPackageBuilder {
    /// Creates a builder packing `source` into `output`.
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        package_name: impl Into<String>,
        checksum: ChecksumAlgorithm,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            layout: PackageLayout::new(package_name),
            checksum,
            version: None,
        }
    }

    /// Stamps the package with an explicit version.
    pub fn with_version(mut self, version: impl Into<ResourceVersion>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn derive_version(&self, bundles: &[ManifestBundle]) -> ResourceVersion {
        let mut fingerprint = Vec::new();
        for bundle in bundles {
            fingerprint.extend_from_slice(bundle.file_name.as_bytes());
            fingerprint.push(0);
            fingerprint.extend_from_slice(bundle.hash.as_bytes());
            fingerprint.push(0);
        }
        let digest = self.checksum.hex_digest(&fingerprint);
        ResourceVersion::new(&digest[..DERIVED_VERSION_LEN.min(digest.len())])
    }

    /// Builds the package and returns its manifest.
    pub async fn build_manifest(&self) -> DepotResult<Manifest> {
        if !files::exists(&self.source).await? {
            return Err(DepotError::not_found(&self.source));
        }

        let bundle_directory = self.layout.bundle_directory(&self.output);
        match tokio::fs::remove_dir_all(&bundle_directory).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DepotError::io(&bundle_directory, e)),
        }

        let mut bundles = Vec::new();
        for entry in files::list_bundle_files(&self.source).await? {
            let bytes = tokio::fs::read(&entry.path)
                .await
                .map_err(|e| DepotError::io(&entry.path, e))?;
            let destination = self.layout.bundle_path(&self.output, &entry.file_name);
            files::write_atomic(&destination, &bytes).await?;
            log::debug!("Packed '{}' ({} bytes)", entry.file_name, bytes.len());
            bundles.push(ManifestBundle::new(
                entry.file_name,
                self.checksum.hex_digest(&bytes),
                bytes.len() as u64,
            ));
        }

        let version = match &self.version {
            Some(version) => version.clone(),
            None => self.derive_version(&bundles),
        };
        let manifest = Manifest::new(
            self.layout.package_name(),
            version,
            self.checksum,
            bundles,
        )?;

        codec::write_manifest(&self.output, &self.layout, &manifest, self.checksum).await?;
        codec::write_version(&self.output, &self.layout, manifest.resource_version()).await?;
        log::info!(
            "Built package {} {} ({} bundles, {} bytes) into '{}'",
            manifest.package_name(),
            manifest.resource_version(),
            manifest.len(),
            manifest.total_size_bytes(),
            self.output.display()
        );
        Ok(manifest)
    }
}

#[async_trait]
impl PackageBuilder for DirectoryPackageBuilder {
    fn output_directory(&self) -> &Path {
        &self.output
    }

    async fn build(&self) -> DepotResult<PathBuf> {
        self.build_manifest().await?;
        Ok(self.output.clone())
    }
}
