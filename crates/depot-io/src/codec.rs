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

//! Binary encoding of manifests and the hash marker that guards them.
//!
//! A manifest is only ever decoded after the checksum of its bytes has been
//! compared with the hash marker published next to it. Unverified bytes never
//! reach the decoder.

use crate::files;
use depot_core::fs::PackageLayout;
use depot_core::{
    ChecksumAlgorithm, DepotError, DepotResult, Manifest, ManifestBundle, ResourceVersion,
};
use std::path::Path;
use std::time::Duration;

/// Encodes a manifest with the standard bincode configuration.
pub fn encode_manifest(manifest: &Manifest) -> DepotResult<Vec<u8>> {
    bincode::serde::encode_to_vec(manifest, bincode::config::standard())
        .map_err(|e| DepotError::Encode(e.to_string()))
}

/// Decodes manifest bytes. `location` names the source in errors.
///
/// Callers must have verified `bytes` with [`verify_manifest_bytes`] first.
pub fn decode_manifest(bytes: &[u8], location: &Path) -> DepotResult<Manifest> {
    let (manifest, read): (Manifest, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard()).map_err(|e| {
            DepotError::Decode {
                location: location.display().to_string(),
                reason: e.to_string(),
            }
        })?;
    if read != bytes.len() {
        return Err(DepotError::Decode {
            location: location.display().to_string(),
            reason: format!("{} trailing bytes after manifest", bytes.len() - read),
        });
    }
    Ok(manifest)
}

/// Compares the checksum of `bytes` with the text of a hash marker.
pub fn verify_manifest_bytes(
    bytes: &[u8],
    hash_marker: &str,
    algorithm: ChecksumAlgorithm,
    location: &Path,
) -> DepotResult<()> {
    let expected = hash_marker.trim();
    let actual = algorithm.hex_digest(bytes);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(DepotError::corrupted(location, expected, actual))
    }
}

/// Checks bundle bytes against the hash recorded by the manifest.
pub fn verify_bundle_bytes(
    bytes: &[u8],
    bundle: &ManifestBundle,
    algorithm: ChecksumAlgorithm,
    location: &Path,
) -> DepotResult<()> {
    let actual = algorithm.hex_digest(bytes);
    if actual.eq_ignore_ascii_case(bundle.hash.trim()) {
        Ok(())
    } else {
        Err(DepotError::corrupted(location, bundle.hash.clone(), actual))
    }
}

/// Loads the manifest of `version` from a package root.
///
/// Steps, in this order: both files must exist, the hash marker gives the
/// expected checksum, the manifest bytes give the actual one, and only on a
/// match are the bytes decoded. The decoded manifest must describe the
/// requested package and version.
pub async fn load_verified_manifest(
    root: &Path,
    layout: &PackageLayout,
    version: &ResourceVersion,
    algorithm: ChecksumAlgorithm,
    timeout: Duration,
) -> DepotResult<Manifest> {
    version.validate().map_err(DepotError::InvalidManifest)?;
    let hash_path = root.join(layout.hash_file_name(version));
    let manifest_path = root.join(layout.manifest_file_name(version));

    for path in [&hash_path, &manifest_path] {
        if !files::exists(path).await? {
            return Err(DepotError::not_found(path));
        }
    }

    let hash_marker = files::read_text(&hash_path, timeout).await?;
    let bytes = files::read_bytes(&manifest_path, timeout).await?;
    verify_manifest_bytes(&bytes, &hash_marker, algorithm, &manifest_path)?;

    let manifest = decode_manifest(&bytes, &manifest_path)?;
    if manifest.checksum() != algorithm {
        return Err(DepotError::InvalidManifest(format!(
            "'{}' records {} bundle hashes but this backend verifies with {}",
            manifest_path.display(),
            manifest.checksum(),
            algorithm
        )));
    }
    if manifest.resource_version() != version || manifest.package_name() != layout.package_name()
    {
        return Err(DepotError::InvalidManifest(format!(
            "'{}' describes {} {} instead of {} {}",
            manifest_path.display(),
            manifest.package_name(),
            manifest.resource_version(),
            layout.package_name(),
            version
        )));
    }

    log::debug!(
        "Loaded manifest {} {} ({} bundles) from '{}'",
        manifest.package_name(),
        version,
        manifest.len(),
        manifest_path.display()
    );
    Ok(manifest)
}

/// Writes the binary manifest and its hash marker under `root`.
///
/// The manifest is written before its hash marker, so a reader never sees a
/// marker without the bytes it describes.
pub async fn write_manifest(
    root: &Path,
    layout: &PackageLayout,
    manifest: &Manifest,
    algorithm: ChecksumAlgorithm,
) -> DepotResult<()> {
    let version = manifest.resource_version();
    let bytes = encode_manifest(manifest)?;
    let hash = algorithm.hex_digest(&bytes);

    files::write_atomic(&root.join(layout.manifest_file_name(version)), &bytes).await?;
    files::write_atomic(&root.join(layout.hash_file_name(version)), hash.as_bytes()).await?;
    Ok(())
}

/// Writes the version marker under `root`.
pub async fn write_version(
    root: &Path,
    layout: &PackageLayout,
    version: &ResourceVersion,
) -> DepotResult<()> {
    files::write_atomic(
        &root.join(layout.version_file_name()),
        version.as_str().as_bytes(),
    )
    .await
}
