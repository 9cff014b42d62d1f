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

//! The manifest model: the versioned index of every bundle in a package.

use crate::checksum::ChecksumAlgorithm;
use crate::error::{DepotError, DepotResult};
use crate::resource::ResourceVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One deliverable unit of content.
///
/// Two bundles with the same `file_name` and `hash` are interchangeable. A
/// bundle whose `file_name` matches but whose `hash` differs is stale and gets
/// replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestBundle {
    /// Unique key within a manifest; a forward-slash relative path.
    pub file_name: String,
    /// Lowercase hex checksum of the bundle bytes.
    pub hash: String,
    /// Size of the bundle in bytes.
    pub size_bytes: u64,
}

impl ManifestBundle {
    /// Creates a bundle entry.
    pub fn new(file_name: impl Into<String>, hash: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            file_name: file_name.into(),
            hash: hash.into(),
            size_bytes,
        }
    }

}

/// The on-disk shape of a manifest. Decoding goes through [`Manifest::new`]
/// so that invariants are re-checked on every load.
#[derive(Clone, Serialize, Deserialize)]
struct ManifestRecord {
    package_name: String,
    resource_version: ResourceVersion,
    checksum: ChecksumAlgorithm,
    bundles: Vec<ManifestBundle>,
}

/// The versioned index of all bundles of one package.
///
/// A manifest is immutable once built. Bundles iterate in insertion order,
/// and that order is what update lists and downloads follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ManifestRecord", into = "ManifestRecord")]
pub struct Manifest {
    package_name: String,
    resource_version: ResourceVersion,
    checksum: ChecksumAlgorithm,
    bundles: Vec<ManifestBundle>,
    index: HashMap<String, usize>,
}

impl Manifest {
    /// Builds a manifest, rejecting duplicate or unsafe bundle file names.
    pub fn new(
        package_name: impl Into<String>,
        resource_version: ResourceVersion,
        checksum: ChecksumAlgorithm,
        bundles: Vec<ManifestBundle>,
    ) -> DepotResult<Self> {
        let package_name = package_name.into();
        if package_name.is_empty() {
            return Err(DepotError::InvalidManifest(
                "package name must not be empty".to_string(),
            ));
        }
        if let Err(reason) = resource_version.validate() {
            return Err(DepotError::InvalidManifest(format!(
                "package '{package_name}': {reason}"
            )));
        }

        let mut index = HashMap::with_capacity(bundles.len());
        for (position, bundle) in bundles.iter().enumerate() {
            validate_file_name(&bundle.file_name)?;
            if index.insert(bundle.file_name.clone(), position).is_some() {
                return Err(DepotError::InvalidManifest(format!(
                    "bundle '{}' appears more than once",
                    bundle.file_name
                )));
            }
        }

        Ok(Self {
            package_name,
            resource_version,
            checksum,
            bundles,
            index,
        })
    }

    /// The package this manifest belongs to.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// The version this manifest describes.
    pub fn resource_version(&self) -> &ResourceVersion {
        &self.resource_version
    }

    /// The algorithm every bundle hash was computed with.
    pub fn checksum(&self) -> ChecksumAlgorithm {
        self.checksum
    }

    /// Bundles in insertion order.
    pub fn bundles(&self) -> &[ManifestBundle] {
        &self.bundles
    }

    /// Looks a bundle up by file name.
    pub fn bundle(&self, file_name: &str) -> Option<&ManifestBundle> {
        self.index.get(file_name).map(|&i| &self.bundles[i])
    }

    /// Whether a bundle with this file name is listed.
    pub fn contains(&self, file_name: &str) -> bool {
        self.index.contains_key(file_name)
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the manifest lists no bundles.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Sum of all bundle sizes.
    pub fn total_size_bytes(&self) -> u64 {
        self.bundles.iter().map(|b| b.size_bytes).sum()
    }
}

impl TryFrom<ManifestRecord> for Manifest {
    type Error = DepotError;

    fn try_from(record: ManifestRecord) -> Result<Self, Self::Error> {
        Manifest::new(
            record.package_name,
            record.resource_version,
            record.checksum,
            record.bundles,
        )
    }
}

impl From<Manifest> for ManifestRecord {
    fn from(manifest: Manifest) -> Self {
        Self {
            package_name: manifest.package_name,
            resource_version: manifest.resource_version,
            checksum: manifest.checksum,
            bundles: manifest.bundles,
        }
    }
}

/// Bundle file names are relative forward-slash paths that must stay inside
/// the bundle directory of whichever backend stores them.
fn validate_file_name(file_name: &str) -> DepotResult<()> {
    let invalid = |reason: &str| {
        Err(DepotError::InvalidManifest(format!(
            "bundle file name '{file_name}' {reason}"
        )))
    };

    if file_name.is_empty() {
        return invalid("is empty");
    }
    if file_name.starts_with('/') || file_name.contains('\\') || file_name.contains(':') {
        return invalid("must be a relative forward-slash path");
    }
    if file_name
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid("contains an empty, '.' or '..' segment");
    }
    if file_name.ends_with(".part") {
        return invalid("uses the reserved '.part' suffix");
    }
    Ok(())
}
