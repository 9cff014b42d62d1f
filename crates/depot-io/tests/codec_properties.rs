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

//! Properties of the manifest codec that hold for every generated input.

use depot_core::fs::PackageLayout;
use depot_core::{ChecksumAlgorithm, DepotError, Manifest, ManifestBundle, ResourceVersion};
use depot_io::codec;
use proptest::prelude::*;
use std::path::Path;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn algorithm_strategy() -> impl Strategy<Value = ChecksumAlgorithm> {
    prop_oneof![
        Just(ChecksumAlgorithm::Md5),
        Just(ChecksumAlgorithm::Sha256),
        Just(ChecksumAlgorithm::Blake3),
    ]
}

fn version_strategy() -> impl Strategy<Value = ResourceVersion> {
    "[A-Za-z0-9._-]{1,16}"
        .prop_filter("dot segments are not versions", |v| v != "." && v != "..")
        .prop_map(ResourceVersion::new)
}

// Nested forward-slash paths, optionally with an extension.
fn file_name_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z0-9_-]{1,8}", 1..4),
        prop::option::of("[a-z]{1,4}"),
    )
        .prop_map(|(segments, extension)| {
            let mut name = segments.join("/");
            if let Some(extension) = extension {
                name.push('.');
                name.push_str(&extension);
            }
            name
        })
        .prop_filter("reserved suffix", |name| !name.ends_with(".part"))
}

// Unique names in arbitrary insertion order, including the empty manifest.
fn manifest_strategy() -> impl Strategy<Value = Manifest> {
    let bundles = prop::collection::btree_set(file_name_strategy(), 0..12)
        .prop_map(|names| names.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
        .prop_flat_map(|names| {
            let count = names.len();
            (
                Just(names),
                prop::collection::vec(("[0-9a-f]{32}", any::<u64>()), count),
            )
        })
        .prop_map(|(names, entries)| {
            names
                .into_iter()
                .zip(entries)
                .map(|(name, (hash, size))| ManifestBundle::new(name, hash, size))
                .collect::<Vec<_>>()
        });

    ("[A-Za-z][A-Za-z0-9_]{0,11}", version_strategy(), algorithm_strategy(), bundles)
        .prop_map(|(package, version, algorithm, bundles)| {
            Manifest::new(package, version, algorithm, bundles)
        })
        .prop_filter_map("generated manifest is valid", Result::ok)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_decode_inverts_encode(manifest in manifest_strategy()) {
        let bytes = codec::encode_manifest(&manifest).unwrap();
        let decoded = codec::decode_manifest(&bytes, Path::new("Main.bytes")).unwrap();
        prop_assert_eq!(decoded.bundles(), manifest.bundles());
        prop_assert_eq!(decoded, manifest);
    }

    #[test]
    fn test_written_manifest_verifies_and_loads(manifest in manifest_strategy()) {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackageLayout::new(manifest.package_name());
        let algorithm = manifest.checksum();

        let loaded = runtime().block_on(async {
            codec::write_manifest(dir.path(), &layout, &manifest, algorithm)
                .await
                .unwrap();
            codec::load_verified_manifest(
                dir.path(),
                &layout,
                manifest.resource_version(),
                algorithm,
                TIMEOUT,
            )
            .await
            .unwrap()
        });
        prop_assert_eq!(loaded, manifest);
    }

    #[test]
    fn test_mismatched_marker_is_corrupted(
        bytes in prop::collection::vec(any::<u8>(), 0..256),
        marker in "[0-9a-f]{32}",
        algorithm in algorithm_strategy(),
    ) {
        prop_assume!(!algorithm.hex_digest(&bytes).eq_ignore_ascii_case(&marker));
        let err = codec::verify_manifest_bytes(&bytes, &marker, algorithm, Path::new("Main.bytes"))
            .unwrap_err();
        prop_assert!(err.is_corrupted(), "expected Corrupted, got {}", err);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Arbitrary bytes mostly fail to decode, so a Decode error here would
    // mean the decoder ran before the hash marker was checked.
    #[test]
    fn test_stored_manifest_with_wrong_marker_is_never_decoded(
        payload in prop_oneof![
            prop::collection::vec(any::<u8>(), 0..256),
            manifest_strategy().prop_map(|m| codec::encode_manifest(&m).unwrap()),
        ],
        marker in "[0-9a-f]{32}",
        algorithm in algorithm_strategy(),
    ) {
        prop_assume!(!algorithm.hex_digest(&payload).eq_ignore_ascii_case(&marker));
        let dir = tempfile::tempdir().unwrap();
        let layout = PackageLayout::new("Main");
        let version = ResourceVersion::from("v1");
        std::fs::write(dir.path().join(layout.manifest_file_name(&version)), &payload).unwrap();
        std::fs::write(dir.path().join(layout.hash_file_name(&version)), &marker).unwrap();

        let err = runtime()
            .block_on(codec::load_verified_manifest(
                dir.path(),
                &layout,
                &version,
                algorithm,
                TIMEOUT,
            ))
            .unwrap_err();
        match err {
            DepotError::Corrupted { expected, .. } => prop_assert_eq!(expected, marker),
            other => prop_assert!(false, "expected Corrupted, got {}", other),
        }
    }
}
