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

//! Small async file helpers shared by the backends.

use depot_core::fs::PARTIAL_SUFFIX;
use depot_core::{with_timeout, DepotError, DepotResult};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

pub(crate) async fn exists(path: &Path) -> DepotResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| DepotError::io(path, e))
}

pub(crate) async fn read_bytes(path: &Path, timeout: Duration) -> DepotResult<Vec<u8>> {
    with_timeout(format!("reading '{}'", path.display()), timeout, async {
        tokio::fs::read(path)
            .await
            .map_err(|e| DepotError::io(path, e))
    })
    .await
}

pub(crate) async fn read_text(path: &Path, timeout: Duration) -> DepotResult<String> {
    let bytes = read_bytes(path, timeout).await?;
    String::from_utf8(bytes).map_err(|e| DepotError::Decode {
        location: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Writes through a sibling partial file and renames it into place.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> DepotResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DepotError::io(parent, e))?;
    }
    let partial = partial_path(path);
    tokio::fs::write(&partial, bytes)
        .await
        .map_err(|e| DepotError::io(&partial, e))?;
    tokio::fs::rename(&partial, path)
        .await
        .map_err(|e| DepotError::io(path, e))
}

pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

pub(crate) async fn remove_if_exists(path: &Path) -> DepotResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DepotError::io(path, e)),
    }
}

/// A file below a bundle directory, with its forward-slash relative name.
pub(crate) struct BundleEntry {
    pub(crate) file_name: String,
    pub(crate) path: PathBuf,
}

/// Lists every file below `directory`. A missing directory lists as empty.
/// Partial downloads are listed too, so cleanup can reach them.
pub(crate) async fn list_bundle_files(directory: &Path) -> DepotResult<Vec<BundleEntry>> {
    let directory = directory.to_path_buf();
    let walk_root = directory.clone();
    tokio::task::spawn_blocking(move || -> DepotResult<Vec<BundleEntry>> {
        let mut entries = Vec::new();
        if !walk_root.is_dir() {
            return Ok(entries);
        }
        for entry in WalkDir::new(&walk_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let location = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| walk_root.clone());
                match e.into_io_error() {
                    Some(io) => DepotError::io(location, io),
                    None => DepotError::Io {
                        location: location.display().to_string(),
                        source: std::io::Error::other("file system loop"),
                    },
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&walk_root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(BundleEntry {
                file_name: relative,
                path: entry.into_path(),
            });
        }
        Ok(entries)
    })
    .await
    .map_err(|e| DepotError::Io {
        location: directory.display().to_string(),
        source: std::io::Error::other(e.to_string()),
    })?
}

/// Counts committed bundle files, ignoring partial downloads.
pub(crate) async fn count_bundle_files(directory: &Path) -> DepotResult<usize> {
    Ok(list_bundle_files(directory)
        .await?
        .iter()
        .filter(|entry| !entry.file_name.ends_with(PARTIAL_SUFFIX))
        .count())
}
