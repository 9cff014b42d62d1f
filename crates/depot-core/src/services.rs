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

//! Collaborator interfaces consumed by the file systems.
//!
//! Implementations live outside this crate: the `depot-io` crate provides the
//! HTTP fetcher, URL templates and a directory package builder, while
//! applications supply their own decryption.

use crate::error::{DepotError, DepotResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolves a file name to the URLs it can be fetched from.
pub trait RemoteService: Send + Sync {
    /// Primary URL of `file_name`.
    fn remote_url(&self, file_name: &str) -> String;

    /// Fallback URL of `file_name`, tried on the last attempt of a download.
    fn fallback_remote_url(&self, file_name: &str) -> String;
}

/// What a [`DecryptionService`] is told about the file it decrypts.
#[derive(Debug, Clone, Copy)]
pub struct DecryptFileInfo<'a> {
    /// Bundle file name.
    pub bundle_name: &'a str,
    /// Where the bytes were loaded from (URL or path).
    pub load_path: &'a str,
    /// Checksum the decrypted bytes are expected to have.
    pub expected_crc: &'a str,
    /// The encrypted bytes.
    pub data: &'a [u8],
}

/// Reverses the obfuscation applied to published bundles.
pub trait DecryptionService: Send + Sync {
    /// Decrypts a binary file.
    fn decrypt_file_stream(&self, info: &DecryptFileInfo<'_>) -> DepotResult<Vec<u8>>;

    /// Decrypts a text file. Defaults to decrypting the bytes and reading
    /// them as UTF-8.
    fn decrypt_file_text(&self, info: &DecryptFileInfo<'_>) -> DepotResult<String> {
        let bytes = self.decrypt_file_stream(info)?;
        String::from_utf8(bytes).map_err(|e| DepotError::Decryption {
            bundle: info.bundle_name.to_string(),
            reason: format!("decrypted text is not UTF-8: {e}"),
        })
    }
}

/// Transport used to pull bytes from a remote origin.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Fetches the whole body at `url`. The timeout covers the request from
    /// start to last byte.
    async fn fetch(&self, url: &str, timeout: Duration) -> DepotResult<Vec<u8>>;
}

/// The build step that materializes a package directory from sources.
///
/// Used by the editor-simulated file system, which rebuilds its package on
/// every run instead of shipping one.
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    /// Where the package will be written.
    fn output_directory(&self) -> &Path;

    /// Builds the package and returns its root directory.
    async fn build(&self) -> DepotResult<PathBuf>;
}
