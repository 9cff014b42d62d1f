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

//! Defines the error taxonomy shared by every file system and kernel.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the depot crates.
pub type DepotResult<T> = Result<T, DepotError>;

/// Every failure a file system, the download pipeline or a kernel can report.
///
/// Each variant carries the location (path, URL or file name) it concerns so
/// that a failure can always be attributed to a concrete file.
#[derive(Error, Debug)]
pub enum DepotError {
    /// An expected file is absent from a backend that should contain it.
    #[error("'{location}' was not found")]
    NotFound {
        /// The path or URL that was looked up.
        location: String,
    },

    /// The checksum of some bytes disagrees with the one recorded for them.
    #[error("'{location}' is corrupted: expected checksum {expected}, computed {actual}")]
    Corrupted {
        /// The path or URL whose content failed verification.
        location: String,
        /// The checksum recorded by the manifest or hash marker.
        expected: String,
        /// The checksum computed from the bytes actually read.
        actual: String,
    },

    /// An operation exceeded its allotted time.
    #[error("{operation} timed out after {:.1}s", .after.as_secs_f64())]
    Timeout {
        /// A short description of the operation.
        operation: String,
        /// The budget that was exceeded.
        after: Duration,
    },

    /// The operation is not implemented by this backend.
    #[error("{operation} is not supported by the {backend} file system")]
    Unsupported {
        /// The rejected operation.
        operation: &'static str,
        /// The backend that rejected it.
        backend: &'static str,
    },

    /// A transport-level failure distinct from a timeout.
    #[error("network failure while fetching '{url}': {reason}")]
    NetworkFailure {
        /// The URL being fetched.
        url: String,
        /// The transport error, rendered.
        reason: String,
    },

    /// A local I/O operation failed for a reason other than absence.
    #[error("i/o error on '{location}': {source}")]
    Io {
        /// The path being accessed.
        location: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Verified bytes could not be decoded into a manifest.
    #[error("failed to decode '{location}': {reason}")]
    Decode {
        /// The path of the undecodable file.
        location: String,
        /// The decoder error, rendered.
        reason: String,
    },

    /// A manifest could not be encoded.
    #[error("failed to encode manifest: {0}")]
    Encode(String),

    /// A manifest violates one of its structural invariants.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// The decryption service rejected a bundle.
    #[error("decryption of '{bundle}' failed: {reason}")]
    Decryption {
        /// The bundle being decrypted.
        bundle: String,
        /// The reason given by the service.
        reason: String,
    },

    /// Startup configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A backend or kernel was queried before its `init` completed.
    #[error("{0} has not been initialized")]
    NotInitialized(&'static str),

    /// A download for this file name is already admitted.
    #[error("a download of '{file_name}' is already in flight")]
    DownloadInFlight {
        /// The duplicated file name.
        file_name: String,
    },

    /// A download task ended without reporting a result.
    #[error("the download task for '{file_name}' was aborted")]
    TaskAborted {
        /// The bundle whose task vanished.
        file_name: String,
    },

    /// Every attempt allowed by the retry budget failed.
    #[error("downloading '{file_name}' failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        /// The bundle that could not be materialized.
        file_name: String,
        /// How many attempts were made.
        attempts: u32,
        /// The failure of the final attempt.
        last: Box<DepotError>,
    },
}

impl DepotError {
    /// Builds a [`DepotError::NotFound`] for a local path.
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            location: path.as_ref().display().to_string(),
        }
    }

    /// Builds a [`DepotError::Corrupted`] for a local path.
    pub fn corrupted(
        path: impl AsRef<Path>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Corrupted {
            location: path.as_ref().display().to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Maps an I/O error on `path`. Absence becomes [`DepotError::NotFound`].
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::Io {
                location: path.as_ref().display().to_string(),
                source,
            }
        }
    }

    /// Builds a [`DepotError::Unsupported`].
    pub fn unsupported(operation: &'static str, backend: &'static str) -> Self {
        Self::Unsupported { operation, backend }
    }

    /// Whether the download pipeline may spend another attempt on this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Corrupted { .. }
                | Self::Timeout { .. }
                | Self::NetworkFailure { .. }
                | Self::Io { .. }
        )
    }

    /// Whether the failure means "the file is not there".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the failure is a checksum mismatch.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }

    /// Whether the failure is a rejected, unimplemented operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
