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

//! The download pipeline: bounded, retrying, verified materialization of
//! remote bundles into local storage.
//!
//! Admission is a FIFO semaphore sized by the configured maximum number of
//! simultaneous downloads. A file name can only hold one admission at a time,
//! so two downloads never write the same path concurrently.

use crate::{codec, files};
use depot_core::{
    with_timeout, ByteFetcher, ChecksumAlgorithm, DecryptFileInfo, DecryptionService, DepotError,
    DepotResult, ManifestBundle, RemoteService, ResourceVersion,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Holds a file name's exclusive reservation until dropped.
struct NameReservation {
    file_name: String,
    in_flight: InFlight,
}

impl Drop for NameReservation {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.file_name);
    }
}

/// An admitted download: one pool slot plus the exclusive reservation of the
/// bundle's file name. Both are released when the slot is dropped.
pub struct DownloadSlot {
    bundle: ManifestBundle,
    _reservation: NameReservation,
    _permit: OwnedSemaphorePermit,
}

impl DownloadSlot {
    /// The bundle this slot was admitted for.
    pub fn bundle(&self) -> &ManifestBundle {
        &self.bundle
    }
}

/// The result of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    /// The bundle file name.
    pub file_name: String,
    /// Attempts spent, including the successful one.
    pub attempts: u32,
    /// Bytes committed to disk.
    pub size_bytes: u64,
    /// Whether the successful attempt used the fallback URL.
    pub used_fallback: bool,
}

/// Fetches bundles from a remote origin into a destination directory.
pub struct DownloadPipeline {
    remote: Arc<dyn RemoteService>,
    fetcher: Arc<dyn ByteFetcher>,
    decryption: Option<Arc<dyn DecryptionService>>,
    checksum: ChecksumAlgorithm,
    slots: Arc<Semaphore>,
    in_flight: InFlight,
}

impl DownloadPipeline {
    /// Creates a pipeline admitting at most `max_concurrent` downloads at once.
    pub fn new(
        remote: Arc<dyn RemoteService>,
        fetcher: Arc<dyn ByteFetcher>,
        checksum: ChecksumAlgorithm,
        max_concurrent: usize,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            remote,
            fetcher,
            decryption: None,
            checksum,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Decrypts every downloaded bundle before it is persisted.
    pub fn with_decryption(mut self, decryption: Arc<dyn DecryptionService>) -> Self {
        self.decryption = Some(decryption);
        self
    }

    /// The remote service URLs are resolved through.
    pub fn remote(&self) -> &Arc<dyn RemoteService> {
        &self.remote
    }

    /// The transport bytes are fetched with.
    pub fn fetcher(&self) -> &Arc<dyn ByteFetcher> {
        &self.fetcher
    }

    /// Number of file names currently reserved, admitted or queued.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Waits for a free slot for `bundle`.
    ///
    /// Slots are granted in request order. A file name that already holds a
    /// reservation is rejected with [`DepotError::DownloadInFlight`] instead
    /// of queueing a second writer behind the first.
    pub async fn admit(&self, bundle: &ManifestBundle) -> DepotResult<DownloadSlot> {
        let reservation = {
            let mut in_flight = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(bundle.file_name.clone()) {
                return Err(DepotError::DownloadInFlight {
                    file_name: bundle.file_name.clone(),
                });
            }
            NameReservation {
                file_name: bundle.file_name.clone(),
                in_flight: Arc::clone(&self.in_flight),
            }
        };

        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| DepotError::TaskAborted {
                file_name: bundle.file_name.clone(),
            })?;

        Ok(DownloadSlot {
            bundle: bundle.clone(),
            _reservation: reservation,
            _permit: permit,
        })
    }

    /// Downloads the admitted bundle to `destination`.
    ///
    /// Every attempt fetches, decrypts when configured, writes a partial
    /// file, re-reads it and checks it against the manifest hash before
    /// committing it. Retryable failures spend one attempt each; the last
    /// attempt of a multi-attempt budget goes to the fallback URL. The slot
    /// is released when this returns.
    pub async fn download(
        &self,
        slot: DownloadSlot,
        version: &ResourceVersion,
        destination: &Path,
        retry_count: u32,
        timeout: Duration,
    ) -> DepotResult<DownloadOutcome> {
        let bundle = &slot.bundle;
        let attempts = retry_count.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let used_fallback = attempts > 1 && attempt == attempts;
            let url = if used_fallback {
                self.remote.fallback_remote_url(&bundle.file_name)
            } else {
                self.remote.remote_url(&bundle.file_name)
            };
            log::debug!(
                "Downloading '{}' ({}) attempt {}/{} from {}",
                bundle.file_name,
                version,
                attempt,
                attempts,
                url
            );

            match self.attempt(bundle, &url, destination, timeout).await {
                Ok(size_bytes) => {
                    log::info!(
                        "Downloaded '{}' ({} bytes) in {} attempt(s)",
                        bundle.file_name,
                        size_bytes,
                        attempt
                    );
                    return Ok(DownloadOutcome {
                        file_name: bundle.file_name.clone(),
                        attempts: attempt,
                        size_bytes,
                        used_fallback,
                    });
                }
                Err(e) if e.is_retryable() => {
                    log::warn!(
                        "Attempt {}/{} for '{}' failed: {}",
                        attempt,
                        attempts,
                        bundle.file_name,
                        e
                    );
                    last_error = Some(e);
                }
                Err(e) => {
                    log::error!("Download of '{}' failed: {}", bundle.file_name, e);
                    return Err(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| DepotError::NotFound {
            location: bundle.file_name.clone(),
        });
        log::error!(
            "Giving up on '{}' after {} attempt(s): {}",
            bundle.file_name,
            attempts,
            last
        );
        Err(DepotError::RetriesExhausted {
            file_name: bundle.file_name.clone(),
            attempts,
            last: Box::new(last),
        })
    }

    async fn attempt(
        &self,
        bundle: &ManifestBundle,
        url: &str,
        destination: &Path,
        timeout: Duration,
    ) -> DepotResult<u64> {
        let fetched = with_timeout(
            format!("downloading '{}'", bundle.file_name),
            timeout,
            self.fetcher.fetch(url, timeout),
        )
        .await?;

        let bytes = match &self.decryption {
            Some(decryption) => decryption.decrypt_file_stream(&DecryptFileInfo {
                bundle_name: &bundle.file_name,
                load_path: url,
                expected_crc: &bundle.hash,
                data: &fetched,
            })?,
            None => fetched,
        };

        let partial = files::partial_path(destination);
        let result = self.persist_verified(bundle, &bytes, &partial, destination).await;
        if result.is_err() {
            if let Err(e) = files::remove_if_exists(&partial).await {
                log::warn!("Could not remove '{}': {}", partial.display(), e);
            }
        }
        result
    }

    async fn persist_verified(
        &self,
        bundle: &ManifestBundle,
        bytes: &[u8],
        partial: &Path,
        destination: &Path,
    ) -> DepotResult<u64> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DepotError::io(parent, e))?;
        }
        tokio::fs::write(partial, bytes)
            .await
            .map_err(|e| DepotError::io(partial, e))?;

        let on_disk = tokio::fs::read(partial)
            .await
            .map_err(|e| DepotError::io(partial, e))?;
        codec::verify_bundle_bytes(&on_disk, bundle, self.checksum, destination)?;

        tokio::fs::rename(partial, destination)
            .await
            .map_err(|e| DepotError::io(destination, e))?;
        Ok(on_disk.len() as u64)
    }
}
