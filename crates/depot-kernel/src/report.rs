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

//! Options and outcome of a bundle update batch.

use depot_core::{DepotConfig, DepotError};
use std::time::Duration;

/// Per-batch download settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Attempts per bundle, fallback URL included.
    pub retry_count: u32,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            retry_count: 3,
            timeout: Duration::from_secs(60),
        }
    }
}

impl UpdateOptions {
    /// The retry count and download timeout of a configuration.
    pub fn from_config(config: &DepotConfig) -> Self {
        Self {
            retry_count: config.failed_retry_count,
            timeout: config.download_timeout(),
        }
    }
}

/// A bundle the batch could not download.
#[derive(Debug)]
pub struct BundleFailure {
    /// The bundle file name.
    pub file_name: String,
    /// Why it failed.
    pub error: DepotError,
}

/// Terminal result of every bundle of a batch, in input order.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// File names downloaded and verified.
    pub succeeded: Vec<String>,
    /// Bundles that failed.
    pub failed: Vec<BundleFailure>,
}

impl UpdateReport {
    /// Whether every bundle succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of bundles the batch handled.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// The failure recorded for `file_name`, if any.
    pub fn failure(&self, file_name: &str) -> Option<&BundleFailure> {
        self.failed.iter().find(|f| f.file_name == file_name)
    }
}
