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

//! Checksum algorithms used to verify manifests and bundles.
//!
//! The algorithm is a deployment parameter. MD5 is the default because it is
//! what published packages have historically carried; SHA-256 and BLAKE3 are
//! available for new deployments.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// The hash function used to compute checksums, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, 32 hex characters.
    #[default]
    Md5,
    /// SHA-256, 64 hex characters.
    Sha256,
    /// BLAKE3, 64 hex characters.
    Blake3,
}

impl ChecksumAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Computes the lowercase hex checksum of `bytes`.
    pub fn hex_digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", md5::compute(bytes)),
            Self::Sha256 => format!("{:x}", Sha256::digest(bytes)),
            Self::Blake3 => blake3::hash(bytes).to_hex().to_string(),
        }
    }

    /// Checks `bytes` against an expected checksum.
    ///
    /// Surrounding whitespace and letter case of `expected` are ignored, since
    /// hash markers are plain text files that editors like to touch.
    pub fn matches(&self, bytes: &[u8], expected: &str) -> bool {
        self.hex_digest(bytes)
            .eq_ignore_ascii_case(expected.trim())
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("unknown checksum algorithm '{other}'")),
        }
    }
}
