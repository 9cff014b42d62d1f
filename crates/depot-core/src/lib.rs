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

//! # Depot Core
//!
//! Foundational crate containing the contracts and plain data types of the
//! resource delivery runtime: the manifest model, checksum algorithms, the
//! error taxonomy, the [`fs::FileSystem`] contract shared by every storage
//! backend, and the collaborator traits consumed from the outside world.
//!
//! Nothing in this crate touches the network, and file I/O is limited to
//! reading configuration.

#![warn(missing_docs)]

pub mod checksum;
pub mod config;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod resource;
pub mod services;
pub mod timeout;

pub use checksum::ChecksumAlgorithm;
pub use config::{BuildMode, DepotConfig};
pub use error::{DepotError, DepotResult};
pub use fs::{FileSystem, FileSystemKind, InitResult, ManifestResult};
pub use manifest::{Manifest, ManifestBundle};
pub use resource::{ResourceName, ResourceVersion};
pub use services::{ByteFetcher, DecryptFileInfo, DecryptionService, PackageBuilder, RemoteService};
pub use timeout::with_timeout;
