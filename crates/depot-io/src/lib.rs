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

//! # Depot I/O
//!
//! I/O services for bundle delivery: the manifest codec and verifier, the
//! three file-system backends, the HTTP transport, the download pipeline
//! that materializes remote bundles into the cache, and the package builder
//! used for editor simulation and packaging tools.

pub mod builder;
pub mod builtin;
pub mod cache;
pub mod codec;
pub mod download;
pub mod editor;
pub mod fetch;
mod files;
pub mod remote;

pub use builder::DirectoryPackageBuilder;
pub use builtin::BuiltinFileSystem;
pub use cache::CacheFileSystem;
pub use download::{DownloadOutcome, DownloadPipeline, DownloadSlot};
pub use editor::EditorSimulatedFileSystem;
pub use fetch::HttpFetcher;
pub use remote::HostServerRemote;
