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

//! # Depot Kernel
//!
//! The mode-specific orchestrators that select and drive the file-system
//! backends. An application builds one [`Kernel`] from its configuration,
//! initializes it once, and then asks it which bundles changed, downloads
//! them, and loads verified bundle bytes.

#![warn(missing_docs)]

pub mod editor;
pub mod kernel;
pub mod online;
pub mod report;
pub mod state;
pub mod traits;

pub use editor::EditorSimulateKernel;
pub use kernel::{Kernel, KernelServices};
pub use online::OnlineKernel;
pub use report::{BundleFailure, UpdateOptions, UpdateReport};
pub use state::LoadedState;
pub use traits::ResourceKernel;
