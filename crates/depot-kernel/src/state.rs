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

//! The version and manifest a kernel currently serves.

use depot_core::{DepotError, DepotResult, Manifest, ResourceVersion};
use std::sync::{Arc, PoisonError, RwLock};

/// A resource version together with its verified manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedState {
    manifest: Manifest,
}

impl LoadedState {
    /// Wraps a verified manifest.
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    /// The loaded resource version.
    pub fn version(&self) -> &ResourceVersion {
        self.manifest.resource_version()
    }

    /// The loaded manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }
}

/// Holds the loaded state and swaps it atomically.
#[derive(Debug, Default)]
pub(crate) struct StateCell {
    current: RwLock<Option<Arc<LoadedState>>>,
}

impl StateCell {
    pub(crate) fn load(&self) -> Option<Arc<LoadedState>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn require(&self, kernel: &'static str) -> DepotResult<Arc<LoadedState>> {
        self.load().ok_or(DepotError::NotInitialized(kernel))
    }

    pub(crate) fn store(&self, state: LoadedState) -> Arc<LoadedState> {
        let state = Arc::new(state);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&state));
        state
    }
}
