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

//! Identity types for published content and loadable resources.

use crate::error::{DepotError, DepotResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque token identifying one published content snapshot.
///
/// Versions are compared for identity only. They are never parsed as semver,
/// and ordering exists solely so versions can key sorted collections.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Wraps a version token. Surrounding whitespace is dropped so that a
    /// version marker read from disk compares equal to the one it was
    /// written from.
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().to_string())
    }

    /// Wraps a token read from a version marker, rejecting anything that
    /// cannot be embedded in a package file name.
    pub fn parse(token: impl AsRef<str>, location: impl fmt::Display) -> DepotResult<Self> {
        let version = Self::new(token);
        version.validate().map_err(|reason| DepotError::Decode {
            location: location.to_string(),
            reason,
        })?;
        Ok(version)
    }

    /// Checks that the token is a single non-empty file name component.
    ///
    /// Versions are spliced into `<package>_<version>.hash` and `.bytes`
    /// names, so separators and dot segments would move those files out of
    /// their package root.
    pub fn validate(&self) -> Result<(), String> {
        let token = self.0.as_str();
        if token.is_empty() {
            return Err("version token is empty".to_string());
        }
        if token == "." || token == ".." {
            return Err(format!("version token '{token}' is a dot segment"));
        }
        if let Some(c) = token
            .chars()
            .find(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
        {
            return Err(format!("version token '{token}' contains {c:?}"));
        }
        Ok(())
    }

    /// Returns the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the token is empty, which no valid package carries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceVersion {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceVersion {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A loadable resource referenced by its decomposed identity.
///
/// Equality and hashing run over the three components, so two names built
/// separately from the same parts are the same key in any map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName {
    name: String,
    variant: Option<String>,
    extension: String,
}

impl ResourceName {
    /// Creates a name from its components. An empty variant counts as none.
    pub fn new(
        name: impl Into<String>,
        variant: Option<impl Into<String>>,
        extension: impl Into<String>,
    ) -> Self {
        let variant = variant.map(Into::into).filter(|v: &String| !v.is_empty());
        Self {
            name: name.into(),
            variant,
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Splits a plain file name into name and extension, without variant.
    pub fn from_file_name(file_name: &str) -> Self {
        match file_name.rsplit_once('.') {
            Some((name, extension)) if !name.is_empty() => {
                Self::new(name, None::<String>, extension)
            }
            _ => Self::new(file_name, None::<String>, ""),
        }
    }

    /// The base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variant, if any.
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// The extension, without its leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// The canonical full name: `name[_variant][.extension]`.
    pub fn full_name(&self) -> String {
        let mut full = self.name.clone();
        if let Some(variant) = &self.variant {
            full.push('_');
            full.push_str(variant);
        }
        if !self.extension.is_empty() {
            full.push('.');
            full.push_str(&self.extension);
        }
        full
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
