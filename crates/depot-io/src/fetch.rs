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

//! HTTP transport for remote origins.

use async_trait::async_trait;
use depot_core::{ByteFetcher, DepotError, DepotResult};
use std::time::Duration;

/// A [`ByteFetcher`] backed by a shared `reqwest` client.
///
/// A 404 maps to [`DepotError::NotFound`], any other non-success status and
/// transport errors to [`DepotError::NetworkFailure`], and an elapsed request
/// to [`DepotError::Timeout`]. All of them are retryable.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher over an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn map_error(url: &str, timeout: Duration, error: reqwest::Error) -> DepotError {
        if error.is_timeout() {
            DepotError::Timeout {
                operation: format!("fetching '{url}'"),
                after: timeout,
            }
        } else {
            DepotError::NetworkFailure {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> DepotResult<Vec<u8>> {
        log::debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(url, timeout, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DepotError::NotFound {
                location: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DepotError::NetworkFailure {
                url: url.to_string(),
                reason: format!("server answered {status}"),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(url, timeout, e))?;
        Ok(body.to_vec())
    }
}
