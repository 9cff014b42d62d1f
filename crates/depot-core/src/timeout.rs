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

//! Bounded waiting for suspending operations.

use crate::error::{DepotError, DepotResult};
use std::future::Future;
use std::time::Duration;

/// Runs `future`, failing with [`DepotError::Timeout`] once `timeout` has
/// elapsed. Dropping the future on expiry cancels only that operation.
pub async fn with_timeout<T, F>(
    operation: impl Into<String>,
    timeout: Duration,
    future: F,
) -> DepotResult<T>
where
    F: Future<Output = DepotResult<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            let operation = operation.into();
            log::warn!("{operation} timed out after {:?}", timeout);
            Err(DepotError::Timeout {
                operation,
                after: timeout,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_budget() {
        let value = with_timeout("quick", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_expiry_becomes_timeout_error() {
        let result: DepotResult<()> = with_timeout("slow read", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        match result {
            Err(DepotError::Timeout { operation, after }) => {
                assert_eq!(operation, "slow read");
                assert_eq!(after, Duration::from_millis(10));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_inner_errors_pass_through() {
        let result: DepotResult<()> = with_timeout("read", Duration::from_secs(1), async {
            Err(DepotError::not_found("missing.bundle"))
        })
        .await;
        assert!(result.unwrap_err().is_not_found());
    }
}
