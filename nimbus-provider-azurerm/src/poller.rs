//! Long-running operation polling

use std::time::Duration;

use nimbus_core::provider::{ProviderError, ProviderResult};

use crate::client::{ManagementClient, OperationHandle, OperationStatus};

/// Poll `handle` every `interval` until it succeeds, fails, or `timeout` elapses
pub async fn wait_for_completion(
    client: &dyn ManagementClient,
    handle: &OperationHandle,
    interval: Duration,
    timeout: Duration,
) -> ProviderResult<()> {
    match tokio::time::timeout(timeout, poll(client, handle, interval)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::new(format!(
            "timed out after {:?} waiting for operation {} on {}",
            timeout, handle.operation_id, handle.resource_id
        ))),
    }
}

async fn poll(
    client: &dyn ManagementClient,
    handle: &OperationHandle,
    interval: Duration,
) -> ProviderResult<()> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let status = client.operation_status(handle).await.map_err(|e| {
            ProviderError::new(format!("polling operation {}", handle.operation_id)).with_cause(e)
        })?;

        match status {
            OperationStatus::Succeeded => {
                log::debug!(
                    "Operation {} on {} succeeded after {} poll(s)",
                    handle.operation_id,
                    handle.resource_id,
                    attempt
                );
                return Ok(());
            }
            OperationStatus::Failed(message) => {
                return Err(ProviderError::new(format!("Operation failed: {}", message)));
            }
            OperationStatus::Canceled => {
                return Err(ProviderError::new("Operation was cancelled"));
            }
            OperationStatus::InProgress => {
                log::debug!(
                    "Operation {} on {} still in progress (poll {})",
                    handle.operation_id,
                    handle.resource_id,
                    attempt
                );
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;
    use serde_json::json;

    const ID: &str = "/subscriptions/sub1/resourceGroups/rg1";

    #[tokio::test]
    async fn waits_through_pending_polls() {
        let client = InMemoryClient::new().with_pending_polls(3);
        let handle = client.begin_create_or_update(ID, "v", json!({})).await.unwrap();
        wait_for_completion(&client, &handle, Duration::from_millis(1), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reports_failure() {
        let client = InMemoryClient::new();
        client.fail_operations_on(ID, "InternalServerError").await;
        let handle = client.begin_create_or_update(ID, "v", json!({})).await.unwrap();
        let err = wait_for_completion(&client, &handle, Duration::from_millis(1), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Operation failed: InternalServerError");
    }

    #[tokio::test(start_paused = true)]
    async fn times_out() {
        let client = InMemoryClient::new().with_pending_polls(u32::MAX);
        let handle = client.begin_create_or_update(ID, "v", json!({})).await.unwrap();
        let err = wait_for_completion(&client, &handle, Duration::from_secs(10), Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("timed out after 60s"));
    }
}
