//! Batch fan-out with bounded retry
//!
//! `BatchWriteItem` accepts at most 25 items per call and may apply only a
//! subset, returning the rest as unprocessed. Chunks are issued
//! concurrently; each call re-submits exactly its unprocessed remainder
//! with exponential backoff until none remain or the attempt budget runs
//! out.

use std::time::Duration;

use aws_sdk_dynamodb::types::WriteRequest;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use rand::Rng;

use super::{WriteError, WriteResult};

/// Most items one `BatchWriteItem` call accepts
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Retry policy for unprocessed batch items
#[derive(Debug, Clone)]
pub struct BatchRetryConfig {
    /// Attempts per chunk before giving up
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each further attempt
    pub initial_backoff: Duration,
}

impl Default for BatchRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
        }
    }
}

/// Fans the requests out in store-sized chunks, all in flight at once
pub(crate) async fn execute(
    dynamodb_client: &DynamoDbClient,
    table: &str,
    requests: Vec<WriteRequest>,
    retry: &BatchRetryConfig,
) -> WriteResult<()> {
    if requests.is_empty() {
        return Ok(());
    }

    let calls = requests
        .chunks(MAX_BATCH_WRITE_ITEMS)
        .map(|chunk| submit_chunk(dynamodb_client, table, chunk.to_vec(), retry));

    futures::future::try_join_all(calls).await?;
    Ok(())
}

/// Issues one chunk, re-submitting unprocessed items until done
async fn submit_chunk(
    dynamodb_client: &DynamoDbClient,
    table: &str,
    mut pending: Vec<WriteRequest>,
    retry: &BatchRetryConfig,
) -> WriteResult<()> {
    for attempt in 1..=retry.max_attempts {
        let response = dynamodb_client
            .batch_write_item()
            .request_items(table, pending.clone())
            .send()
            .await?;

        pending = response
            .unprocessed_items()
            .and_then(|unprocessed| unprocessed.get(table))
            .cloned()
            .unwrap_or_default();

        if pending.is_empty() {
            return Ok(());
        }

        if attempt < retry.max_attempts {
            let delay = backoff_delay(retry.initial_backoff, attempt);
            tracing::warn!(
                table,
                unprocessed = pending.len(),
                attempt,
                "retrying unprocessed batch items after {delay:?}"
            );
            tokio::time::sleep(delay).await;
        }
    }

    tracing::error!(
        table,
        remaining = pending.len(),
        "batch write retries exhausted"
    );
    Err(WriteError::BatchWriteExhausted {
        attempts: retry.max_attempts,
        remaining: pending.len(),
    })
}

/// Exponential backoff with a small random offset so concurrent chunks
/// spread their retries
fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    let exponent = (attempt - 1).min(16);
    let exponential = initial.saturating_mul(1u32 << exponent);
    let jitter_ms = rand::thread_rng().gen_range(0..=25);
    exponential + Duration::from_millis(jitter_ms)
}
