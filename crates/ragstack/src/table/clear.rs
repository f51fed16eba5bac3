//! Table clearing operations (Imperative Shell).

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, WriteRequest};
use aws_sdk_dynamodb::Client;

use super::error::{Result, TableError};

/// Engine limit on items per batch write call.
const MAX_BATCH_WRITE_ITEMS: usize = 25;

const MAX_BATCH_RETRIES: usize = 5;

fn sdk_error(err: impl std::error::Error) -> TableError {
    TableError::AwsSdk(format!("{}", DisplayErrorContext(err)))
}

/// Collects every partition key value in the table, page by page.
pub async fn collect_keys(
    client: &Client,
    table_name: &str,
    key_attribute: &str,
) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut exclusive_start_key = None;

    loop {
        let response = client
            .scan()
            .table_name(table_name)
            .projection_expression(key_attribute)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(sdk_error)?;

        for item in response.items() {
            if let Some(AttributeValue::S(value)) = item.get(key_attribute) {
                keys.push(value.clone());
            }
        }

        match response.last_evaluated_key() {
            Some(last_key) if !last_key.is_empty() => {
                exclusive_start_key = Some(last_key.clone());
            }
            _ => break,
        }
    }

    tracing::debug!(table_name, count = keys.len(), "collected table keys");

    Ok(keys)
}

/// Deletes the given keys in batches, retrying whatever the engine
/// leaves unprocessed.
pub async fn delete_keys(
    client: &Client,
    table_name: &str,
    key_attribute: &str,
    keys: &[String],
) -> Result<usize> {
    let mut deleted = 0;

    for batch in plan_batches(key_attribute, keys)? {
        let batch_size = batch.len();
        let mut pending = batch;

        for _ in 0..MAX_BATCH_RETRIES {
            if pending.is_empty() {
                break;
            }
            let response = client
                .batch_write_item()
                .request_items(table_name, std::mem::take(&mut pending))
                .send()
                .await
                .map_err(sdk_error)?;

            pending = remaining_requests(response.unprocessed_items(), table_name);
            if !pending.is_empty() {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        check_drained(&pending)?;
        deleted += batch_size;
    }

    Ok(deleted)
}

/// Splits keys into engine-sized batches of delete requests.
fn plan_batches(key_attribute: &str, keys: &[String]) -> Result<Vec<Vec<WriteRequest>>> {
    keys.chunks(MAX_BATCH_WRITE_ITEMS)
        .map(|chunk| build_delete_requests(key_attribute, chunk))
        .collect()
}

/// Requests the engine sent back unprocessed, kept for the next attempt.
fn remaining_requests(
    unprocessed: Option<&HashMap<String, Vec<WriteRequest>>>,
    table_name: &str,
) -> Vec<WriteRequest> {
    unprocessed
        .and_then(|items| items.get(table_name))
        .cloned()
        .unwrap_or_default()
}

fn check_drained(pending: &[WriteRequest]) -> Result<()> {
    if pending.is_empty() {
        Ok(())
    } else {
        Err(TableError::UnprocessedKeys {
            count: pending.len(),
        })
    }
}

fn build_delete_requests(key_attribute: &str, keys: &[String]) -> Result<Vec<WriteRequest>> {
    keys.iter()
        .map(|key| {
            let delete = DeleteRequest::builder()
                .key(key_attribute, AttributeValue::S(key.clone()))
                .build()
                .map_err(sdk_error)?;
            Ok(WriteRequest::builder().delete_request(delete).build())
        })
        .collect()
}
