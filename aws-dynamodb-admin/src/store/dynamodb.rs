/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableDescription;
use aws_smithy_runtime_api::box_error::BoxError;
use aws_types::SdkConfig;

use super::{ScanResult, Store, TableNamesPage};
use crate::types::{Item, Key};

/// [`Store`] backed by Amazon DynamoDB (or any endpoint speaking its protocol, such as DynamoDB
/// Local).
///
/// Errors are converted into [`aws_sdk_dynamodb::Error`] so that their message names the modeled
/// exception. Retries and timeouts are whatever the client was configured with.
#[derive(Debug, Clone)]
pub struct DynamoDbStore {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbStore {
    /// Creates a store with a new client for `sdk_config`.
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(sdk_config),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }
}

impl From<aws_sdk_dynamodb::Client> for DynamoDbStore {
    fn from(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Store for DynamoDbStore {
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, BoxError> {
        tracing::debug!(start = ?exclusive_start_table_name, "ListTables");
        let output = self
            .client
            .list_tables()
            .set_exclusive_start_table_name(exclusive_start_table_name)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(TableNamesPage {
            table_names: output.table_names.unwrap_or_default(),
            last_evaluated_table_name: output.last_evaluated_table_name,
        })
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, BoxError> {
        tracing::debug!(table, "DescribeTable");
        match self.client.describe_table().table_name(table).send().await {
            Ok(output) => Ok(output.table),
            Err(err)
                if err
                    .as_service_error()
                    .map(|e| e.is_resource_not_found_exception())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(err) => Err(aws_sdk_dynamodb::Error::from(err).into()),
        }
    }

    async fn scan(
        &self,
        table: &str,
        limit: Option<i32>,
        exclusive_start_key: Option<Key>,
    ) -> Result<ScanResult, BoxError> {
        tracing::debug!(table, ?limit, resume = exclusive_start_key.is_some(), "Scan");
        let output = self
            .client
            .scan()
            .table_name(table)
            .set_limit(limit)
            .set_exclusive_start_key(exclusive_start_key)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        tracing::trace!(
            table,
            count = output.count,
            scanned = output.scanned_count,
            "Scan page"
        );
        Ok(ScanResult {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn get_item(&self, table: &str, key: Key) -> Result<Option<Item>, BoxError> {
        tracing::debug!(table, "GetItem");
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(output.item)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), BoxError> {
        tracing::debug!(table, "PutItem");
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Key) -> Result<(), BoxError> {
        tracing::debug!(table, "DeleteItem");
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(aws_sdk_dynamodb::Error::from)?;
        Ok(())
    }
}
