/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableDescription;
use aws_smithy_runtime_api::box_error::BoxError;

use crate::types::{Item, Key};

mod dynamodb;
mod memory;

pub use self::dynamodb::DynamoDbStore;
pub use self::memory::MemoryStore;

/// One page of table names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableNamesPage {
    /// Table names on this page.
    pub table_names: Vec<String>,
    /// Name to continue listing after; `None` when there are no more tables.
    pub last_evaluated_table_name: Option<String>,
}

/// One page of raw scan results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    /// Items on this page.
    pub items: Vec<Item>,
    /// Key to continue scanning after; `None` at the end of the table.
    pub last_evaluated_key: Option<Key>,
}

/// Data-plane and control-plane calls of the key-value store.
///
/// Implementations translate their own failures into a [`BoxError`]; callers attach the operation
/// and table. A missing table is reported by `describe_table` as `Ok(None)`, a missing item by
/// `get_item` as `Ok(None)`, and deleting a missing item is not a failure.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    /// `ListTables`, starting after `exclusive_start_table_name`.
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, BoxError>;

    /// `DescribeTable`.
    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, BoxError>;

    /// `Scan` of at most `limit` items, starting after `exclusive_start_key`.
    async fn scan(
        &self,
        table: &str,
        limit: Option<i32>,
        exclusive_start_key: Option<Key>,
    ) -> Result<ScanResult, BoxError>;

    /// Strongly consistent `GetItem`.
    async fn get_item(&self, table: &str, key: Key) -> Result<Option<Item>, BoxError>;

    /// `PutItem`, replacing any item with the same key.
    async fn put_item(&self, table: &str, item: Item) -> Result<(), BoxError>;

    /// `DeleteItem`.
    async fn delete_item(&self, table: &str, key: Key) -> Result<(), BoxError>;
}
