/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use aws_sdk_dynamodb::primitives::DateTime;
use aws_sdk_dynamodb::types::{KeyType as KeySchemaRole, TableDescription};

use crate::error::{self, Error};
use crate::store::Store;
use crate::types::{KeyAttribute, KeySchema, KeyType};

/// What the console shows about a table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    name: String,
    key_schema: KeySchema,
    status: Option<String>,
    arn: Option<String>,
    created: Option<DateTime>,
    item_count: Option<i64>,
    size_bytes: Option<i64>,
    billing_mode: Option<String>,
    read_capacity_units: Option<i64>,
    write_capacity_units: Option<i64>,
    global_secondary_indexes: Vec<String>,
    local_secondary_indexes: Vec<String>,
}

impl TableMetadata {
    /// Derives metadata, including the key schema, from a `DescribeTable` response.
    pub fn from_description(table: &str, description: &TableDescription) -> Result<Self, Error> {
        let throughput = description.provisioned_throughput();
        Ok(Self {
            name: description.table_name().unwrap_or(table).to_owned(),
            key_schema: derive_key_schema(table, description)?,
            status: description.table_status().map(|s| s.as_str().to_owned()),
            arn: description.table_arn().map(str::to_owned),
            created: description.creation_date_time().copied(),
            item_count: description.item_count(),
            size_bytes: description.table_size_bytes(),
            billing_mode: description
                .billing_mode_summary()
                .and_then(|summary| summary.billing_mode())
                .map(|mode| mode.as_str().to_owned()),
            read_capacity_units: throughput.and_then(|t| t.read_capacity_units()),
            write_capacity_units: throughput.and_then(|t| t.write_capacity_units()),
            global_secondary_indexes: description
                .global_secondary_indexes()
                .iter()
                .filter_map(|index| index.index_name().map(str::to_owned))
                .collect(),
            local_secondary_indexes: description
                .local_secondary_indexes()
                .iter()
                .filter_map(|index| index.index_name().map(str::to_owned))
                .collect(),
        })
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary-key schema.
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Table status, e.g. `ACTIVE`.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Table ARN.
    pub fn arn(&self) -> Option<&str> {
        self.arn.as_deref()
    }

    /// When the table was created.
    pub fn created(&self) -> Option<&DateTime> {
        self.created.as_ref()
    }

    /// Approximate number of items; the store refreshes it periodically.
    pub fn item_count(&self) -> Option<i64> {
        self.item_count
    }

    /// Approximate table size in bytes; the store refreshes it periodically.
    pub fn size_bytes(&self) -> Option<i64> {
        self.size_bytes
    }

    /// Billing mode, e.g. `PAY_PER_REQUEST`.
    pub fn billing_mode(&self) -> Option<&str> {
        self.billing_mode.as_deref()
    }

    /// Provisioned read capacity units.
    pub fn read_capacity_units(&self) -> Option<i64> {
        self.read_capacity_units
    }

    /// Provisioned write capacity units.
    pub fn write_capacity_units(&self) -> Option<i64> {
        self.write_capacity_units
    }

    /// Names of the global secondary indexes.
    pub fn global_secondary_indexes(&self) -> &[String] {
        &self.global_secondary_indexes
    }

    /// Names of the local secondary indexes.
    pub fn local_secondary_indexes(&self) -> &[String] {
        &self.local_secondary_indexes
    }
}

fn derive_key_schema(table: &str, description: &TableDescription) -> Result<KeySchema, Error> {
    let invalid = |reason: String| {
        error::store_unavailable("DescribeTable", Some(table), format!("{reason} in description"))
    };
    let key_attribute = |role: KeySchemaRole| -> Result<Option<KeyAttribute>, Error> {
        let Some(element) = description
            .key_schema()
            .iter()
            .find(|element| *element.key_type() == role)
        else {
            return Ok(None);
        };
        let name = element.attribute_name();
        let definition = description
            .attribute_definitions()
            .iter()
            .find(|definition| definition.attribute_name() == name)
            .ok_or_else(|| invalid(format!("no attribute definition for key `{name}`")))?;
        let key_type = KeyType::from_scalar(definition.attribute_type()).ok_or_else(|| {
            invalid(format!(
                "unsupported type `{}` for key `{name}`",
                definition.attribute_type().as_str()
            ))
        })?;
        Ok(Some(KeyAttribute::new(name, key_type)))
    };

    let partition_key =
        key_attribute(KeySchemaRole::Hash)?.ok_or_else(|| invalid("no HASH key".to_owned()))?;
    Ok(match key_attribute(KeySchemaRole::Range)? {
        Some(sort_key) => KeySchema::composite(partition_key, sort_key),
        None => KeySchema::partition_only(partition_key),
    })
}

/// Resolves table metadata and key schemas, caching them per table name.
///
/// Key schemas cannot change while a table exists, so cached entries are only replaced by
/// [`SchemaResolver::describe`] or dropped by [`SchemaResolver::invalidate`]. Concurrent misses
/// for the same table may both fetch; the last one to finish wins.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    store: Arc<dyn Store>,
    cache: Arc<RwLock<HashMap<String, Arc<TableMetadata>>>>,
}

impl SchemaResolver {
    /// Creates a resolver with an empty cache.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cache: Default::default(),
        }
    }

    /// Names of all tables, following `ListTables` pagination to the end.
    pub async fn list_tables(&self) -> Result<Vec<String>, Error> {
        let mut table_names = Vec::new();
        let mut start = None;
        loop {
            let page = self
                .store
                .list_tables(start)
                .await
                .map_err(|source| error::store_unavailable("ListTables", None, source))?;
            table_names.extend(page.table_names);
            match page.last_evaluated_table_name {
                Some(name) => start = Some(name),
                None => return Ok(table_names),
            }
        }
    }

    /// Fetches a table's metadata and refreshes its cache entry.
    pub async fn describe(&self, table: &str) -> Result<Arc<TableMetadata>, Error> {
        let description = self
            .store
            .describe_table(table)
            .await
            .map_err(|source| error::store_unavailable("DescribeTable", Some(table), source))?
            .ok_or_else(|| error::table_not_found(table))?;
        let metadata = Arc::new(TableMetadata::from_description(table, &description)?);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_owned(), metadata.clone());
        tracing::debug!(table, key_schema = ?metadata.key_schema(), "cached key schema");
        Ok(metadata)
    }

    /// The table's key schema, from the cache when possible.
    pub async fn key_schema(&self, table: &str) -> Result<KeySchema, Error> {
        if let Some(metadata) = self.cached(table) {
            tracing::trace!(table, "key schema cache hit");
            return Ok(metadata.key_schema().clone());
        }
        tracing::debug!(table, "key schema cache miss");
        Ok(self.describe(table).await?.key_schema().clone())
    }

    /// Drops the cache entry for `table`, e.g. after it was deleted and recreated.
    pub fn invalidate(&self, table: &str) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(table);
    }

    fn cached(&self, table: &str) -> Option<Arc<TableMetadata>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .cloned()
    }
}
