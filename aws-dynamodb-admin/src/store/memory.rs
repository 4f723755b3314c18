/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use aws_sdk_dynamodb::primitives::DateTime;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, BillingModeSummary, KeySchemaElement,
    KeyType as KeySchemaRole, TableDescription, TableStatus,
};
use aws_smithy_runtime_api::box_error::BoxError;

use super::{ScanResult, Store, TableNamesPage};
use crate::codec;
use crate::types::{Item, Key, KeySchema, KeyToken};

/// Page size of `list_tables`, the same as DynamoDB's.
const LIST_TABLES_PAGE_SIZE: usize = 100;

/// In-process [`Store`].
///
/// Tables are ordered maps from a canonical key token to item, so scans visit items in that order
/// and keys like `7`, `7.0` and `70e-1` address the same item. Like DynamoDB, a scan that fills
/// its `limit` returns a cursor even when no items remain.
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<BTreeMap<String, MemoryTable>>>,
    unavailable: Arc<AtomicBool>,
}

#[derive(Debug)]
struct MemoryTable {
    schema: KeySchema,
    created: DateTime,
    items: BTreeMap<KeyToken, Item>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table. Fails if a table with this name exists.
    pub fn create_table(&self, name: impl Into<String>, schema: KeySchema) -> Result<(), BoxError> {
        let name = name.into();
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if tables.contains_key(&name) {
            return Err(format!("ResourceInUseException: table `{name}` already exists").into());
        }
        tables.insert(
            name,
            MemoryTable {
                schema,
                created: DateTime::from(SystemTime::now()),
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Drops a table and its items. Dropping a missing table does nothing.
    pub fn delete_table(&self, name: &str) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// While set, every call fails as if the store could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), BoxError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err("connection refused".into())
        } else {
            Ok(())
        }
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&MemoryTable) -> Result<T, BoxError>,
    ) -> Result<T, BoxError> {
        self.check_available()?;
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let table = tables.get(table).ok_or_else(|| not_found(table))?;
        f(table)
    }

    fn with_table_mut<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut MemoryTable) -> Result<T, BoxError>,
    ) -> Result<T, BoxError> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let table = tables.get_mut(table).ok_or_else(|| not_found(table))?;
        f(table)
    }
}

fn not_found(table: &str) -> BoxError {
    format!("ResourceNotFoundException: table `{table}` not found").into()
}

/// One text per numeric value: `{-}{digits}e{exponent}`, with the digits stripped of leading and
/// trailing zeros, and `0` for zero of either sign. `literal` must already be decimal text.
fn canonical_number(literal: &str) -> Result<String, BoxError> {
    let (negative, unsigned) = match literal.strip_prefix('-') {
        Some(unsigned) => (true, unsigned),
        None => (false, literal),
    };
    let (mantissa, exponent) = match unsigned.split_once(|c: char| c == 'e' || c == 'E') {
        Some((mantissa, exponent)) => (mantissa, exponent),
        None => (unsigned, "0"),
    };
    let out_of_range = || format!("ValidationException: number `{literal}` is out of range");
    let (integral, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{integral}{fraction}");
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok("0".to_owned());
    }
    let significant = digits.trim_end_matches('0');
    let shift = (digits.len() - significant.len()) as i64 - fraction.len() as i64;
    let exponent = exponent
        .trim_start_matches('+')
        .parse::<i64>()
        .ok()
        .and_then(|exponent| exponent.checked_add(shift))
        .ok_or_else(out_of_range)?;

    let sign = if negative { "-" } else { "" };
    Ok(format!("{sign}{significant}e{exponent}"))
}

impl MemoryTable {
    // Keys must name exactly the key attributes, as DynamoDB requires.
    fn storage_key(&self, key: &Key) -> Result<KeyToken, BoxError> {
        if key.len() != self.schema.attributes().count() {
            return Err("ValidationException: the key does not match the key schema".into());
        }
        self.item_storage_key(key)
    }

    // Numerically equal key values address the same item.
    fn item_storage_key(&self, item: &Item) -> Result<KeyToken, BoxError> {
        let mut key = self.schema.project(item)?;
        for value in key.values_mut() {
            if let AttributeValue::N(n) = value {
                *n = canonical_number(n)?;
            }
        }
        Ok(codec::encode(&key, &self.schema)?)
    }

    fn describe(&self, name: &str) -> Result<TableDescription, BoxError> {
        let mut description = TableDescription::builder()
            .table_name(name)
            .table_arn(format!("arn:aws:dynamodb:local:000000000000:table/{name}"))
            .table_status(TableStatus::Active)
            .creation_date_time(self.created)
            .item_count(self.items.len() as i64)
            .billing_mode_summary(
                BillingModeSummary::builder()
                    .billing_mode(BillingMode::PayPerRequest)
                    .build(),
            );
        for (attribute, role) in self
            .schema
            .attributes()
            .zip([KeySchemaRole::Hash, KeySchemaRole::Range])
        {
            description = description
                .key_schema(
                    KeySchemaElement::builder()
                        .attribute_name(attribute.name())
                        .key_type(role)
                        .build()?,
                )
                .attribute_definitions(
                    AttributeDefinition::builder()
                        .attribute_name(attribute.name())
                        .attribute_type(attribute.key_type().to_scalar())
                        .build()?,
                );
        }
        Ok(description.build())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_tables(
        &self,
        exclusive_start_table_name: Option<String>,
    ) -> Result<TableNamesPage, BoxError> {
        self.check_available()?;
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let start = match &exclusive_start_table_name {
            Some(name) => Bound::Excluded(name.as_str()),
            None => Bound::Unbounded,
        };
        let mut names = tables
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(name, _)| name.clone());
        let table_names = names
            .by_ref()
            .take(LIST_TABLES_PAGE_SIZE)
            .collect::<Vec<_>>();
        let last_evaluated_table_name = match names.next() {
            Some(_) => table_names.last().cloned(),
            None => None,
        };
        Ok(TableNamesPage {
            table_names,
            last_evaluated_table_name,
        })
    }

    async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, BoxError> {
        self.check_available()?;
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .get(table)
            .map(|memory_table| memory_table.describe(table))
            .transpose()
    }

    async fn scan(
        &self,
        table: &str,
        limit: Option<i32>,
        exclusive_start_key: Option<Key>,
    ) -> Result<ScanResult, BoxError> {
        self.with_table(table, |table| {
            let start = match exclusive_start_key {
                Some(key) => Bound::Excluded(table.storage_key(&key)?),
                None => Bound::Unbounded,
            };
            let limit = match limit {
                Some(limit) if limit < 1 => {
                    return Err("ValidationException: limit must be at least 1".into())
                }
                Some(limit) => limit as usize,
                None => usize::MAX,
            };
            let items = table
                .items
                .range((start, Bound::Unbounded))
                .take(limit)
                .map(|(_, item)| item.clone())
                .collect::<Vec<_>>();
            let last_evaluated_key = if items.len() == limit {
                items
                    .last()
                    .map(|item| table.schema.project(item))
                    .transpose()?
            } else {
                None
            };
            Ok(ScanResult {
                items,
                last_evaluated_key,
            })
        })
    }

    async fn get_item(&self, table: &str, key: Key) -> Result<Option<Item>, BoxError> {
        self.with_table(table, |table| {
            let token = table.storage_key(&key)?;
            Ok(table.items.get(&token).cloned())
        })
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<(), BoxError> {
        self.with_table_mut(table, |table| {
            let token = table.item_storage_key(&item)?;
            table.items.insert(token, item);
            Ok(())
        })
    }

    async fn delete_item(&self, table: &str, key: Key) -> Result<(), BoxError> {
        self.with_table_mut(table, |table| {
            let token = table.storage_key(&key)?;
            table.items.remove(&token);
            Ok(())
        })
    }
}
