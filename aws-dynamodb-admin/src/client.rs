/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use futures_util::future::try_join_all;
use futures_util::stream::{self, Stream, TryStreamExt};

use crate::config::AdminConfig;
use crate::error::Error;
use crate::proxy::ItemProxy;
use crate::schema::{SchemaResolver, TableMetadata};
use crate::store::{DynamoDbStore, Store};
use crate::types::{Item, KeySchema, KeyToken, KeyedItem, ScanCursor, ScanPage};

/// Everything a console page needs, in one cheaply cloneable handle.
///
/// Clones share the schema cache.
#[derive(Debug, Clone)]
pub struct Client {
    resolver: SchemaResolver,
    proxy: ItemProxy,
}

impl Client {
    /// Creates a client over `store`.
    pub fn new(store: impl Store + 'static) -> Self {
        Self::from_store(Arc::new(store))
    }

    /// Creates a client over a shared `store`.
    pub fn from_store(store: Arc<dyn Store>) -> Self {
        let resolver = SchemaResolver::new(store.clone());
        Self {
            proxy: ItemProxy::new(store, resolver.clone()),
            resolver,
        }
    }

    /// Creates a client talking to DynamoDB as configured.
    pub async fn from_config(config: &AdminConfig) -> Self {
        let sdk_config = config.load_sdk_config().await;
        Self::new(DynamoDbStore::new(&sdk_config))
    }

    /// Names of all tables.
    pub async fn list_tables(&self) -> Result<Vec<String>, Error> {
        self.resolver.list_tables().await
    }

    /// Current metadata of `table`.
    pub async fn describe_table(&self, table: &str) -> Result<Arc<TableMetadata>, Error> {
        self.resolver.describe(table).await
    }

    /// Key schema of `table`.
    pub async fn key_schema(&self, table: &str) -> Result<KeySchema, Error> {
        self.resolver.key_schema(table).await
    }

    /// Metadata of every table, in listing order.
    ///
    /// Tables are described concurrently. A table dropped after it was listed fails the whole
    /// call with [`Error::TableNotFound`].
    pub async fn describe_all_tables(&self) -> Result<Vec<Arc<TableMetadata>>, Error> {
        let tables = self.list_tables().await?;
        try_join_all(tables.iter().map(|table| self.resolver.describe(table))).await
    }

    /// See [`ItemProxy::scan_page`].
    pub async fn scan_page(
        &self,
        table: &str,
        limit: u32,
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, Error> {
        self.proxy.scan_page(table, limit, cursor).await
    }

    /// Pages of a full scan of `table`, following cursors until the store returns none.
    ///
    /// The stream ends after the first error.
    pub fn scan_pages<'a>(
        &'a self,
        table: &'a str,
        limit: u32,
    ) -> impl Stream<Item = Result<ScanPage, Error>> + 'a {
        // `None` once the last page was returned.
        let start: Option<Option<ScanCursor>> = Some(None);
        stream::try_unfold(start, move |next| async move {
            let Some(cursor) = next else {
                return Ok(None);
            };
            let page = self.proxy.scan_page(table, limit, cursor).await?;
            let next = page.next_cursor().cloned().map(Some);
            Ok::<_, Error>(Some((page, next)))
        })
    }

    /// Every item of `table`, with its token.
    pub async fn scan_all(&self, table: &str) -> Result<Vec<KeyedItem>, Error> {
        self.scan_pages(table, 0)
            .map_ok(|page| stream::iter(page.into_parts().0.into_iter().map(Ok::<_, Error>)))
            .try_flatten()
            .try_collect()
            .await
    }

    /// See [`ItemProxy::get_item`].
    pub async fn get_item(&self, table: &str, token: &KeyToken) -> Result<Option<Item>, Error> {
        self.proxy.get_item(table, token).await
    }

    /// See [`ItemProxy::put_item`].
    pub async fn put_item(&self, table: &str, item: Item) -> Result<KeyedItem, Error> {
        self.proxy.put_item(table, item).await
    }

    /// See [`ItemProxy::delete_item`].
    pub async fn delete_item(&self, table: &str, token: &KeyToken) -> Result<(), Error> {
        self.proxy.delete_item(table, token).await
    }

    /// Forgets the cached key schema of `table`.
    pub fn invalidate(&self, table: &str) {
        self.resolver.invalidate(table)
    }
}
