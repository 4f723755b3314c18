/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::codec;
use crate::error::{self, Error};
use crate::schema::SchemaResolver;
use crate::store::Store;
use crate::types::{Item, KeyToken, KeyedItem, ScanCursor, ScanPage};

/// Item operations addressed by [`KeyToken`]s.
///
/// Each operation resolves the table's key schema first, then makes exactly one store call
/// (two for `put_item`). Store failures surface as [`Error::StoreUnavailable`] and are never
/// retried here.
#[derive(Debug, Clone)]
pub struct ItemProxy {
    store: Arc<dyn Store>,
    resolver: SchemaResolver,
}

impl ItemProxy {
    /// Creates a proxy over `store`, resolving schemas with `resolver`.
    pub fn new(store: Arc<dyn Store>, resolver: SchemaResolver) -> Self {
        Self { store, resolver }
    }

    /// Returns one store page of at most `limit` items, starting after `cursor`.
    ///
    /// A `limit` of zero asks for the store's own page size. The page is whatever the store
    /// returned; it may hold fewer than `limit` items and still carry a cursor.
    pub async fn scan_page(
        &self,
        table: &str,
        limit: u32,
        cursor: Option<ScanCursor>,
    ) -> Result<ScanPage, Error> {
        let schema = self.resolver.key_schema(table).await?;
        let limit = match limit {
            0 => None,
            limit => Some(i32::try_from(limit).unwrap_or(i32::MAX)),
        };
        let result = self
            .store
            .scan(table, limit, cursor.map(ScanCursor::into_key))
            .await
            .map_err(|source| error::store_unavailable("Scan", Some(table), source))?;
        let items = result
            .items
            .into_iter()
            .map(|item| KeyedItem::new(&schema, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ScanPage {
            items,
            next_cursor: result.last_evaluated_key.map(ScanCursor::new),
        })
    }

    /// Looks up the item at `token`. A missing item is `Ok(None)`.
    pub async fn get_item(&self, table: &str, token: &KeyToken) -> Result<Option<Item>, Error> {
        let schema = self.resolver.key_schema(table).await?;
        let key = codec::decode(token, &schema)?;
        self.store
            .get_item(table, key)
            .await
            .map_err(|source| error::store_unavailable("GetItem", Some(table), source))
    }

    /// Writes `item`, replacing any item with the same key, and returns it as stored.
    ///
    /// The item must carry every key attribute with its declared type; otherwise this fails with
    /// [`Error::KeySchemaViolation`] without calling the store. The stored item is read back with
    /// a consistent read. If that read finds nothing, the submitted item is returned.
    pub async fn put_item(&self, table: &str, item: Item) -> Result<KeyedItem, Error> {
        let schema = self.resolver.key_schema(table).await?;
        let key = schema.project(&item)?;
        let token = codec::encode(&key, &schema)?;

        self.store
            .put_item(table, item.clone())
            .await
            .map_err(|source| error::store_unavailable("PutItem", Some(table), source))?;
        let stored = self
            .store
            .get_item(table, key)
            .await
            .map_err(|source| error::store_unavailable("GetItem", Some(table), source))?;

        let stored = match stored {
            Some(stored) => stored,
            None => {
                tracing::warn!(table, %token, "item not found right after put; echoing it back");
                item
            }
        };
        KeyedItem::new(&schema, stored)
    }

    /// Deletes the item at `token`. Deleting a missing item succeeds.
    pub async fn delete_item(&self, table: &str, token: &KeyToken) -> Result<(), Error> {
        let schema = self.resolver.key_schema(table).await?;
        let key = codec::decode(token, &schema)?;
        self.store
            .delete_item(table, key)
            .await
            .map_err(|source| error::store_unavailable("DeleteItem", Some(table), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ScanResult, TableNamesPage};
    use crate::types::{Key, KeyAttribute, KeySchema, KeyType};
    use async_trait::async_trait;
    use aws_sdk_dynamodb::primitives::Blob;
    use aws_sdk_dynamodb::types::{AttributeValue, TableDescription};
    use aws_smithy_runtime_api::box_error::BoxError;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    // Acknowledges writes without storing them, like a read that lands before replication.
    #[derive(Debug)]
    struct LaggingStore(MemoryStore);

    #[async_trait]
    impl Store for LaggingStore {
        async fn list_tables(&self, start: Option<String>) -> Result<TableNamesPage, BoxError> {
            self.0.list_tables(start).await
        }

        async fn describe_table(&self, table: &str) -> Result<Option<TableDescription>, BoxError> {
            self.0.describe_table(table).await
        }

        async fn scan(
            &self,
            table: &str,
            limit: Option<i32>,
            start: Option<Key>,
        ) -> Result<ScanResult, BoxError> {
            self.0.scan(table, limit, start).await
        }

        async fn get_item(&self, table: &str, key: Key) -> Result<Option<Item>, BoxError> {
            self.0.get_item(table, key).await
        }

        async fn put_item(&self, _table: &str, _item: Item) -> Result<(), BoxError> {
            Ok(())
        }

        async fn delete_item(&self, table: &str, key: Key) -> Result<(), BoxError> {
            self.0.delete_item(table, key).await
        }
    }

    fn proxy_over(store: &MemoryStore) -> ItemProxy {
        let store: Arc<dyn Store> = Arc::new(store.clone());
        ItemProxy::new(store.clone(), SchemaResolver::new(store))
    }

    fn events_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_table(
                "events",
                KeySchema::composite(
                    KeyAttribute::new("device", KeyType::Binary),
                    KeyAttribute::new("at", KeyType::Number),
                ),
            )
            .unwrap();
        store
    }

    fn event(device: &[u8], at: &str) -> Item {
        Item::from([
            ("device".to_owned(), AttributeValue::B(Blob::new(device))),
            ("at".to_owned(), AttributeValue::N(at.to_owned())),
            ("level".to_owned(), AttributeValue::S("warn".to_owned())),
        ])
    }

    #[tokio::test]
    async fn put_then_get_by_token() {
        let store = events_store();
        let proxy = proxy_over(&store);

        let put = proxy.put_item("events", event(b"\xff\x00", "17")).await.unwrap();
        assert_eq!(&event(b"\xff\x00", "17"), put.item());

        let fetched = proxy.get_item("events", put.token()).await.unwrap();
        assert_eq!(Some(event(b"\xff\x00", "17")), fetched);
    }

    #[tokio::test]
    #[traced_test]
    async fn put_echoes_the_item_when_the_read_back_misses() {
        let store: Arc<dyn Store> = Arc::new(LaggingStore(events_store()));
        let proxy = ItemProxy::new(store.clone(), SchemaResolver::new(store));

        let put = proxy.put_item("events", event(b"d", "5")).await.unwrap();
        assert_eq!("B:ZA,N:5", put.token().as_str());
        assert_eq!(&event(b"d", "5"), put.item());
        assert!(logs_contain("item not found right after put"));
    }

    #[tokio::test]
    async fn missing_item_is_none() {
        let proxy = proxy_over(&events_store());
        let token = KeyToken::from("B:AQ,N:1");
        assert_eq!(None, proxy.get_item("events", &token).await.unwrap());
    }

    #[tokio::test]
    async fn key_violation_fails_before_the_store_is_called() {
        let store = events_store();
        let proxy = proxy_over(&store);
        // Resolve the schema while the store is reachable.
        proxy.scan_page("events", 0, None).await.unwrap();
        store.set_unavailable(true);

        let mut item = event(b"d", "1");
        item.insert("at".to_owned(), AttributeValue::S("noon".to_owned()));
        let err = proxy.put_item("events", item).await.unwrap_err();
        assert!(
            matches!(err, Error::KeySchemaViolation { ref attribute, .. } if attribute == "at"),
            "{err}"
        );

        item = event(b"d", "1");
        item.remove("device");
        let err = proxy.put_item("events", item).await.unwrap_err();
        assert!(matches!(err, Error::KeySchemaViolation { .. }), "{err}");
    }

    #[tokio::test]
    async fn bad_tokens_fail_without_a_lookup() {
        let proxy = proxy_over(&events_store());

        let err = proxy
            .get_item("events", &KeyToken::from("B:AQ"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedToken { .. }), "{err}");

        let err = proxy
            .delete_item("events", &KeyToken::from("B:AQ,N:ten"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{err}");
    }

    #[tokio::test]
    async fn store_failures_are_wrapped() {
        let store = events_store();
        let proxy = proxy_over(&store);
        let put = proxy.put_item("events", event(b"d", "1")).await.unwrap();
        store.set_unavailable(true);

        let err = proxy.get_item("events", put.token()).await.unwrap_err();
        assert!(
            matches!(err, Error::StoreUnavailable { operation: "GetItem", .. }),
            "{err}"
        );
        let err = proxy.scan_page("events", 10, None).await.unwrap_err();
        assert!(
            matches!(err, Error::StoreUnavailable { operation: "Scan", .. }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn scan_page_annotates_items_with_tokens() {
        let store = events_store();
        let proxy = proxy_over(&store);
        for at in ["1", "2", "3"] {
            proxy.put_item("events", event(b"d", at)).await.unwrap();
        }

        let page = proxy.scan_page("events", 2, None).await.unwrap();
        let tokens = page
            .items()
            .iter()
            .map(|keyed| keyed.token().as_str())
            .collect::<Vec<_>>();
        assert_eq!(vec!["B:ZA,N:1", "B:ZA,N:2"], tokens);
        assert!(page.next_cursor().is_some());

        let rest = proxy
            .scan_page("events", 2, page.next_cursor().cloned())
            .await
            .unwrap();
        assert_eq!(1, rest.items().len());
        assert_eq!(None, rest.next_cursor());
    }

    #[tokio::test]
    async fn unknown_table() {
        let proxy = proxy_over(&events_store());
        let err = proxy.scan_page("nope", 1, None).await.unwrap_err();
        assert!(matches!(err, Error::TableNotFound { .. }), "{err}");
    }
}
