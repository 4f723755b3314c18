/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */

//! Item access layer for a DynamoDB administration console.
//!
//! The console lists tables, shows their metadata, pages through their items and lets an
//! operator view, edit and delete single items. This crate is the part of the console that
//! has to be right:
//!
//! - [`SchemaResolver`] derives (and caches) a table's primary-key schema from `DescribeTable`.
//! - [`codec`] turns an item's primary key into a [`KeyToken`] that can be used as a URL path
//!   segment, and turns that token back into a typed key.
//! - [`ItemProxy`] runs `Scan`, `GetItem`, `PutItem` and `DeleteItem` in terms of tokens.
//! - [`Client`] bundles the above behind the operations a rendering layer needs.
//!
//! # Example
//!
//! ```no_run
//! use aws_dynamodb_admin::{AdminConfig, Client};
//!
//! # async fn example() -> Result<(), aws_dynamodb_admin::Error> {
//! let config = AdminConfig::from_env();
//! let client = Client::from_config(&config).await;
//!
//! let page = client.scan_page("movies", config.page_size(), None).await?;
//! for keyed in page.items() {
//!     // The token is opaque; hand it back verbatim to `get_item` / `delete_item`.
//!     let item = client.get_item("movies", keyed.token()).await?;
//!     println!("{}: {:?}", keyed.token(), item);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

/// Key token encoding and decoding
pub mod codec;

/// Console facade over the resolver and the item proxy
pub mod client;

/// Store connection configuration
pub mod config;

pub mod document;

/// Error types emitted by `aws-dynamodb-admin`
pub mod error;

/// Scan, get, put and delete in terms of key tokens
pub mod proxy;

/// Key schema resolution and caching
pub mod schema;

/// The key-value store seam
pub mod store;

/// Key schema, token, cursor and item types
pub mod types;

pub use client::Client;
pub use config::AdminConfig;
pub use error::Error;
pub use proxy::ItemProxy;
pub use schema::{SchemaResolver, TableMetadata};
pub use types::{
    Item, Key, KeyAttribute, KeySchema, KeyToken, KeyType, KeyedItem, ScanCursor, ScanPage,
};

/// Re-export of the attribute value type items are made of.
pub use aws_sdk_dynamodb::types::AttributeValue;
