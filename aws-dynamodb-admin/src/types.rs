/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::fmt;

use aws_sdk_dynamodb::types::{AttributeValue, ScalarAttributeType};

use crate::codec;
use crate::error::{self, Error};

/// A stored item: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

/// A primary key: only the key attributes of an item.
pub type Key = HashMap<String, AttributeValue>;

/// The scalar types a primary-key attribute can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// `S`
    String,
    /// `N`, carried as decimal text
    Number,
    /// `B`
    Binary,
}

impl KeyType {
    /// The store's type descriptor for this type (`S`, `N` or `B`).
    pub fn tag(&self) -> &'static str {
        match self {
            KeyType::String => "S",
            KeyType::Number => "N",
            KeyType::Binary => "B",
        }
    }

    pub(crate) fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "S" => Some(KeyType::String),
            "N" => Some(KeyType::Number),
            "B" => Some(KeyType::Binary),
            _ => None,
        }
    }

    pub(crate) fn from_scalar(scalar: &ScalarAttributeType) -> Option<Self> {
        match scalar {
            ScalarAttributeType::S => Some(KeyType::String),
            ScalarAttributeType::N => Some(KeyType::Number),
            ScalarAttributeType::B => Some(KeyType::Binary),
            _ => None,
        }
    }

    /// The scalar attribute type used when declaring a table with this key type.
    pub fn to_scalar(&self) -> ScalarAttributeType {
        match self {
            KeyType::String => ScalarAttributeType::S,
            KeyType::Number => ScalarAttributeType::N,
            KeyType::Binary => ScalarAttributeType::B,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyType::String => "String",
            KeyType::Number => "Number",
            KeyType::Binary => "Binary",
        };
        f.write_str(name)
    }
}

// Short type descriptor of any attribute value, for error messages.
pub(crate) fn type_name(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        AttributeValue::M(_) => "M",
        AttributeValue::L(_) => "L",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::Bool(_) => "BOOL",
        _ => "Unknown",
    }
}

/// A named, typed primary-key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyAttribute {
    name: String,
    key_type: KeyType,
}

impl KeyAttribute {
    /// Creates a key attribute.
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
        }
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }
}

/// A table's primary-key schema: a partition key and an optional sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeySchema {
    partition_key: KeyAttribute,
    sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Schema of a table keyed by its partition key only.
    pub fn partition_only(partition_key: KeyAttribute) -> Self {
        Self {
            partition_key,
            sort_key: None,
        }
    }

    /// Schema of a table with a composite (partition + sort) key.
    pub fn composite(partition_key: KeyAttribute, sort_key: KeyAttribute) -> Self {
        Self {
            partition_key,
            sort_key: Some(sort_key),
        }
    }

    /// The partition key attribute.
    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    /// The sort key attribute, if the table has one.
    pub fn sort_key(&self) -> Option<&KeyAttribute> {
        self.sort_key.as_ref()
    }

    /// Key attributes in token order: partition key first.
    pub fn attributes(&self) -> impl Iterator<Item = &KeyAttribute> {
        std::iter::once(&self.partition_key).chain(self.sort_key.as_ref())
    }

    /// Projects `item` onto the key attributes, checking that each is present and correctly typed.
    pub fn project(&self, item: &Item) -> Result<Key, Error> {
        self.attributes()
            .map(|attribute| {
                let value = item.get(attribute.name()).ok_or_else(|| {
                    error::key_schema_violation(attribute.name(), "missing from item")
                })?;
                check_key_value(attribute, value)?;
                Ok((attribute.name().to_owned(), value.clone()))
            })
            .collect()
    }
}

fn check_key_value(attribute: &KeyAttribute, value: &AttributeValue) -> Result<(), Error> {
    let matches = match (attribute.key_type(), value) {
        (KeyType::String, AttributeValue::S(_)) => true,
        (KeyType::Number, AttributeValue::N(n)) => {
            if !codec::is_decimal(n) {
                return Err(error::key_schema_violation(
                    attribute.name(),
                    format!("`{n}` is not a decimal number"),
                ));
            }
            true
        }
        (KeyType::Binary, AttributeValue::B(_)) => true,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        Err(error::key_schema_violation(
            attribute.name(),
            format!(
                "expected {}, found {}",
                attribute.key_type().tag(),
                type_name(value)
            ),
        ))
    }
}

/// Opaque, URL-path-safe encoding of a primary key.
///
/// Tokens are produced by [`codec::encode`] and only mean something together with the key schema
/// of the table they came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyToken(String);

impl KeyToken {
    /// Wraps a token received from a caller, e.g. a path segment.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the token, returning its text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for KeyToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for KeyToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// An item together with the token of its primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedItem {
    token: KeyToken,
    item: Item,
}

impl KeyedItem {
    pub(crate) fn new(schema: &KeySchema, item: Item) -> Result<Self, Error> {
        let token = codec::encode(&item, schema)?;
        Ok(Self { token, item })
    }

    /// Token of the item's primary key.
    pub fn token(&self) -> &KeyToken {
        &self.token
    }

    /// The item.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Consumes self, returning the token and the item.
    pub fn into_parts(self) -> (KeyToken, Item) {
        (self.token, self.item)
    }
}

/// Continuation point of a scan: the store's `LastEvaluatedKey`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanCursor(Key);

impl ScanCursor {
    pub(crate) fn new(key: Key) -> Self {
        Self(key)
    }

    /// The key the next page starts after.
    pub fn as_key(&self) -> &Key {
        &self.0
    }

    /// Consumes the cursor, returning the key.
    pub fn into_key(self) -> Key {
        self.0
    }

    /// Encodes the cursor with the key codec, e.g. to carry it in a query string.
    ///
    /// Only cursors of base-table scans are primary keys of `schema`.
    pub fn to_token(&self, schema: &KeySchema) -> Result<KeyToken, Error> {
        codec::encode(&self.0, schema)
    }

    /// Decodes a cursor previously produced by [`ScanCursor::to_token`].
    pub fn from_token(token: &KeyToken, schema: &KeySchema) -> Result<Self, Error> {
        codec::decode(token, schema).map(Self)
    }
}

/// One page of a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
    pub(crate) items: Vec<KeyedItem>,
    pub(crate) next_cursor: Option<ScanCursor>,
}

impl ScanPage {
    /// Items on this page, each with its key token.
    pub fn items(&self) -> &[KeyedItem] {
        &self.items
    }

    /// Where the next page starts; `None` at the end of the table.
    pub fn next_cursor(&self) -> Option<&ScanCursor> {
        self.next_cursor.as_ref()
    }

    /// Consumes the page, returning items and cursor.
    pub fn into_parts(self) -> (Vec<KeyedItem>, Option<ScanCursor>) {
        (self.items, self.next_cursor)
    }
}
