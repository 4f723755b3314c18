/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Items as plain JSON documents, the way an editor shows them.
//!
//! | Attribute value | JSON |
//! |---|---|
//! | `S` | string |
//! | `N` | number, with its decimal text kept exactly |
//! | `Bool`, `Null` | boolean, `null` |
//! | `L`, `M` | array, object |
//! | `B` | base64 string |
//! | `SS`, `NS`, `BS` | array of strings, numbers, base64 strings |
//!
//! Going back, JSON never produces `B` or sets: a string is always `S` and an array always `L`.
//! [`item_from_json_with_keys`] restores the declared types of key attributes, which is enough to
//! edit items of tables keyed by binary values.

use std::str::FromStr;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Number, Value};

use crate::codec;
use crate::error::{self, Error};
use crate::types::{Item, KeySchema, KeyType};

/// Renders an item as a JSON object.
pub fn item_to_json(item: &Item) -> Value {
    Value::Object(
        item.iter()
            .map(|(name, value)| (name.clone(), attribute_to_json(value)))
            .collect(),
    )
}

/// Parses a JSON object into an item.
///
/// The conversion is lossy for values [`item_to_json`] rendered as strings or arrays: `B` comes
/// back as `S`, sets come back as `L`, and numbers JSON cannot spell, like `.5`, come back as
/// `S`. Use [`item_from_json_with_keys`] when the document carries a key.
pub fn item_from_json(document: Value) -> Result<Item, Error> {
    match document {
        Value::Object(fields) => fields
            .into_iter()
            .map(|(name, value)| attribute_from_json(value).map(|value| (name, value)))
            .collect(),
        other => Err(error::invalid_document(format!(
            "expected an object, found {}",
            json_type(&other)
        ))),
    }
}

/// Parses a JSON object into an item, giving key attributes the types `schema` declares.
///
/// A string under a `B` key is decoded from standard base64, and a string under an `N` key that
/// spells a decimal number becomes `N`. Other attributes convert as in [`item_from_json`].
pub fn item_from_json_with_keys(document: Value, schema: &KeySchema) -> Result<Item, Error> {
    let mut item = item_from_json(document)?;
    for attribute in schema.attributes() {
        let Some(AttributeValue::S(text)) = item.get(attribute.name()) else {
            continue;
        };
        let value = match attribute.key_type() {
            KeyType::String => continue,
            KeyType::Number if codec::is_decimal(text) => AttributeValue::N(text.clone()),
            KeyType::Number => continue,
            KeyType::Binary => {
                let bytes = STANDARD.decode(text).map_err(|err| {
                    error::invalid_document(format!(
                        "key `{}` is not base64: {err}",
                        attribute.name()
                    ))
                })?;
                AttributeValue::B(Blob::new(bytes))
            }
        };
        item.insert(attribute.name().to_owned(), value);
    }
    Ok(item)
}

/// Parses JSON text into an item. Lossy in the same way as [`item_from_json`].
pub fn item_from_str(document: &str) -> Result<Item, Error> {
    let document = serde_json::from_str(document)
        .map_err(|err| error::invalid_document(err.to_string()))?;
    item_from_json(document)
}

/// Renders one attribute value.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::L(values) => Value::Array(values.iter().map(attribute_to_json).collect()),
        AttributeValue::M(fields) => item_to_json(fields),
        AttributeValue::Ss(values) => values.iter().cloned().map(Value::String).collect(),
        AttributeValue::Ns(values) => values.iter().map(|n| number(n)).collect(),
        AttributeValue::Bs(values) => values
            .iter()
            .map(|blob| Value::String(STANDARD.encode(blob.as_ref())))
            .collect(),
        _ => Value::Null,
    }
}

/// Parses one attribute value.
pub fn attribute_from_json(value: Value) -> Result<AttributeValue, Error> {
    Ok(match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => AttributeValue::L(
            values
                .into_iter()
                .map(attribute_from_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(fields) => AttributeValue::M(item_from_json(Value::Object(fields))?),
    })
}

// Numbers outside what JSON can spell, like `.5`, fall back to strings.
fn number(n: &str) -> Value {
    Number::from_str(n)
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(n.to_owned()))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KeyAttribute;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn renders_every_attribute_kind() {
        let item = Item::from([
            ("s".to_owned(), AttributeValue::S("a,b".to_owned())),
            ("n".to_owned(), AttributeValue::N("2.5".to_owned())),
            ("bool".to_owned(), AttributeValue::Bool(false)),
            ("null".to_owned(), AttributeValue::Null(true)),
            ("b".to_owned(), AttributeValue::B(Blob::new(vec![0xff, 0x00]))),
            (
                "l".to_owned(),
                AttributeValue::L(vec![AttributeValue::N("1".to_owned())]),
            ),
            (
                "m".to_owned(),
                AttributeValue::M(Item::from([(
                    "inner".to_owned(),
                    AttributeValue::S("x".to_owned()),
                )])),
            ),
            (
                "ss".to_owned(),
                AttributeValue::Ss(vec!["x".to_owned(), "y".to_owned()]),
            ),
            ("ns".to_owned(), AttributeValue::Ns(vec!["2".to_owned()])),
        ]);

        assert_eq!(
            json!({
                "s": "a,b",
                "n": 2.5,
                "bool": false,
                "null": null,
                "b": "/wA=",
                "l": [1],
                "m": {"inner": "x"},
                "ss": ["x", "y"],
                "ns": [2],
            }),
            item_to_json(&item)
        );
    }

    #[test]
    fn numbers_keep_their_text() {
        let n = "123456789012345678901234567890.000000000000000000001";
        let item = item_from_str(&format!(r#"{{"n": {n}}}"#)).unwrap();
        assert_eq!(Some(&AttributeValue::N(n.to_owned())), item.get("n"));
        assert_eq!(n, item_to_json(&item)["n"].to_string());
    }

    #[test]
    fn parses_nested_documents() {
        let item = item_from_json(json!({
            "id": "a",
            "tags": ["x", {"deep": true}],
            "gone": null,
        }))
        .unwrap();
        assert_eq!(Some(&AttributeValue::S("a".to_owned())), item.get("id"));
        assert_eq!(Some(&AttributeValue::Null(true)), item.get("gone"));
        assert_eq!(
            Some(&AttributeValue::L(vec![
                AttributeValue::S("x".to_owned()),
                AttributeValue::M(Item::from([(
                    "deep".to_owned(),
                    AttributeValue::Bool(true)
                )])),
            ])),
            item.get("tags")
        );
    }

    #[test]
    fn rejects_non_objects() {
        for document in [json!([1]), json!("item"), json!(null)] {
            let err = item_from_json(document).unwrap_err();
            assert!(matches!(err, Error::InvalidDocument { .. }), "{err}");
        }
        assert!(matches!(
            item_from_str("{not json"),
            Err(Error::InvalidDocument { .. })
        ));
    }

    #[test]
    fn binary_keys_survive_an_edit() {
        let schema = KeySchema::composite(
            KeyAttribute::new("device", KeyType::Binary),
            KeyAttribute::new("at", KeyType::Number),
        );
        let item = Item::from([
            ("device".to_owned(), AttributeValue::B(Blob::new(vec![0xff, 0x00]))),
            ("at".to_owned(), AttributeValue::N(".5".to_owned())),
            ("note".to_owned(), AttributeValue::S("/wA=".to_owned())),
        ]);
        let document = item_to_json(&item);

        let lossy = item_from_json(document.clone()).unwrap();
        assert_eq!(Some(&AttributeValue::S("/wA=".to_owned())), lossy.get("device"));
        assert!(schema.project(&lossy).is_err());

        let edited = item_from_json_with_keys(document, &schema).unwrap();
        assert_eq!(item, edited);
        assert_eq!(schema.project(&item).unwrap(), schema.project(&edited).unwrap());
    }

    #[test]
    fn undecodable_binary_key_is_rejected() {
        let schema = KeySchema::partition_only(KeyAttribute::new("id", KeyType::Binary));
        let err = item_from_json_with_keys(json!({"id": "not base64!"}), &schema).unwrap_err();
        assert!(matches!(err, Error::InvalidDocument { .. }), "{err}");

        let wrong = item_from_json_with_keys(json!({"id": 7}), &schema).unwrap();
        assert!(schema.project(&wrong).is_err());
    }
}
