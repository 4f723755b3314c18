/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A key token is one segment per key attribute (partition key first), joined by `,`. Each
//! segment is `{tag}:{literal}`, where `tag` is the attribute's type descriptor:
//!
//! - `S`: the string, percent-encoded with [`STRING_SET`]
//! - `N`: the number's decimal text, verbatim
//! - `B`: the bytes, base64url without padding
//!
//! None of the three literal forms can contain a raw `,`, `:` or `/`, so a token splits on `,`
//! into its segments and on the first `:` into tag and literal, and it can be used as a URL path
//! segment as is.
//!
//! ```
//! use aws_dynamodb_admin::codec;
//! use aws_dynamodb_admin::{AttributeValue, Item, KeyAttribute, KeySchema, KeyType};
//!
//! let schema = KeySchema::partition_only(KeyAttribute::new("id", KeyType::String));
//! let item = Item::from([("id".to_string(), AttributeValue::S("a/b:c".into()))]);
//!
//! let token = codec::encode(&item, &schema).unwrap();
//! assert_eq!("S:a%2Fb%3Ac", token.as_str());
//! assert_eq!(item, codec::decode(&token, &schema).unwrap());
//! ```

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{self, Error};
use crate::types::{Item, Key, KeyAttribute, KeySchema, KeyToken, KeyType};

const SEGMENT_DELIMITER: &str = ",";
const TAG_SEPARATOR: char = ':';

/// Characters escaped in string segments.
///
/// Every RFC 3986 gen-delim and sub-delim is escaped, which covers the segment delimiter, the tag
/// separator and the path separator. Non-ASCII bytes are always escaped.
pub const STRING_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b':')
    .add(b',')
    .add(b'?')
    .add(b'#')
    .add(b'[')
    .add(b']')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'@')
    .add(b'!')
    .add(b'$')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b';')
    .add(b'=')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'"')
    .add(b'^')
    .add(b'`')
    .add(b'\\');

/// Encodes the primary key of `item` as a token.
///
/// Attributes outside the key schema are ignored. Fails with [`Error::KeySchemaViolation`] if a
/// key attribute is missing or has the wrong type.
pub fn encode(item: &Item, schema: &KeySchema) -> Result<KeyToken, Error> {
    let key = schema.project(item)?;
    let segments = schema
        .attributes()
        .map(|attribute| encode_segment(attribute, &key))
        .collect::<Vec<_>>();
    Ok(KeyToken::from(segments.join(SEGMENT_DELIMITER)))
}

// `key` has passed `KeySchema::project`, so every attribute is present with the right type.
fn encode_segment(attribute: &KeyAttribute, key: &Key) -> String {
    let literal = match key.get(attribute.name()) {
        Some(AttributeValue::S(s)) => utf8_percent_encode(s, STRING_SET).to_string(),
        Some(AttributeValue::N(n)) => n.clone(),
        Some(AttributeValue::B(b)) => URL_SAFE_NO_PAD.encode(b.as_ref()),
        _ => String::new(),
    };
    format!("{}{}{}", attribute.key_type().tag(), TAG_SEPARATOR, literal)
}

/// Decodes a token into the primary key it was encoded from.
///
/// Fails with [`Error::MalformedToken`] if the token does not have one well-formed segment per
/// key attribute, and with [`Error::TypeMismatch`] if a segment's type or literal does not fit
/// the attribute's declared type.
pub fn decode(token: &KeyToken, schema: &KeySchema) -> Result<Key, Error> {
    let raw = token.as_str();
    if raw.is_empty() {
        return Err(error::malformed_token(raw, "empty token"));
    }

    let segments = raw.split(SEGMENT_DELIMITER).collect::<Vec<_>>();
    let expected = schema.attributes().count();
    if segments.len() != expected {
        return Err(error::malformed_token(
            raw,
            format!(
                "expected {expected} segment(s) for this table, found {}",
                segments.len()
            ),
        ));
    }

    segments
        .into_iter()
        .zip(schema.attributes())
        .map(|(segment, attribute)| {
            let value = decode_segment(raw, segment, attribute)?;
            Ok((attribute.name().to_owned(), value))
        })
        .collect()
}

fn decode_segment(
    token: &str,
    segment: &str,
    attribute: &KeyAttribute,
) -> Result<AttributeValue, Error> {
    let (tag, literal) = segment.split_once(TAG_SEPARATOR).ok_or_else(|| {
        error::malformed_token(token, format!("segment `{segment}` has no type tag"))
    })?;
    let tagged = KeyType::from_tag(tag)
        .ok_or_else(|| error::malformed_token(token, format!("unknown type tag `{tag}`")))?;
    let mismatch = || error::type_mismatch(attribute.name(), attribute.key_type(), segment);
    if tagged != attribute.key_type() {
        return Err(mismatch());
    }

    match tagged {
        KeyType::String => {
            let decoded = percent_decode_str(literal)
                .decode_utf8()
                .map_err(|_| mismatch())?;
            // one token per key: anything we would not have produced is rejected
            if utf8_percent_encode(&decoded, STRING_SET).to_string() != literal {
                return Err(error::malformed_token(
                    token,
                    format!("segment `{segment}` is not canonically escaped"),
                ));
            }
            Ok(AttributeValue::S(decoded.into_owned()))
        }
        KeyType::Number if is_decimal(literal) => Ok(AttributeValue::N(literal.to_owned())),
        KeyType::Number => Err(mismatch()),
        KeyType::Binary => URL_SAFE_NO_PAD
            .decode(literal)
            .map(|bytes| AttributeValue::B(Blob::new(bytes)))
            .map_err(|_| mismatch()),
    }
}

/// Whether `literal` is decimal number text: `-?(digits[.digits] | .digits)([eE][+-]?digits)?`.
pub(crate) fn is_decimal(literal: &str) -> bool {
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    let unsigned = literal.strip_prefix('-').unwrap_or(literal);
    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
        None => (unsigned, None),
    };
    let (integral, fraction) = match mantissa.split_once('.') {
        Some((integral, fraction)) => (integral, fraction),
        None => (mantissa, ""),
    };

    let mantissa_ok = all_digits(integral)
        && all_digits(fraction)
        && !(integral.is_empty() && fraction.is_empty());
    let exponent_ok = match exponent {
        Some(exponent) => {
            let digits = exponent
                .strip_prefix(|c: char| c == '+' || c == '-')
                .unwrap_or(exponent);
            !digits.is_empty() && all_digits(digits)
        }
        None => true,
    };
    mantissa_ok && exponent_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn string_id() -> KeySchema {
        KeySchema::partition_only(KeyAttribute::new("id", KeyType::String))
    }

    fn string_number() -> KeySchema {
        KeySchema::composite(
            KeyAttribute::new("pk", KeyType::String),
            KeyAttribute::new("sk", KeyType::Number),
        )
    }

    fn binary_binary() -> KeySchema {
        KeySchema::composite(
            KeyAttribute::new("h", KeyType::Binary),
            KeyAttribute::new("r", KeyType::Binary),
        )
    }

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_owned())
    }

    fn n(value: &str) -> AttributeValue {
        AttributeValue::N(value.to_owned())
    }

    fn b(value: &[u8]) -> AttributeValue {
        AttributeValue::B(Blob::new(value.to_vec()))
    }

    fn item(attrs: &[(&str, AttributeValue)]) -> Item {
        attrs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn path_separator_is_never_emitted() {
        let schema = string_id();
        let token = encode(&item(&[("id", s("a/b:c")), ("value", n("1"))]), &schema).unwrap();

        let path = format!("/tables/T/items/{token}");
        assert_eq!("/tables/T/items/S:a%2Fb%3Ac", path);
        assert_eq!(item(&[("id", s("a/b:c"))]), decode(&token, &schema).unwrap());
    }

    #[test]
    fn composite_key_ignores_other_attributes() {
        let schema = string_number();
        let token = encode(
            &item(&[("pk", s("x")), ("sk", n("42")), ("extra", s("z"))]),
            &schema,
        )
        .unwrap();

        assert_eq!("S:x,N:42", token.as_str());
        assert_eq!(
            item(&[("pk", s("x")), ("sk", n("42"))]),
            decode(&token, &schema).unwrap()
        );
    }

    #[test]
    fn delimiters_inside_strings_are_escaped() {
        let schema = KeySchema::composite(
            KeyAttribute::new("pk", KeyType::String),
            KeyAttribute::new("sk", KeyType::String),
        );
        let key = item(&[("pk", s("a,b")), ("sk", s("100%:é"))]);
        let token = encode(&key, &schema).unwrap();

        assert_eq!("S:a%2Cb,S:100%25%3A%C3%A9", token.as_str());
        assert_eq!(key, decode(&token, &schema).unwrap());
    }

    #[test]
    fn binary_keys_use_base64url() {
        let schema = binary_binary();
        let key = item(&[("h", b(&[0xfb, 0xff, 0x00])), ("r", b(b""))]);
        let token = encode(&key, &schema).unwrap();

        assert_eq!("B:-_8A,B:", token.as_str());
        assert_eq!(key, decode(&token, &schema).unwrap());
    }

    #[test]
    fn number_text_is_kept_verbatim() {
        let schema = KeySchema::partition_only(KeyAttribute::new("n", KeyType::Number));
        for literal in ["0", "-12.5", "1E+2", "3.14159265358979323846264338327950288", ".5"] {
            let token = encode(&item(&[("n", n(literal))]), &schema).unwrap();
            assert_eq!(format!("N:{literal}"), token.as_str());
            assert_eq!(item(&[("n", n(literal))]), decode(&token, &schema).unwrap());
        }
    }

    #[test]
    fn encode_requires_key_attributes() {
        let err = encode(&item(&[("pk", s("x"))]), &string_number()).unwrap_err();
        assert!(matches!(err, Error::KeySchemaViolation { ref attribute, .. } if attribute == "sk"));

        let err = encode(&item(&[("pk", s("x")), ("sk", s("42"))]), &string_number()).unwrap_err();
        assert!(matches!(err, Error::KeySchemaViolation { ref attribute, .. } if attribute == "sk"));
    }

    #[test]
    fn extra_segment_is_malformed() {
        let err = decode(&KeyToken::from("S:x,N:1"), &string_id()).unwrap_err();
        assert!(matches!(err, Error::MalformedToken { .. }), "{err}");
    }

    #[test]
    fn missing_sort_segment_is_malformed() {
        let err = decode(&KeyToken::from("S:x"), &string_number()).unwrap_err();
        assert!(matches!(err, Error::MalformedToken { .. }), "{err}");
    }

    #[test]
    fn structurally_broken_tokens_are_malformed() {
        for token in ["", "x", "Q:1", "S:a/b", "S:a%2fb", "S:%41"] {
            let err = decode(&KeyToken::from(token), &string_id()).unwrap_err();
            assert!(
                matches!(err, Error::MalformedToken { .. }),
                "`{token}` gave {err}"
            );
        }
    }

    #[test]
    fn non_decimal_number_is_a_type_mismatch() {
        for literal in ["abc", "", "-", ".", "1e", "1.2.3", "0x10", "1,0"] {
            let token = KeyToken::new(format!("S:x,N:{literal}"));
            match decode(&token, &string_number()) {
                // `1,0` is a third segment, not a number
                Err(Error::MalformedToken { .. }) if literal.contains(',') => {}
                Err(Error::TypeMismatch {
                    attribute,
                    expected,
                    ..
                }) => {
                    assert_eq!("sk", attribute);
                    assert_eq!(KeyType::Number, expected);
                }
                other => panic!("`{literal}` gave {other:?}"),
            }
        }
    }

    #[test]
    fn tag_must_match_declared_type() {
        let err = decode(&KeyToken::from("N:1,N:2"), &string_number()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { ref attribute, .. } if attribute == "pk"));
    }

    #[test]
    fn invalid_literals_are_type_mismatches() {
        let err = decode(&KeyToken::from("S:%FF"), &string_id()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{err}");

        let err = decode(&KeyToken::from("B:***,B:"), &binary_binary()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{err}");
    }

    #[test]
    fn decimal_grammar() {
        for ok in ["0", "-0", "10", "1.", "1.5", ".5", "-.5", "1e10", "1E-7", "2.5e+3"] {
            assert!(is_decimal(ok), "{ok}");
        }
        for bad in ["", "-", ".", "+1", "1e", "e1", "1.5.", "--1", "1 ", "∞", "NaN"] {
            assert!(!is_decimal(bad), "{bad}");
        }
    }

    fn key_value(key_type: KeyType) -> BoxedStrategy<AttributeValue> {
        match key_type {
            KeyType::String => any::<String>().prop_map(AttributeValue::S).boxed(),
            KeyType::Number => "-?[0-9]{1,20}(\\.[0-9]{1,10})?([eE][+-]?[0-9]{1,3})?"
                .prop_map(AttributeValue::N)
                .boxed(),
            KeyType::Binary => proptest::collection::vec(any::<u8>(), 0..64)
                .prop_map(|bytes| AttributeValue::B(Blob::new(bytes)))
                .boxed(),
        }
    }

    fn key_type() -> impl Strategy<Value = KeyType> {
        prop_oneof![
            Just(KeyType::String),
            Just(KeyType::Number),
            Just(KeyType::Binary)
        ]
    }

    fn schema_and_item() -> impl Strategy<Value = (KeySchema, Item)> {
        (key_type(), proptest::option::of(key_type())).prop_flat_map(|(pk, sk)| {
            let schema = match sk {
                Some(sk) => KeySchema::composite(
                    KeyAttribute::new("pk", pk),
                    KeyAttribute::new("sk", sk),
                ),
                None => KeySchema::partition_only(KeyAttribute::new("pk", pk)),
            };
            let sk_value = match sk {
                Some(sk) => key_value(sk).prop_map(Some).boxed(),
                None => Just(None).boxed(),
            };
            (Just(schema), key_value(pk), sk_value, any::<String>()).prop_map(
                |(schema, pk, sk, extra)| {
                    let mut item = Item::from([
                        ("pk".to_owned(), pk),
                        ("extra".to_owned(), AttributeValue::S(extra)),
                    ]);
                    if let Some(sk) = sk {
                        item.insert("sk".to_owned(), sk);
                    }
                    (schema, item)
                },
            )
        })
    }

    proptest! {
        #[test]
        fn decode_inverts_encode((schema, item) in schema_and_item()) {
            let token = encode(&item, &schema).unwrap();
            prop_assert_eq!(schema.project(&item).unwrap(), decode(&token, &schema).unwrap());
        }

        #[test]
        fn tokens_are_path_safe((schema, item) in schema_and_item()) {
            let token = encode(&item, &schema).unwrap();
            prop_assert!(!token.as_str().contains('/'));
            prop_assert!(token.as_str().is_ascii());
            prop_assert!(!token.as_str().contains(|c: char| c.is_ascii_whitespace() || c == '?' || c == '#'));
        }

        #[test]
        fn decode_never_panics(raw in any::<String>()) {
            let _ = decode(&KeyToken::new(raw), &string_number());
        }
    }
}
