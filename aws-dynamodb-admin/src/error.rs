/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::types::KeyType;
use aws_smithy_runtime_api::box_error::BoxError;

/// Failed console operation.
///
/// Every variant is terminal for the operation that produced it; nothing in this crate retries.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The key token could not be parsed against the table's key schema.
    #[error("malformed key token `{token}`: {reason}")]
    MalformedToken {
        /// The offending token.
        token: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A token segment could not be coerced to the type the key schema declares for it.
    #[error("key attribute `{attribute}` expects a {expected} value, got `{literal}`")]
    TypeMismatch {
        /// Name of the key attribute the segment belongs to.
        attribute: String,
        /// The declared type of that attribute.
        expected: KeyType,
        /// The literal found in the token.
        literal: String,
    },

    /// The store reports no table with this name.
    #[error("table `{table}` does not exist")]
    TableNotFound {
        /// The table that was asked for.
        table: String,
    },

    /// An item does not carry the table's key attributes with the declared types.
    #[error("key attribute `{attribute}`: {reason}")]
    KeySchemaViolation {
        /// Name of the key attribute at fault.
        attribute: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A JSON document cannot be represented as an item.
    #[error("invalid item document: {reason}")]
    InvalidDocument {
        /// What is wrong with the document.
        reason: String,
    },

    /// Talking to the store failed.
    #[error("{operation} failed{}", for_table(.table))]
    StoreUnavailable {
        /// The store operation that failed, e.g. `Scan`.
        operation: &'static str,
        /// The table the operation targeted, if any.
        table: Option<String>,
        /// The underlying failure.
        #[source]
        source: BoxError,
    },
}

fn for_table(table: &Option<String>) -> String {
    match table {
        Some(table) => format!(" for table `{table}`"),
        None => String::new(),
    }
}

pub(crate) fn malformed_token(token: &str, reason: impl Into<String>) -> Error {
    Error::MalformedToken {
        token: token.to_owned(),
        reason: reason.into(),
    }
}

pub(crate) fn type_mismatch(attribute: &str, expected: KeyType, literal: &str) -> Error {
    Error::TypeMismatch {
        attribute: attribute.to_owned(),
        expected,
        literal: literal.to_owned(),
    }
}

pub(crate) fn table_not_found(table: &str) -> Error {
    Error::TableNotFound {
        table: table.to_owned(),
    }
}

pub(crate) fn key_schema_violation(attribute: &str, reason: impl Into<String>) -> Error {
    Error::KeySchemaViolation {
        attribute: attribute.to_owned(),
        reason: reason.into(),
    }
}

pub(crate) fn invalid_document(reason: impl Into<String>) -> Error {
    Error::InvalidDocument {
        reason: reason.into(),
    }
}

pub(crate) fn store_unavailable(
    operation: &'static str,
    table: Option<&str>,
    source: impl Into<BoxError>,
) -> Error {
    Error::StoreUnavailable {
        operation,
        table: table.map(str::to_owned),
        source: source.into(),
    }
}
