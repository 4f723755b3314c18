/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use anyhow::Context;
use aws_dynamodb_admin::{
    document, AdminConfig, Client, KeyToken, KeyedItem, ScanCursor, TableMetadata,
};
use aws_sdk_dynamodb::primitives::DateTimeFormat;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "admin")]
#[command(about = "Browses and edits DynamoDB tables. Configured by DYNAMO_ENDPOINT, AWS_REGION and the AWS credential variables.")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List every table with its key schema and item count
    Tables,

    /// Show a table's metadata
    Describe { table: String },

    /// Scan a table one page at a time
    Scan {
        table: String,

        /// Items per page; defaults to DYNAMODB_ADMIN_PAGE_SIZE
        #[arg(long)]
        limit: Option<u32>,

        /// `next` token printed by the previous page
        #[arg(long, conflicts_with = "all")]
        cursor: Option<String>,

        /// Follow cursors to the end of the table
        #[arg(long)]
        all: bool,
    },

    /// Print the item at a key token
    Get { table: String, token: String },

    /// Write an item given as a JSON object
    Put { table: String, item: String },

    /// Delete the item at a key token
    Delete { table: String, token: String },
}

fn metadata_json(metadata: &TableMetadata) -> Value {
    let key_schema = metadata
        .key_schema()
        .attributes()
        .map(|attribute| json!({ "name": attribute.name(), "type": attribute.key_type().tag() }))
        .collect::<Vec<_>>();
    json!({
        "name": metadata.name(),
        "status": metadata.status(),
        "keySchema": key_schema,
        "itemCount": metadata.item_count(),
        "sizeBytes": metadata.size_bytes(),
        "billingMode": metadata.billing_mode(),
        "created": metadata
            .created()
            .and_then(|created| created.fmt(DateTimeFormat::DateTime).ok()),
        "globalSecondaryIndexes": metadata.global_secondary_indexes(),
        "localSecondaryIndexes": metadata.local_secondary_indexes(),
    })
}

async fn run(client: &Client, config: &AdminConfig, command: Command) -> anyhow::Result<Value> {
    Ok(match command {
        Command::Tables => {
            let tables = client.describe_all_tables().await?;
            Value::Array(tables.iter().map(|metadata| metadata_json(metadata)).collect())
        }
        Command::Describe { table } => metadata_json(&*client.describe_table(&table).await?),
        Command::Scan {
            table,
            limit,
            cursor,
            all,
        } => {
            let limit = limit.unwrap_or(config.page_size());
            let schema = client.key_schema(&table).await?;
            let items = |items: &[KeyedItem]| {
                items
                    .iter()
                    .map(|keyed| {
                        json!({ "token": keyed.token().as_str(), "item": document::item_to_json(keyed.item()) })
                    })
                    .collect::<Vec<_>>()
            };
            if all {
                let all_items = client.scan_all(&table).await?;
                json!({ "items": items(&all_items) })
            } else {
                let cursor = cursor
                    .map(|token| ScanCursor::from_token(&KeyToken::new(token), &schema))
                    .transpose()
                    .context("invalid --cursor")?;
                let page = client.scan_page(&table, limit, cursor).await?;
                let next = page
                    .next_cursor()
                    .map(|cursor| cursor.to_token(&schema))
                    .transpose()?;
                json!({
                    "items": items(page.items()),
                    "next": next.as_ref().map(KeyToken::as_str),
                })
            }
        }
        Command::Get { table, token } => {
            let item = client.get_item(&table, &KeyToken::new(token)).await?;
            item.as_ref()
                .map(document::item_to_json)
                .context("no item at this key")?
        }
        Command::Put { table, item } => {
            let schema = client.key_schema(&table).await?;
            let item = serde_json::from_str(&item).context("item is not JSON")?;
            let item = document::item_from_json_with_keys(item, &schema)?;
            let stored = client.put_item(&table, item).await?;
            json!({ "token": stored.token().as_str(), "item": document::item_to_json(stored.item()) })
        }
        Command::Delete { table, token } => {
            client.delete_item(&table, &KeyToken::new(token)).await?;
            json!({ "deleted": true })
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let config = AdminConfig::from_env();
    tracing::debug!(?config, "loaded configuration");
    let client = Client::from_config(&config).await;

    let output = run(&client, &config, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
