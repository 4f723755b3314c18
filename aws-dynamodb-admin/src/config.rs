/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_types::os_shim_internal::Env;
use aws_types::region::Region;
use aws_types::SdkConfig;

/// Endpoint used when `DYNAMO_ENDPOINT` is not set: a DynamoDB Local instance.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Region used when `AWS_REGION` is not set.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Number of items per scan page when `DYNAMODB_ADMIN_PAGE_SIZE` is not set.
pub const DEFAULT_PAGE_SIZE: u32 = 25;

const PROVIDER_NAME: &str = "aws-dynamodb-admin";

/// Fixed access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    access_key_id: String,
    secret_access_key: String,
}

impl StaticCredentials {
    /// Creates a key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// The access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The secret access key.
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Fluent style builder for [AdminConfig]
#[derive(Debug, Clone)]
pub struct Builder {
    endpoint_url: Option<String>,
    region: String,
    credentials: Option<StaticCredentials>,
    page_size: u32,
}

impl Builder {
    fn new() -> Self {
        Self {
            endpoint_url: None,
            region: DEFAULT_REGION.to_owned(),
            credentials: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Endpoint of the store. Unset means the regional DynamoDB endpoint.
    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Region to sign requests for. Default is `us-east-1`.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Fixed credentials. Unset means the default credential provider chain.
    pub fn credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Items per scan page. Zero leaves the page size to the store.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Consumes the builder and constructs an [AdminConfig]
    pub fn build(self) -> AdminConfig {
        AdminConfig {
            endpoint_url: self.endpoint_url,
            region: self.region,
            credentials: self.credentials,
            page_size: self.page_size,
        }
    }
}

/// How to reach the store and how much to read per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    endpoint_url: Option<String>,
    region: String,
    credentials: Option<StaticCredentials>,
    page_size: u32,
}

impl AdminConfig {
    /// Create a new [Builder]
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Reads the configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `DYNAMO_ENDPOINT` | `http://localhost:8000` |
    /// | `AWS_REGION` | `us-east-1` |
    /// | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | `key` / `secret` |
    /// | `DYNAMODB_ADMIN_PAGE_SIZE` | `25` |
    ///
    /// The defaults target DynamoDB Local, which accepts any credentials.
    pub fn from_env() -> Self {
        Self::from_os_env(&Env::real())
    }

    fn from_os_env(env: &Env) -> Self {
        let var = |name: &str, default: &str| env.get(name).unwrap_or_else(|_| default.to_owned());
        let page_size = match env.get("DYNAMODB_ADMIN_PAGE_SIZE") {
            Ok(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(
                    value = %value,
                    "invalid DYNAMODB_ADMIN_PAGE_SIZE; using {DEFAULT_PAGE_SIZE}"
                );
                DEFAULT_PAGE_SIZE
            }),
            Err(_) => DEFAULT_PAGE_SIZE,
        };
        Self::builder()
            .endpoint_url(var("DYNAMO_ENDPOINT", DEFAULT_ENDPOINT))
            .region(var("AWS_REGION", DEFAULT_REGION))
            .credentials(StaticCredentials::new(
                var("AWS_ACCESS_KEY_ID", "key"),
                var("AWS_SECRET_ACCESS_KEY", "secret"),
            ))
            .page_size(page_size)
            .build()
    }

    /// Endpoint of the store, if overridden.
    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    /// Signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Fixed credentials, if any.
    pub fn credentials(&self) -> Option<&StaticCredentials> {
        self.credentials.as_ref()
    }

    /// Items per scan page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Loads an [`SdkConfig`] for this configuration.
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));
        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        if let Some(credentials) = &self.credentials {
            loader = loader.credentials_provider(Credentials::new(
                credentials.access_key_id(),
                credentials.secret_access_key(),
                None,
                None,
                PROVIDER_NAME,
            ));
        }
        loader.load().await
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
