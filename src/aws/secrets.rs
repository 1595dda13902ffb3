use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType, SecretListEntry};
use aws_smithy_types::error::display::DisplayErrorContext;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::constants::SECRET_DESCRIPTION;
use crate::simplefin::AccessCredential;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to store secret '{name}': {message}")]
    Create { name: String, message: String },
    #[error("failed to retrieve secret '{name}': {message}")]
    Retrieve { name: String, message: String },
    #[error("failed to delete secret '{name}': {message}")]
    Delete { name: String, message: String },
    #[error("failed to list secrets: {0}")]
    List(String),
    #[error("secret '{0}' has no string value")]
    EmptySecret(String),
    #[error("failed to encode or decode access credential: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Listing entry for a stored secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSummary {
    pub name: String,
    pub description: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub last_changed: Option<DateTime<Utc>>,
}

/// Named storage for SimpleFIN access credentials.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Create the secret, or overwrite its value when it already exists.
    async fn store(&self, name: &str, credential: &AccessCredential) -> Result<(), SecretError>;

    async fn retrieve(&self, name: &str) -> Result<AccessCredential, SecretError>;

    /// Delete immediately, without a recovery window.
    async fn delete(&self, name: &str) -> Result<(), SecretError>;

    /// Secrets whose name contains `prefix`; everything when it is empty.
    async fn list(&self, prefix: &str) -> Result<Vec<SecretSummary>, SecretError>;
}

fn matches_prefix(name: &str, prefix: &str) -> bool {
    prefix.is_empty() || name.contains(prefix)
}

fn to_chrono(value: Option<&aws_smithy_types::DateTime>) -> Option<DateTime<Utc>> {
    value.and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos()))
}

pub struct SecretsManagerStore {
    client: Client,
}

impl SecretsManagerStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    fn summary(entry: &SecretListEntry) -> Option<SecretSummary> {
        Some(SecretSummary {
            name: entry.name()?.to_string(),
            description: entry.description().map(String::from),
            created: to_chrono(entry.created_date()),
            last_changed: to_chrono(entry.last_changed_date()),
        })
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn store(&self, name: &str, credential: &AccessCredential) -> Result<(), SecretError> {
        let payload = serde_json::to_string(credential)?;

        let created = self
            .client
            .create_secret()
            .name(name)
            .description(SECRET_DESCRIPTION)
            .secret_string(&payload)
            .send()
            .await;

        match created {
            Ok(_) => info!("Created secret '{}'", name),
            Err(create_err) => {
                let create_err = DisplayErrorContext(create_err).to_string();
                debug!("Create failed ({}), updating existing secret", create_err);
                self.client
                    .update_secret()
                    .secret_id(name)
                    .secret_string(&payload)
                    .send()
                    .await
                    .map_err(|update_err| SecretError::Create {
                        name: name.to_string(),
                        message: format!(
                            "create error: {create_err}, update error: {}",
                            DisplayErrorContext(update_err)
                        ),
                    })?;
                info!("Updated secret '{}'", name);
            }
        }
        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<AccessCredential, SecretError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| SecretError::Retrieve {
                name: name.to_string(),
                message: DisplayErrorContext(e).to_string(),
            })?;

        let value = response
            .secret_string()
            .ok_or_else(|| SecretError::EmptySecret(name.to_string()))?;
        Ok(serde_json::from_str(value)?)
    }

    async fn delete(&self, name: &str) -> Result<(), SecretError> {
        self.client
            .delete_secret()
            .secret_id(name)
            .force_delete_without_recovery(true)
            .send()
            .await
            .map_err(|e| SecretError::Delete {
                name: name.to_string(),
                message: DisplayErrorContext(e).to_string(),
            })?;
        info!("Deleted secret '{}'", name);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<SecretSummary>, SecretError> {
        let mut request = self.client.list_secrets();
        if !prefix.is_empty() {
            request = request.filters(
                Filter::builder()
                    .key(FilterNameStringType::Name)
                    .values(prefix)
                    .build(),
            );
        }

        let mut pages = request.into_paginator().send();
        let mut secrets = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| SecretError::List(DisplayErrorContext(e).to_string()))?;
            secrets.extend(
                page.secret_list()
                    .iter()
                    .filter_map(Self::summary)
                    .filter(|s| matches_prefix(&s.name, prefix)),
            );
        }

        debug!("Listed {} secret(s) matching '{}'", secrets.len(), prefix);
        Ok(secrets)
    }
}

/// Process-local [`SecretStore`].
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<BTreeMap<String, String>>,
}

impl MemorySecretStore {
    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.secrets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn store(&self, name: &str, credential: &AccessCredential) -> Result<(), SecretError> {
        let payload = serde_json::to_string(credential)?;
        self.entries().insert(name.to_string(), payload);
        Ok(())
    }

    async fn retrieve(&self, name: &str) -> Result<AccessCredential, SecretError> {
        let payload = self
            .entries()
            .get(name)
            .cloned()
            .ok_or_else(|| SecretError::Retrieve {
                name: name.to_string(),
                message: "ResourceNotFoundException: secret not found".to_string(),
            })?;
        Ok(serde_json::from_str(&payload)?)
    }

    async fn delete(&self, name: &str) -> Result<(), SecretError> {
        self.entries()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SecretError::Delete {
                name: name.to_string(),
                message: "ResourceNotFoundException: secret not found".to_string(),
            })
    }

    async fn list(&self, prefix: &str) -> Result<Vec<SecretSummary>, SecretError> {
        Ok(self
            .entries()
            .keys()
            .filter(|name| matches_prefix(name, prefix))
            .map(|name| SecretSummary {
                name: name.clone(),
                description: Some(SECRET_DESCRIPTION.to_string()),
                created: None,
                last_changed: None,
            })
            .collect())
    }
}
