use crate::error::StoreResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Tag key attached to every stored key; its value is the namespace prefix.
pub const TAG_DATA_PROTECTION_KEY_PREFIX: &str = "DataProtectionKeyPrefix";

/// One page request of a tag-filtered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSecretsRequest {
    /// Only secrets carrying a tag with this value are returned.
    pub tag_value: String,
    /// Continuation token from the previous page.
    pub next_token: Option<String>,
}

impl ListSecretsRequest {
    pub fn tagged(tag_value: impl Into<String>) -> Self {
        Self {
            tag_value: tag_value.into(),
            next_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretEntry {
    pub name: String,
}

/// One page of listing results. An absent or empty `next_token` ends the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSecretsPage {
    pub entries: Vec<SecretEntry>,
    pub next_token: Option<String>,
}

impl ListSecretsPage {
    pub fn continuation(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Replica specification; an absent `kms_key_id` selects the region's default key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaRegion {
    pub region: String,
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSecretRequest {
    pub name: String,
    pub secret_string: String,
    pub tags: Vec<Tag>,
    pub kms_key_id: Option<String>,
    pub replica_regions: Vec<ReplicaRegion>,
}

/// The subset of a managed secret store consumed by the keyring repository.
///
/// Implementations must tolerate concurrent use. Retries, throttling back-off and
/// connection pooling belong to the implementation.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage>;
    async fn get_secret_value(&self, name: &str) -> StoreResult<String>;
    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()>;
}

#[async_trait]
impl<T> SecretStore for Arc<T>
where
    T: SecretStore + ?Sized,
{
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage> {
        (**self).list_secrets(request).await
    }

    async fn get_secret_value(&self, name: &str) -> StoreResult<String> {
        (**self).get_secret_value(name).await
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()> {
        (**self).create_secret(request).await
    }
}

#[async_trait]
impl<T> SecretStore for Box<T>
where
    T: SecretStore + ?Sized,
{
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage> {
        (**self).list_secrets(request).await
    }

    async fn get_secret_value(&self, name: &str) -> StoreResult<String> {
        (**self).get_secret_value(name).await
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()> {
        (**self).create_secret(request).await
    }
}
