use async_trait::async_trait;
use greentic_keyring_spec::{
    CreateSecretRequest, ListSecretsPage, ListSecretsRequest, ReplicaRegion, SecretEntry,
    SecretStore, StoreError, StoreResult, Tag,
};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

const DEFAULT_PAGE_SIZE: usize = 100;

/// A secret as held by [`InMemorySecretStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub secret_string: String,
    pub tags: Vec<Tag>,
    pub kms_key_id: Option<String>,
    pub replica_regions: Vec<ReplicaRegion>,
}

/// Process-local secret store for development and tests.
///
/// Listing is paginated in name order; the continuation token is the offset of the
/// next entry among the matching secrets.
#[derive(Debug)]
pub struct InMemorySecretStore {
    secrets: RwLock<BTreeMap<String, StoredSecret>>,
    page_size: usize,
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            secrets: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Insert a raw payload, bypassing `create_secret` validation.
    pub fn insert(&self, name: impl Into<String>, secret_string: impl Into<String>, tags: Vec<Tag>) {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name.into(),
                StoredSecret {
                    secret_string: secret_string.into(),
                    tags,
                    kms_key_id: None,
                    replica_regions: Vec::new(),
                },
            );
    }

    pub fn secret(&self, name: &str) -> Option<StoredSecret> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage> {
        let offset = match request.next_token.as_deref() {
            None | Some("") => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StoreError::Validation(format!("invalid next token `{token}`")))?,
        };

        let secrets = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
        let matching: Vec<&String> = secrets
            .iter()
            .filter(|(_, secret)| secret.tags.iter().any(|tag| tag.value == request.tag_value))
            .map(|(name, _)| name)
            .collect();

        let entries = matching
            .iter()
            .skip(offset)
            .take(self.page_size)
            .map(|name| SecretEntry {
                name: (*name).clone(),
            })
            .collect::<Vec<_>>();
        let next = offset + entries.len();
        let next_token = (next < matching.len()).then(|| next.to_string());

        Ok(ListSecretsPage {
            entries,
            next_token,
        })
    }

    async fn get_secret_value(&self, name: &str) -> StoreResult<String> {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|secret| secret.secret_string.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_owned()))
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()> {
        if request.name.is_empty() {
            return Err(StoreError::Validation("secret name must not be empty".into()));
        }
        let mut secrets = self.secrets.write().unwrap_or_else(PoisonError::into_inner);
        if secrets.contains_key(&request.name) {
            return Err(StoreError::AlreadyExists(request.name));
        }
        secrets.insert(
            request.name,
            StoredSecret {
                secret_string: request.secret_string,
                tags: request.tags,
                kms_key_id: request.kms_key_id,
                replica_regions: request.replica_regions,
            },
        );
        Ok(())
    }
}
