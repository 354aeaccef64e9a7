use crate::rt;
use greentic_keyring_spec::{
    CreateSecretRequest, DynSecretStore, Error, KeyDocument, ListSecretsRequest, PersistOptions,
    ReplicaRegion, Result, SecretStore, TAG_DATA_PROTECTION_KEY_PREFIX, Tag, XmlRepository,
};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{Dispatch, debug, error, info, warn};
use uuid::Uuid;

const SEPARATOR: char = '/';

/// Normalise a namespace prefix: strip surrounding separators and append exactly one.
///
/// Returns `None` when nothing is left after stripping.
pub fn normalize_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("{trimmed}{SEPARATOR}"))
    }
}

/// Builder for [`SecretsManagerXmlRepository`].
#[derive(Default)]
pub struct RepositoryBuilder {
    store: Option<DynSecretStore>,
    prefix: Option<String>,
    options: Option<PersistOptions>,
    dispatch: Option<Dispatch>,
}

impl RepositoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Secret-store client used for every exchange. Required.
    pub fn store<S>(self, store: S) -> Self
    where
        S: SecretStore + 'static,
    {
        self.shared_store(Arc::new(store))
    }

    pub fn shared_store(mut self, store: DynSecretStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Namespace prefix grouping the keyring's secrets. Required.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn options(mut self, options: PersistOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Route the repository's diagnostics to `dispatch` instead of the default subscriber.
    pub fn dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn build(self) -> Result<SecretsManagerXmlRepository> {
        let store = self.store.ok_or(Error::InvalidArgument { field: "store" })?;
        let prefix = self
            .prefix
            .as_deref()
            .and_then(normalize_prefix)
            .ok_or(Error::InvalidArgument { field: "prefix" })?;

        let repository = SecretsManagerXmlRepository {
            store: RwLock::new(Some(store)),
            prefix,
            options: self.options.unwrap_or_default(),
            dispatch: self.dispatch,
        };
        repository.emit(|| {
            info!(
                prefix = %repository.prefix,
                "using secrets manager to persist data-protection keys"
            )
        });
        Ok(repository)
    }
}

/// Keyring repository backed by a managed secret store.
///
/// Every key lives in its own secret named `<prefix><name>` and tagged
/// `DataProtectionKeyPrefix=<prefix>`; listing filters on that tag. The store is the
/// only source of truth, nothing is cached between calls.
pub struct SecretsManagerXmlRepository {
    store: RwLock<Option<DynSecretStore>>,
    prefix: String,
    options: PersistOptions,
    dispatch: Option<Dispatch>,
}

impl SecretsManagerXmlRepository {
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::new()
    }

    pub fn new<S>(store: S, prefix: &str, options: Option<PersistOptions>) -> Result<Self>
    where
        S: SecretStore + 'static,
    {
        let mut builder = Self::builder().store(store).prefix(prefix);
        if let Some(options) = options {
            builder = builder.options(options);
        }
        builder.build()
    }

    /// Normalised namespace prefix, always ending in `/`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn options(&self) -> &PersistOptions {
        &self.options
    }

    /// Secret name used for `element`: the friendly name, else the element's `id`,
    /// else a fresh UUID, appended to the prefix.
    pub fn secret_name(&self, element: &KeyDocument, friendly_name: Option<&str>) -> String {
        let suffix = friendly_name
            .filter(|name| !name.is_empty())
            .or_else(|| element.id().filter(|id| !id.is_empty()))
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        format!("{}{}", self.prefix, suffix)
    }

    /// Release the store client. Later calls are no-ops.
    pub fn dispose(&self) {
        let released = self
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            self.emit(|| debug!(prefix = %self.prefix, "released secret store client"));
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn store_handle(&self) -> Result<DynSecretStore> {
        let handle = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        handle.ok_or_else(|| {
            self.emit(|| error!(prefix = %self.prefix, "repository used after dispose"));
            Error::Disposed
        })
    }

    fn emit(&self, event: impl FnOnce()) {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, event),
            None => event(),
        }
    }

    fn create_request(&self, name: String, secret_string: String) -> CreateSecretRequest {
        let replica_regions = self
            .options
            .effective_replication_region()
            .map(|region| ReplicaRegion {
                region: region.to_owned(),
                kms_key_id: self
                    .options
                    .effective_replica_region_kms_key_id()
                    .map(str::to_owned),
            })
            .into_iter()
            .collect();

        CreateSecretRequest {
            name,
            secret_string,
            tags: vec![Tag::new(TAG_DATA_PROTECTION_KEY_PREFIX, self.prefix.clone())],
            kms_key_id: self.options.effective_kms_key_id().map(str::to_owned),
            replica_regions,
        }
    }

    async fn load_all(&self, store: &dyn SecretStore) -> Result<Vec<KeyDocument>> {
        let mut request = ListSecretsRequest::tagged(self.prefix.clone());
        let mut documents = Vec::new();
        let mut listed = 0usize;

        loop {
            let page = match store.list_secrets(request.clone()).await {
                Ok(page) => page,
                Err(source) => {
                    self.emit(|| {
                        error!(
                            prefix = %self.prefix,
                            error = %source,
                            "error listing secrets holding data-protection keys"
                        )
                    });
                    return Err(Error::Listing {
                        prefix: self.prefix.clone(),
                        source,
                    });
                }
            };
            self.emit(|| debug!(prefix = %self.prefix, entries = page.entries.len(), "listed page"));

            for entry in &page.entries {
                listed += 1;
                match fetch_document(store, &entry.name).await {
                    Ok(document) => documents.push(document),
                    Err(err) => self.emit(|| {
                        error!(
                            secret = %entry.name,
                            error = %err,
                            "error loading data-protection key, key will be skipped"
                        )
                    }),
                }
            }

            match page.continuation() {
                Some(token) => request.next_token = Some(token.to_owned()),
                None => break,
            }
        }

        let count = documents.len();
        self.emit(|| info!(prefix = %self.prefix, count, "loaded data-protection keys"));
        if listed > 0 && count == 0 {
            self.emit(|| {
                warn!(
                    prefix = %self.prefix,
                    listed,
                    "no listed secret held a readable data-protection key"
                )
            });
        }
        Ok(documents)
    }

    async fn store_one(
        &self,
        store: &dyn SecretStore,
        element: &KeyDocument,
        friendly_name: Option<&str>,
    ) -> Result<()> {
        let name = self.secret_name(element, friendly_name);
        let payload = match element.to_xml_string() {
            Ok(payload) => payload,
            Err(source) => {
                self.emit(|| error!(secret = %name, error = %source, "error serialising data-protection key"));
                return Err(Error::Serialize { name, source });
            }
        };

        match store.create_secret(self.create_request(name.clone(), payload)).await {
            Ok(()) => {
                self.emit(|| info!(secret = %name, "saved data-protection key to secrets manager"));
                Ok(())
            }
            Err(source) => {
                self.emit(|| {
                    error!(
                        secret = %name,
                        error = %source,
                        "error saving data-protection key to secrets manager"
                    )
                });
                Err(Error::Store { name, source })
            }
        }
    }
}

async fn fetch_document(store: &dyn SecretStore, name: &str) -> Result<KeyDocument> {
    let payload = store
        .get_secret_value(name)
        .await
        .map_err(|source| Error::Fetch {
            name: name.to_owned(),
            source,
        })?;
    KeyDocument::parse(&payload).map_err(|source| Error::Parse {
        name: name.to_owned(),
        source,
    })
}

impl XmlRepository for SecretsManagerXmlRepository {
    fn get_all_elements(&self) -> Result<Vec<KeyDocument>> {
        let store = self.store_handle()?;
        rt::sync_await(self.load_all(store.as_ref()))
    }

    fn store_element(&self, element: &KeyDocument, friendly_name: Option<&str>) -> Result<()> {
        let store = self.store_handle()?;
        rt::sync_await(self.store_one(store.as_ref(), element, friendly_name))
    }
}
