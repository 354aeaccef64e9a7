//! Contract types shared by the keyring repository, its secret-store clients, and
//! the key-management hosts that consume it.

pub mod document;
pub mod error;
pub mod options;
pub mod repository;
pub mod store;

pub use document::KeyDocument;
pub use error::{DocumentError, Error, Result, StoreError, StoreResult};
pub use options::PersistOptions;
pub use repository::XmlRepository;
pub use store::{
    CreateSecretRequest, ListSecretsPage, ListSecretsRequest, ReplicaRegion, SecretEntry,
    SecretStore, TAG_DATA_PROTECTION_KEY_PREFIX, Tag,
};

use std::sync::Arc;

pub type DynSecretStore = Arc<dyn SecretStore>;
