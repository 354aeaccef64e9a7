//! Runtime pieces of the keyring: the secret-store backed repository, the
//! sync-over-async bridge it runs on, configuration, and an in-memory store.

pub mod config;
pub mod memory;
pub mod repository;
pub mod rt;
pub mod telemetry;

pub use config::KeyringConfig;
pub use memory::{InMemorySecretStore, StoredSecret};
pub use repository::{RepositoryBuilder, SecretsManagerXmlRepository, normalize_prefix};

pub use greentic_keyring_spec::{
    DocumentError, Error, KeyDocument, PersistOptions, Result, SecretStore, StoreError,
    XmlRepository,
};
