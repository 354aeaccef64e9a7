use anyhow::{Context, Result};
use greentic_keyring_spec::PersistOptions;

pub const PREFIX_ENV: &str = "GREENTIC_KEYRING_PREFIX";
pub const KMS_KEY_ENV: &str = "GREENTIC_KEYRING_KMS_KEY_ID";
pub const REPLICATION_REGION_ENV: &str = "GREENTIC_KEYRING_REPLICATION_REGION";
pub const REPLICA_KMS_KEY_ENV: &str = "GREENTIC_KEYRING_REPLICA_KMS_KEY_ID";

/// Keyring settings supplied once when the repository is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyringConfig {
    pub prefix: String,
    pub options: PersistOptions,
}

impl KeyringConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            options: PersistOptions::default(),
        }
    }

    /// Load settings from the environment.
    ///
    /// * `GREENTIC_KEYRING_PREFIX` namespace prefix (required).
    /// * `GREENTIC_KEYRING_KMS_KEY_ID` primary-region KMS key.
    /// * `GREENTIC_KEYRING_REPLICATION_REGION` replica region.
    /// * `GREENTIC_KEYRING_REPLICA_KMS_KEY_ID` replica-region KMS key.
    ///
    /// Blank values count as unset.
    pub fn from_env() -> Result<Self> {
        let prefix = env_value(PREFIX_ENV).with_context(|| format!("{PREFIX_ENV} must be set"))?;
        Ok(Self {
            prefix,
            options: PersistOptions {
                kms_key_id: env_value(KMS_KEY_ENV),
                replication_region: env_value(REPLICATION_REGION_ENV),
                replica_region_kms_key_id: env_value(REPLICA_KMS_KEY_ENV),
            },
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    fn clear_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_all() {
        for key in [PREFIX_ENV, KMS_KEY_ENV, REPLICATION_REGION_ENV, REPLICA_KMS_KEY_ENV] {
            clear_env(key);
        }
    }

    #[test]
    #[serial]
    fn prefix_is_required() {
        clear_all();
        let err = KeyringConfig::from_env().unwrap_err();
        assert!(err.to_string().contains(PREFIX_ENV));

        set_env(PREFIX_ENV, "   ");
        assert!(KeyringConfig::from_env().is_err());
        clear_all();
    }

    #[test]
    #[serial]
    fn reads_options() {
        clear_all();
        set_env(PREFIX_ENV, "/app/keys/");
        set_env(KMS_KEY_ENV, "alias/keyring");
        set_env(REPLICATION_REGION_ENV, "eu-central-1");
        set_env(REPLICA_KMS_KEY_ENV, "");

        let config = KeyringConfig::from_env().unwrap();
        assert_eq!(config.prefix, "/app/keys/");
        assert_eq!(
            config.options,
            PersistOptions {
                kms_key_id: Some("alias/keyring".into()),
                replication_region: Some("eu-central-1".into()),
                replica_region_kms_key_id: None,
            }
        );
        clear_all();
    }
}
