use serde::{Deserialize, Serialize};

/// Write-time options applied to every stored key.
///
/// Blank strings are treated the same as unset values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistOptions {
    /// KMS key used to encrypt the secret in the primary region. The store's default
    /// key is used when unset.
    pub kms_key_id: Option<String>,
    /// Region the secret is replicated to.
    pub replication_region: Option<String>,
    /// KMS key used in the replica region. Only consulted when
    /// `replication_region` is set; the region's default key is used when unset.
    pub replica_region_kms_key_id: Option<String>,
}

impl PersistOptions {
    pub fn with_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.kms_key_id = Some(key_id.into());
        self
    }

    pub fn with_replication_region(mut self, region: impl Into<String>) -> Self {
        self.replication_region = Some(region.into());
        self
    }

    pub fn with_replica_region_kms_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.replica_region_kms_key_id = Some(key_id.into());
        self
    }

    pub fn effective_kms_key_id(&self) -> Option<&str> {
        non_empty(self.kms_key_id.as_deref())
    }

    pub fn effective_replication_region(&self) -> Option<&str> {
        non_empty(self.replication_region.as_deref())
    }

    pub fn effective_replica_region_kms_key_id(&self) -> Option<&str> {
        non_empty(self.replica_region_kms_key_id.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_not_effective() {
        let opts = PersistOptions::default()
            .with_kms_key_id("")
            .with_replication_region("eu-west-1")
            .with_replica_region_kms_key_id("");
        assert_eq!(opts.effective_kms_key_id(), None);
        assert_eq!(opts.effective_replication_region(), Some("eu-west-1"));
        assert_eq!(opts.effective_replica_region_kms_key_id(), None);
    }

    #[test]
    fn deserialises_partial_config() {
        let opts: PersistOptions =
            serde_json::from_str(r#"{ "replication_region": "us-west-2" }"#).unwrap();
        assert_eq!(
            opts,
            PersistOptions {
                replication_region: Some("us-west-2".into()),
                ..PersistOptions::default()
            }
        );
    }
}
