//! AWS Secrets Manager implementation of the keyring [`SecretStore`], plus helpers
//! that assemble a ready-to-use repository from the shared AWS configuration.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType, ReplicaRegionType, Tag};
use aws_types::region::Region;
use greentic_keyring_core::{KeyringConfig, SecretsManagerXmlRepository};
use greentic_keyring_spec::{
    CreateSecretRequest, ListSecretsPage, ListSecretsRequest, PersistOptions, SecretEntry,
    SecretStore, StoreError, StoreResult,
};
use std::env;
use tracing::debug;

const REGION_ENV: &str = "GREENTIC_AWS_REGION";
const SM_ENDPOINT_ENV: &str = "GREENTIC_AWS_SM_ENDPOINT";

/// Connection settings for the Secrets Manager client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AwsClientConfig {
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl AwsClientConfig {
    /// `GREENTIC_AWS_REGION` overrides the region from the default provider chain and
    /// `GREENTIC_AWS_SM_ENDPOINT` points the client at an alternative endpoint.
    pub fn from_env() -> Self {
        Self {
            region: env_value(REGION_ENV),
            endpoint: env_value(SM_ENDPOINT_ENV),
        }
    }

    pub async fn client(&self) -> SecretsManagerClient {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = self.region.as_deref() {
            loader = loader.region(Region::new(region.to_owned()));
        }
        let shared_config = loader.load().await;

        let mut builder = aws_sdk_secretsmanager::config::Builder::from(&shared_config);
        if let Some(endpoint) = self.endpoint.as_deref() {
            builder = builder.endpoint_url(endpoint);
        }
        SecretsManagerClient::from_conf(builder.build())
    }
}

/// [`SecretStore`] backed by AWS Secrets Manager.
#[derive(Clone, Debug)]
pub struct AwsSecretStore {
    client: SecretsManagerClient,
}

impl AwsSecretStore {
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SecretsManagerClient {
        &self.client
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage> {
        let filter = Filter::builder()
            .key(FilterNameStringType::TagValue)
            .values(request.tag_value)
            .build();
        let response = self
            .client
            .list_secrets()
            .filters(filter)
            .set_next_token(request.next_token)
            .send()
            .await
            .map_err(|err| classify("list_secrets", err))?;

        let entries = response
            .secret_list()
            .iter()
            .filter_map(|entry| entry.name())
            .map(|name| SecretEntry {
                name: name.to_owned(),
            })
            .collect();

        Ok(ListSecretsPage {
            entries,
            next_token: response.next_token().map(str::to_owned),
        })
    }

    async fn get_secret_value(&self, name: &str) -> StoreResult<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|err| classify("get_secret_value", err))?;

        response
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| StoreError::Validation(format!("secret {name} has no string value")))
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()> {
        let tags = request
            .tags
            .into_iter()
            .map(|tag| Tag::builder().key(tag.key).value(tag.value).build())
            .collect::<Vec<_>>();
        let replicas = request
            .replica_regions
            .into_iter()
            .map(|replica| {
                ReplicaRegionType::builder()
                    .region(replica.region)
                    .set_kms_key_id(replica.kms_key_id)
                    .build()
            })
            .collect::<Vec<_>>();

        self.client
            .create_secret()
            .name(request.name)
            .secret_string(request.secret_string)
            .set_tags(Some(tags))
            .set_kms_key_id(request.kms_key_id)
            .set_add_replica_regions((!replicas.is_empty()).then_some(replicas))
            .send()
            .await
            .map(|_| ())
            .map_err(|err| classify("create_secret", err))
    }
}

/// Build a repository over a freshly configured Secrets Manager client.
///
/// `setup` adjusts the default [`PersistOptions`] before the repository is built.
pub async fn build_repository<F>(prefix: &str, setup: F) -> Result<SecretsManagerXmlRepository>
where
    F: FnOnce(&mut PersistOptions),
{
    build_repository_with(&AwsClientConfig::from_env(), prefix, setup).await
}

pub async fn build_repository_with<F>(
    client_config: &AwsClientConfig,
    prefix: &str,
    setup: F,
) -> Result<SecretsManagerXmlRepository>
where
    F: FnOnce(&mut PersistOptions),
{
    let mut options = PersistOptions::default();
    setup(&mut options);

    let client = client_config.client().await;
    debug!(region = ?client_config.region, endpoint = ?client_config.endpoint, "secrets manager client configured");

    SecretsManagerXmlRepository::new(AwsSecretStore::new(client), prefix, Some(options))
        .context("failed to build secrets manager keyring repository")
}

/// Build a repository from `GREENTIC_KEYRING_*` and `GREENTIC_AWS_*` variables.
pub async fn build_repository_from_env() -> Result<SecretsManagerXmlRepository> {
    let config = KeyringConfig::from_env()?;
    let KeyringConfig { prefix, options } = config;
    build_repository(&prefix, move |opts| *opts = options).await
}

fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = format!("{operation} failed: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::ServiceError(context) => match context.err().code() {
            Some(code) => classify_code(code, message),
            None => StoreError::Other(message),
        },
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            StoreError::Transport(message)
        }
        SdkError::ConstructionFailure(_) => StoreError::Validation(message),
        _ => StoreError::Other(message),
    }
}

fn classify_code(code: &str, message: String) -> StoreError {
    match code {
        "AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException" => {
            StoreError::Unauthorized(message)
        }
        "ThrottlingException" | "TooManyRequestsException" | "LimitExceededException" => {
            StoreError::Throttled(message)
        }
        "ResourceExistsException" => StoreError::AlreadyExists(message),
        "ResourceNotFoundException" => StoreError::NotFound(message),
        "InvalidParameterException"
        | "InvalidRequestException"
        | "ValidationException"
        | "MalformedPolicyDocumentException"
        | "EncryptionFailure"
        | "DecryptionFailure" => StoreError::Validation(message),
        _ => StoreError::Other(message),
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
