#![allow(dead_code)]

use async_trait::async_trait;
use greentic_keyring_core::InMemorySecretStore;
use greentic_keyring_spec::{
    CreateSecretRequest, ListSecretsPage, ListSecretsRequest, SecretStore, StoreError, StoreResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

/// Wraps an in-memory store, counting calls and failing on demand.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemorySecretStore,
    failing_gets: HashSet<String>,
    list_failure: Option<StoreError>,
    create_failure: Option<StoreError>,
    list_calls: Mutex<Vec<Option<String>>>,
    get_calls: Mutex<HashMap<String, usize>>,
    created: Mutex<Vec<CreateSecretRequest>>,
}

impl FaultyStore {
    pub fn new(inner: InMemorySecretStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_get(mut self, name: &str) -> Self {
        self.failing_gets.insert(name.to_owned());
        self
    }

    pub fn fail_list(mut self, err: StoreError) -> Self {
        self.list_failure = Some(err);
        self
    }

    pub fn fail_create(mut self, err: StoreError) -> Self {
        self.create_failure = Some(err);
        self
    }

    pub fn list_tokens(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn get_counts(&self) -> HashMap<String, usize> {
        self.get_calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CreateSecretRequest> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for FaultyStore {
    async fn list_secrets(&self, request: ListSecretsRequest) -> StoreResult<ListSecretsPage> {
        self.list_calls
            .lock()
            .unwrap()
            .push(request.next_token.clone());
        if let Some(err) = &self.list_failure {
            return Err(err.clone());
        }
        self.inner.list_secrets(request).await
    }

    async fn get_secret_value(&self, name: &str) -> StoreResult<String> {
        *self
            .get_calls
            .lock()
            .unwrap()
            .entry(name.to_owned())
            .or_default() += 1;
        if self.failing_gets.contains(name) {
            return Err(StoreError::Unauthorized(format!("no access to {name}")));
        }
        self.inner.get_secret_value(name).await
    }

    async fn create_secret(&self, request: CreateSecretRequest) -> StoreResult<()> {
        self.created.lock().unwrap().push(request.clone());
        if let Some(err) = &self.create_failure {
            return Err(err.clone());
        }
        self.inner.create_secret(request).await
    }
}

/// A log event captured by [`CaptureLayer`].
#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct Logs(Arc<Mutex<Vec<Captured>>>);

impl Logs {
    pub fn events(&self) -> Vec<Captured> {
        self.0.lock().unwrap().clone()
    }

    pub fn at(&self, level: Level) -> Vec<Captured> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }
}

struct CaptureLayer(Logs);

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.insert(field.name().to_owned(), value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_owned(), rendered);
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.0.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// A dispatch recording every event it receives.
pub fn capture() -> (Dispatch, Logs) {
    let logs = Logs::default();
    let subscriber = Registry::default().with(CaptureLayer(logs.clone()));
    (Dispatch::new(subscriber), logs)
}
