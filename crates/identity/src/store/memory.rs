//! In-memory reference backends.
//!
//! These back the collaborator traits for tests, development and the
//! bundled seeder binary. The directory materializes realistic secret
//! material (API key, Ed25519 private-key JWK, OAuth client secret) and a
//! DID document on create, the way the platform does.
//!
//! All backends are cheaply cloneable; clones share the same underlying
//! state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::alias::{self, SecretKind};
use crate::document::{DidDocument, VerificationMethod, METHOD_TYPE_JSON_WEB_KEY};
use crate::error::{Result, SeedError};
use crate::jwk::Jwk;
use crate::manifest::IdentityManifest;

use super::{
    CreateOutcome, CreatedIdentity, DocumentStore, IdentityDirectory, IdentityRecord,
    LifecycleState, SecretStore,
};

/// In-memory secret store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySecretStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.secrets.read().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn resolve(&self, alias: &str) -> Result<Option<String>> {
        Ok(self.secrets.read().unwrap().get(alias).cloned())
    }

    async fn store(&self, alias: &str, value: &str) -> Result<()> {
        self.secrets
            .write()
            .unwrap()
            .insert(alias.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory DID document store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<HashMap<String, DidDocument>>>,
    published: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing the directory.
    pub fn insert(&self, document: DidDocument) {
        self.documents
            .write()
            .unwrap()
            .insert(document.identity_id.clone(), document);
    }

    /// Whether a DID has been published.
    pub fn is_published(&self, did: &str) -> bool {
        self.published.read().unwrap().contains(did)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(&self, identity_id: &str) -> Result<Option<DidDocument>> {
        Ok(self.documents.read().unwrap().get(identity_id).cloned())
    }

    async fn update(&self, document: &DidDocument) -> Result<()> {
        let mut documents = self.documents.write().unwrap();
        if !documents.contains_key(&document.identity_id) {
            return Err(SeedError::DocumentStore(format!(
                "no document to update for '{}'",
                document.identity_id
            )));
        }
        documents.insert(document.identity_id.clone(), document.clone());
        Ok(())
    }

    async fn publish(&self, did: &str) -> Result<()> {
        let documents = self.documents.read().unwrap();
        if !documents.values().any(|d| d.id == did) {
            return Err(SeedError::DocumentStore(format!(
                "no document to publish for '{did}'"
            )));
        }
        self.published.write().unwrap().insert(did.to_string());
        Ok(())
    }
}

/// In-memory identity directory.
///
/// Creation materializes three secrets into the linked secret store and a
/// DID document into the linked document store. With
/// [`InMemoryDirectory::with_deferred_secrets`] the secrets stay buffered
/// until [`InMemoryDirectory::flush_secrets`] is called, which models the
/// eventual consistency of the real platform.
#[derive(Clone)]
pub struct InMemoryDirectory {
    records: Arc<RwLock<HashMap<String, IdentityRecord>>>,
    pending_secrets: Arc<RwLock<Vec<(String, String)>>>,
    defer_secrets: bool,
    create_calls: Arc<AtomicU32>,
    secrets: InMemorySecretStore,
    documents: InMemoryDocumentStore,
}

impl InMemoryDirectory {
    /// Directory whose created secrets become visible immediately.
    pub fn new(secrets: InMemorySecretStore, documents: InMemoryDocumentStore) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            pending_secrets: Arc::new(RwLock::new(Vec::new())),
            defer_secrets: false,
            create_calls: Arc::new(AtomicU32::new(0)),
            secrets,
            documents,
        }
    }

    /// Directory whose created secrets stay invisible until
    /// [`flush_secrets`](Self::flush_secrets) runs.
    pub fn with_deferred_secrets(
        secrets: InMemorySecretStore,
        documents: InMemoryDocumentStore,
    ) -> Self {
        Self {
            defer_secrets: true,
            ..Self::new(secrets, documents)
        }
    }

    /// Make all buffered secrets visible in the secret store.
    pub async fn flush_secrets(&self) -> Result<()> {
        let pending: Vec<(String, String)> =
            self.pending_secrets.write().unwrap().drain(..).collect();
        for (secret_alias, value) in pending {
            self.secrets.store(&secret_alias, &value).await?;
        }
        Ok(())
    }

    /// How many create calls this directory has served.
    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    async fn materialize(&self, secret_alias: String, value: String) -> Result<()> {
        if self.defer_secrets {
            self.pending_secrets
                .write()
                .unwrap()
                .push((secret_alias, value));
            Ok(())
        } else {
            self.secrets.store(&secret_alias, &value).await
        }
    }

    fn generate_api_key(identity_id: &str) -> String {
        let mut suffix = [0u8; 24];
        OsRng.fill_bytes(&mut suffix);
        format!("{}.{}", STANDARD.encode(identity_id), hex::encode(suffix))
    }

    fn generate_key_pair(key_id: &str) -> (Jwk, Jwk) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let private = Jwk {
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(signing_key.verifying_key().to_bytes()),
            kid: Some(key_id.to_string()),
            d: Some(URL_SAFE_NO_PAD.encode(signing_key.to_bytes())),
            extra: Default::default(),
        };
        let public = private.public_only();
        (private, public)
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn get(&self, identity_id: &str) -> Result<Option<IdentityRecord>> {
        Ok(self.records.read().unwrap().get(identity_id).cloned())
    }

    async fn create(&self, manifest: &IdentityManifest) -> Result<CreateOutcome> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let identity_id = manifest.identity_id.clone();
        let api_key_alias = alias::alias_for(&identity_id, SecretKind::ApiKey);
        {
            let mut records = self.records.write().unwrap();
            if records.contains_key(&identity_id) {
                return Ok(CreateOutcome::Conflict);
            }
            records.insert(
                identity_id.clone(),
                IdentityRecord {
                    identity_id: identity_id.clone(),
                    did: manifest.did.clone(),
                    state: if manifest.active {
                        LifecycleState::Activated
                    } else {
                        LifecycleState::Created
                    },
                    api_key_alias: api_key_alias.clone(),
                },
            );
        }

        let api_key = Self::generate_api_key(&identity_id);
        let (private_jwk, public_jwk) = Self::generate_key_pair(&manifest.key.key_id);
        let mut client_secret = [0u8; 24];
        OsRng.fill_bytes(&mut client_secret);
        let client_secret = hex::encode(client_secret);

        self.materialize(api_key_alias, api_key.clone()).await?;
        self.materialize(
            manifest.key.private_key_alias.clone(),
            private_jwk.to_json()?,
        )
        .await?;
        self.materialize(
            alias::alias_for(&identity_id, SecretKind::StsClientSecret),
            client_secret.clone(),
        )
        .await?;

        let mut document = DidDocument::new(&identity_id, &manifest.did);
        document.service = manifest.service_endpoints.clone();
        document.replace_verification_method(VerificationMethod {
            id: alias::verification_method_id(&identity_id),
            method_type: METHOD_TYPE_JSON_WEB_KEY.to_string(),
            controller: manifest.did.clone(),
            public_key_jwk: public_jwk,
        });
        self.documents.insert(document);

        Ok(CreateOutcome::Created(CreatedIdentity {
            api_key,
            client_id: identity_id,
            client_secret,
        }))
    }
}
