//! Signup orchestration: sanitize, validate, check uniqueness, hash, persist.
//!
//! Validation failures (including a duplicate email) come back as
//! `Ok(Registration)` with messages for the user. Store and hashing failures come
//! back as `Err(RegisterError)`: a failed lookup is never mistaken for "no such
//! user" and a failed insert is never reported as a successful signup.

use crate::registration::{
    guard::EmailGuard,
    password::{hash_password_blocking, HashError},
    payload::{check, FieldCheck, RawPayload, ValidationError},
    store::{StoreError, UserRecord, UserStore},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Outcome of one signup attempt that did not hit an infrastructure error.
#[derive(Debug, Default)]
pub struct Registration {
    pub errors: Vec<ValidationError>,
    pub created: Option<UserRecord>,
}

impl Registration {
    fn rejected(errors: Vec<ValidationError>) -> Self {
        Self {
            errors,
            created: None,
        }
    }

    fn created(record: UserRecord) -> Self {
        Self {
            errors: Vec::new(),
            created: Some(record),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("could not check for an existing user: {0}")]
    Lookup(#[source] StoreError),
    #[error("could not hash password: {0}")]
    Hash(#[from] HashError),
    #[error("could not persist user: {0}")]
    Persist(#[source] StoreError),
}

pub struct Registrar {
    store: Arc<dyn UserStore>,
    guard: Option<EmailGuard>,
}

impl Registrar {
    /// Registrar without the per-email guard: concurrent signups for the same
    /// email may both be persisted.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store, guard: None }
    }

    /// Serialize attempts for the same normalized email within this process.
    #[must_use]
    pub fn with_email_guard(mut self) -> Self {
        self.guard = Some(EmailGuard::new());
        self
    }

    #[must_use]
    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Run one signup attempt for a raw submitted body.
    ///
    /// # Errors
    /// Returns `RegisterError` when the store lookup, the password hashing or the
    /// insert fails. Nothing is persisted in the first two cases.
    #[instrument(skip(self, raw), fields(guarded = self.guard.is_some()))]
    pub async fn register(&self, raw: &RawPayload) -> Result<Registration, RegisterError> {
        let FieldCheck { payload, errors } = check(raw);
        if !errors.is_empty() {
            debug!(errors = errors.len(), "signup rejected by field validation");
            return Ok(Registration::rejected(errors));
        }

        let (email, password) = payload.into_parts();

        let _lease = match &self.guard {
            Some(guard) => Some(guard.lock(&email).await),
            None => None,
        };

        match self.store.find_by_email(&email).await {
            Ok(Some(_)) => {
                debug!("signup rejected: email already registered");
                return Ok(Registration::rejected(vec![ValidationError::AlreadyExists]));
            }
            Ok(None) => (),
            Err(err) => {
                error!("Error checking if user exists: {err}");
                return Err(RegisterError::Lookup(err));
            }
        }

        let password_hash = hash_password_blocking(password).await.map_err(|err| {
            error!("Error hashing password: {err}");
            err
        })?;

        let created = self
            .store
            .create(UserRecord::new(email, password_hash))
            .await
            .map_err(|err| {
                error!("Error inserting user: {err}");
                RegisterError::Persist(err)
            })?;

        info!(user_id = %created.id, "user registered");

        Ok(Registration::created(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{password::verify_password, store::MemoryUserStore};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn raw(value: Value) -> RawPayload {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[derive(Default)]
    struct FailingStore {
        fail_lookup: bool,
        lookups: AtomicUsize,
        inserts: AtomicUsize,
    }

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<UserRecord>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookup {
                return Err(StoreError::Unavailable("lookup".to_string()));
            }
            Ok(None)
        }

        async fn create(&self, _record: UserRecord) -> Result<UserRecord, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("insert".to_string()))
        }
    }

    #[tokio::test]
    async fn field_errors_skip_the_store() {
        let store = Arc::new(FailingStore::default());
        let registrar = Registrar::new(store.clone());

        let outcome = registrar
            .register(&raw(json!({"email": "not-an-email", "password": "ab"})))
            .await;

        let Ok(outcome) = outcome else {
            panic!("field validation must not fail the workflow");
        };
        assert_eq!(
            outcome.errors,
            vec![ValidationError::InvalidEmail, ValidationError::PasswordLength]
        );
        assert!(outcome.created.is_none());
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_without_insert() {
        let store = Arc::new(MemoryUserStore::with_users([UserRecord::new(
            "a@b.com", "existing",
        )]));
        let registrar = Registrar::new(store.clone());

        let outcome = registrar
            .register(&raw(json!({"email": "a@b.com", "password": "abc"})))
            .await;

        assert!(matches!(
            outcome,
            Ok(Registration { ref errors, created: None }) if errors == &[ValidationError::AlreadyExists]
        ));
        assert_eq!(store.count_email("a@b.com").await, 1);
    }

    #[tokio::test]
    async fn successful_signup_stores_a_hash() {
        let store = Arc::new(MemoryUserStore::new());
        let registrar = Registrar::new(store.clone());

        let outcome = registrar
            .register(&raw(json!({"email": "new@b.com", "password": "abc123", "role": "admin"})))
            .await;

        let Ok(outcome) = outcome else {
            panic!("signup should succeed");
        };
        assert!(outcome.is_success());
        let Some(created) = outcome.created else {
            panic!("record should be created");
        };
        assert_eq!(created.email, "new@b.com");
        assert_ne!(created.password_hash, "abc123");
        assert!(verify_password("abc123", &created.password_hash));
        assert_eq!(store.records().await, vec![created]);
    }

    #[tokio::test]
    async fn lookup_failure_is_fatal() {
        let store = Arc::new(FailingStore {
            fail_lookup: true,
            ..FailingStore::default()
        });
        let registrar = Registrar::new(store.clone());

        let outcome = registrar
            .register(&raw(json!({"email": "a@b.com", "password": "abc"})))
            .await;

        assert!(matches!(outcome, Err(RegisterError::Lookup(_))));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insert_failure_is_not_reported_as_success() {
        let store = Arc::new(FailingStore::default());
        let registrar = Registrar::new(store.clone()).with_email_guard();

        let outcome = registrar
            .register(&raw(json!({"email": "a@b.com", "password": "abc"})))
            .await;

        assert!(matches!(outcome, Err(RegisterError::Persist(_))));
        assert_eq!(store.inserts.load(Ordering::SeqCst), 1);
    }
}
