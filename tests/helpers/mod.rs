//! Shared test helpers for scenario tests.
//!
//! Every scenario runs the whole engine over in-process stores and a
//! manual clock, so no external services are needed.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use keyward_auth::{AuthEngine, AuthenticatedSession, EngineDeps, LoginOutcome};
use keyward_cache::memory::MemoryCacheProvider;
use keyward_core::config::{AppConfig, MemoryCacheConfig};
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::{CacheProvider, Clock, CredentialVerifier, ManualClock, Notifier};
use keyward_database::MemoryStore;
use keyward_database::repositories::UserRepository;
use keyward_entity::session::DeviceInfo;
use keyward_entity::user::{CreateUser, User, UserRole};

/// Test application context
pub struct TestApp {
    /// The assembled engine
    pub engine: AuthEngine,
    /// Durable store, for direct inspection
    pub store: Arc<MemoryStore>,
    /// Ephemeral store the engine writes to
    pub cache: Arc<dyn CacheProvider>,
    /// Engine clock
    pub clock: Arc<ManualClock>,
    /// Captures outbound notifications
    pub notifier: Arc<CapturingNotifier>,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Engine with default settings and a healthy cache
    pub fn new() -> Self {
        Self::build(test_config(), None)
    }

    /// Engine with a tweaked configuration
    pub fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = test_config();
        configure(&mut config);
        Self::build(config, None)
    }

    /// Engine over a specific cache
    pub fn with_cache(cache: Arc<dyn CacheProvider>) -> Self {
        Self::build(test_config(), Some(cache))
    }

    fn build(config: AppConfig, cache: Option<Arc<dyn CacheProvider>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let cache = cache.unwrap_or_else(|| {
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()))
        });
        let notifier = Arc::new(CapturingNotifier::default());

        let mut deps = EngineDeps::with_store(store.clone(), cache.clone(), clock.clone());
        deps.credentials = Arc::new(PlainVerifier);
        deps.notifier = notifier.clone();

        Self {
            engine: AuthEngine::new(&config, deps),
            store,
            cache,
            clock,
            notifier,
            config,
        }
    }

    /// Register a user whose password is `password`
    pub async fn create_user(&self, email: &str, password: &str, role: UserRole) -> User {
        self.insert_user(email, password, role, false).await
    }

    /// Register a user who must confirm an emailed code at login
    pub async fn create_two_factor_user(&self, email: &str, password: &str) -> User {
        self.insert_user(email, password, UserRole::User, true).await
    }

    async fn insert_user(&self, email: &str, password: &str, role: UserRole, two_factor: bool) -> User {
        UserRepository::create(
            self.store.as_ref(),
            CreateUser {
                email: email.to_string(),
                password_hash: PlainVerifier::hash(password),
                role,
                two_factor_enabled: two_factor,
            },
            self.clock.now(),
        )
        .await
        .expect("Failed to create test user")
    }

    /// Log in without 2FA and return the session
    pub async fn login(&self, email: &str, password: &str, device: &DeviceInfo) -> AuthenticatedSession {
        match self
            .engine
            .auth
            .login(email, password, device)
            .await
            .expect("Login failed")
        {
            LoginOutcome::Authenticated(session) => *session,
            other => panic!("Expected a session, got {other:?}"),
        }
    }

    /// Advance the engine clock
    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }
}

/// Configuration with valid secrets and otherwise default values
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.access_token_secret = "test-access-secret".into();
    config.auth.refresh_token_secret = "test-refresh-secret".into();
    config.two_factor.code_pepper = "test-pepper".into();
    config
}

/// A device identified by a client-supplied id
pub fn device(id: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: Some(id.to_string()),
        device_type: Some("mobile".into()),
        ..DeviceInfo::default()
    }
}

/// A device with no id, identified by its fingerprint
pub fn fingerprint(device_type: &str, model: &str, ip: &str) -> DeviceInfo {
    DeviceInfo {
        device_type: Some(device_type.into()),
        device_model: Some(model.into()),
        ip: Some(ip.into()),
        ..DeviceInfo::default()
    }
}

/// Credential verifier that stores passwords with a marker prefix
#[derive(Debug)]
pub struct PlainVerifier;

impl PlainVerifier {
    pub fn hash(password: &str) -> String {
        format!("plain:{password}")
    }
}

impl CredentialVerifier for PlainVerifier {
    fn verify(&self, plaintext: &str, hash: &str) -> bool {
        hash.strip_prefix("plain:") == Some(plaintext)
    }
}

/// Notifier that keeps everything it was asked to send
#[derive(Debug, Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<(String, String, Value)>>,
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send(&self, destination: &str, template_id: &str, data: Value) -> AppResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((destination.to_string(), template_id.to_string(), data));
        Ok(())
    }
}

impl CapturingNotifier {
    /// The first code sent to `destination`
    pub async fn first_code_for(&self, destination: &str) -> String {
        self.nth_code_for(destination, 1).await
    }

    /// The `n`th code (1-based) sent to `destination`, waiting briefly for
    /// the detached delivery task
    pub async fn nth_code_for(&self, destination: &str, n: usize) -> String {
        for _ in 0..100 {
            let found = self
                .sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(to, _, _)| to == destination)
                .nth(n - 1)
                .and_then(|(_, _, data)| data["code"].as_str().map(str::to_string));
            if let Some(code) = found {
                return code;
            }
            tokio::task::yield_now().await;
        }
        panic!("Code #{n} never sent to {destination}");
    }
}

/// Cache that fails the first `failures` calls, then delegates
#[derive(Debug)]
pub struct FlakyCache {
    inner: MemoryCacheProvider,
    remaining_failures: AtomicU32,
    calls: AtomicU32,
    expire_broken: AtomicBool,
}

impl FlakyCache {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryCacheProvider::new(&MemoryCacheConfig::default()),
            remaining_failures: AtomicU32::new(failures),
            calls: AtomicU32::new(0),
            expire_broken: AtomicBool::new(false),
        }
    }

    /// A cache that never recovers
    pub fn down() -> Self {
        Self::new(u32::MAX)
    }

    /// Total calls seen, failed or not
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` calls fail
    pub fn fail_next(&self, n: u32) {
        self.remaining_failures.store(n, Ordering::SeqCst);
    }

    /// Make every standalone `expire` call fail from now on
    pub fn break_expire(&self) {
        self.expire_broken.store(true, Ordering::SeqCst);
    }

    fn gate(&self) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(AppError::cache("injected cache failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CacheProvider for FlakyCache {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.gate()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.gate()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.gate()?;
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.gate()?;
        self.inner.exists(key).await
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        self.gate()?;
        self.inner.set_nx(key, value, ttl).await
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        self.gate()?;
        self.inner.incr(key).await
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> AppResult<i64> {
        self.gate()?;
        self.inner.incr_with_ttl(key, ttl).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> AppResult<bool> {
        self.gate()?;
        if self.expire_broken.load(Ordering::SeqCst) {
            return Err(AppError::cache("injected expire failure"));
        }
        self.inner.expire(key, ttl).await
    }

    async fn set_many(&self, entries: &[(String, String, Duration)]) -> AppResult<()> {
        self.gate()?;
        self.inner.set_many(entries).await
    }

    async fn delete_many(&self, keys: &[String]) -> AppResult<u64> {
        self.gate()?;
        self.inner.delete_many(keys).await
    }

    async fn exists_any(&self, keys: &[String]) -> AppResult<bool> {
        self.gate()?;
        self.inner.exists_any(keys).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.gate()?;
        self.inner.health_check().await
    }
}

/// Random unique email, so tests sharing helpers never collide
pub fn email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}
