//! Two-factor code service.
//!
//! Per user the code moves `NoCode -> Issued -> {Verified, Expired, Locked}`.
//! Only the hash of a code is stored; the plaintext leaves the process
//! through the notifier and nowhere else.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use keyward_cache::keys;
use keyward_core::config::TwoFactorConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::traits::{CacheProvider, Clock, Notifier};
use keyward_database::repositories::{TwoFactorRepository, UserRepository};
use keyward_entity::user::User;

use super::code;

/// Notifier template for a one-time code.
pub const CODE_TEMPLATE: &str = "two_factor_code";

const ISSUE_WINDOW: Duration = Duration::from_secs(3600);

/// A code that was issued and dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCode {
    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies hashed one-time codes.
#[derive(Clone)]
pub struct TwoFactorService {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn TwoFactorRepository>,
    cache: Arc<dyn CacheProvider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: TwoFactorConfig,
}

impl std::fmt::Debug for TwoFactorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoFactorService")
            .field("code_ttl_minutes", &self.config.code_ttl_minutes)
            .field("max_attempts", &self.config.max_attempts)
            .finish()
    }
}

impl TwoFactorService {
    /// Creates a new service.
    pub fn new(
        users: Arc<dyn UserRepository>,
        codes: Arc<dyn TwoFactorRepository>,
        cache: Arc<dyn CacheProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: TwoFactorConfig,
    ) -> Self {
        Self {
            users,
            codes,
            cache,
            notifier,
            clock,
            config,
        }
    }

    /// Issues a new code, replacing any outstanding one:
    ///
    /// 1. Resolve the user (`BadRequest` if absent)
    /// 2. Enforce the hourly issuance cap
    /// 3. Store the hash and expiry, resetting the attempt counter
    /// 4. Dispatch the plaintext through the notifier (detached)
    /// 5. Clear any resend cooldown marker
    pub async fn issue_code(&self, user_id: Uuid, ttl_minutes: Option<u64>) -> AppResult<IssuedCode> {
        let issued = self.issue(user_id, ttl_minutes).await?;

        if let Err(e) = self.cache.delete(&keys::two_factor_resend(user_id)).await {
            warn!(user_id = %user_id, error = %e, "Failed to clear resend cooldown");
        }
        Ok(issued)
    }

    /// Reissues a code unless the resend cooldown is active.
    pub async fn resend_code(&self, user_id: Uuid) -> AppResult<IssuedCode> {
        let marker = keys::two_factor_resend(user_id);
        let cooldown = Duration::from_secs(self.config.resend_cooldown_seconds);

        if !self.cache.set_nx(&marker, "1", cooldown).await? {
            return Err(AppError::too_many_requests(
                "A code was sent recently, please wait before requesting another",
            ));
        }

        match self.issue(user_id, None).await {
            Ok(issued) => Ok(issued),
            Err(e) => {
                if let Err(clear_err) = self.cache.delete(&marker).await {
                    warn!(user_id = %user_id, error = %clear_err, "Failed to clear resend cooldown");
                }
                Err(e)
            }
        }
    }

    /// Verifies `input` against the outstanding code and consumes it on a
    /// match. Creates no session; the caller chains that step.
    pub async fn verify_code(&self, user_id: Uuid, input: &str) -> AppResult<User> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let record = self
            .codes
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Two-factor record not found"))?;

        let Some(stored_hash) = record.code_hash.as_deref() else {
            return Err(AppError::bad_request("Code not requested"));
        };

        if record.is_locked(self.config.max_attempts) {
            warn!(user_id = %user_id, attempts = record.attempts, "Two-factor attempts exhausted");
            return Err(AppError::too_many_requests(
                "Too many attempts, request a new code",
            ));
        }

        let now = self.clock.now();
        if record.is_expired(now) {
            self.codes.clear_code(user_id, now).await?;
            return Err(AppError::bad_request("Code expired"));
        }

        let candidate = code::hash_code(&self.config.code_pepper, user_id, input);
        if !code::is_well_formed(input) || !code::hashes_match(&candidate, stored_hash) {
            let attempts = self.codes.increment_attempts(user_id, now).await?;
            debug!(user_id = %user_id, attempts = ?attempts, "Wrong two-factor code");
            return Err(AppError::bad_request("Wrong code"));
        }

        if !self
            .codes
            .consume_code(user_id, &candidate, now, self.config.max_attempts)
            .await?
        {
            // Lost a race with a concurrent verification or reissue.
            return Err(AppError::bad_request("Code not requested"));
        }

        info!(user_id = %user_id, "Two-factor code verified");
        Ok(user)
    }

    async fn issue(&self, user_id: Uuid, ttl_minutes: Option<u64>) -> AppResult<IssuedCode> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::bad_request("User does not exist"))?;

        let minutes = ttl_minutes.unwrap_or(self.config.code_ttl_minutes);
        let now = self.clock.now();
        let expires_at = code_deadline(now, minutes)?;

        self.check_issue_rate(user_id).await?;

        let plaintext = code::generate_code();
        let hash = code::hash_code(&self.config.code_pepper, user_id, &plaintext);
        self.codes.store_code(user_id, &hash, expires_at, now).await?;

        self.dispatch(user.email, plaintext, minutes);

        info!(user_id = %user_id, expires_at = %expires_at, "Two-factor code issued");
        Ok(IssuedCode { expires_at })
    }

    async fn check_issue_rate(&self, user_id: Uuid) -> AppResult<()> {
        let key = keys::two_factor_issued(user_id);
        let count = self.cache.incr_with_ttl(&key, ISSUE_WINDOW).await?;
        if count > self.config.max_codes_per_hour {
            warn!(user_id = %user_id, count, "Two-factor issuance rate exceeded");
            return Err(AppError::too_many_requests(
                "Too many codes requested, try again later",
            ));
        }
        Ok(())
    }

    fn dispatch(&self, destination: String, plaintext: String, ttl_minutes: u64) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let data = json!({ "code": plaintext, "expiresInMinutes": ttl_minutes });
            if let Err(e) = notifier.send(&destination, CODE_TEMPLATE, data).await {
                error!(error = %e, "Failed to deliver two-factor code");
            }
        });
    }
}

/// `now + minutes`, or `BadRequest` when that is not a representable time.
fn code_deadline(now: DateTime<Utc>, minutes: u64) -> AppResult<DateTime<Utc>> {
    i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::bad_request(format!("Code lifetime of {minutes} minutes is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keyward_cache::memory::MemoryCacheProvider;
    use keyward_core::config::MemoryCacheConfig;
    use keyward_core::error::ErrorKind;
    use keyward_core::traits::ManualClock;
    use keyward_database::MemoryStore;
    use keyward_entity::user::{CreateUser, UserRole};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send(
            &self,
            destination: &str,
            _template_id: &str,
            data: serde_json::Value,
        ) -> AppResult<()> {
            self.sent.lock().unwrap().push((destination.to_string(), data));
            Ok(())
        }
    }

    impl CapturingNotifier {
        async fn last_code(&self) -> String {
            for _ in 0..100 {
                if let Some((_, data)) = self.sent.lock().unwrap().last() {
                    return data["code"].as_str().unwrap().to_string();
                }
                tokio::task::yield_now().await;
            }
            panic!("no code was sent");
        }
    }

    struct Fixture {
        service: TwoFactorService,
        notifier: Arc<CapturingNotifier>,
        clock: Arc<ManualClock>,
        user: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let user = store
            .create(
                CreateUser {
                    email: "2fa@example.com".into(),
                    password_hash: String::new(),
                    role: UserRole::User,
                    two_factor_enabled: true,
                },
                clock.now(),
            )
            .await
            .unwrap();
        let notifier = Arc::new(CapturingNotifier::default());
        let service = TwoFactorService::new(
            store.clone(),
            store,
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default())),
            notifier.clone(),
            clock.clone(),
            TwoFactorConfig::default(),
        );
        Fixture {
            service,
            notifier,
            clock,
            user,
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify_once() {
        let f = fixture().await;
        f.service.issue_code(f.user.id, None).await.unwrap();
        let code = f.notifier.last_code().await;

        let verified = f.service.verify_code(f.user.id, &code).await.unwrap();
        assert_eq!(verified.id, f.user.id);

        let again = f.service.verify_code(f.user.id, &code).await.unwrap_err();
        assert_eq!(again.kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_issue_for_unknown_user_is_bad_request() {
        let f = fixture().await;
        let err = f.service.issue_code(Uuid::new_v4(), None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn test_verify_without_record_is_not_found() {
        let f = fixture().await;
        let err = f.service.verify_code(f.user.id, "123456").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_expired_code_is_cleared() {
        let f = fixture().await;
        f.service.issue_code(f.user.id, Some(1)).await.unwrap();
        let code = f.notifier.last_code().await;
        f.clock.advance(chrono::Duration::minutes(2));

        let err = f.service.verify_code(f.user.id, &code).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.message, "Code expired");

        let err = f.service.verify_code(f.user.id, &code).await.unwrap_err();
        assert_eq!(err.message, "Code not requested");
    }

    #[tokio::test]
    async fn test_lockout_after_max_attempts() {
        let f = fixture().await;
        f.service.issue_code(f.user.id, None).await.unwrap();
        let code = f.notifier.last_code().await;
        let wrong = if code == "000000" { "000001" } else { "000000" };

        for _ in 0..10 {
            let err = f.service.verify_code(f.user.id, wrong).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::BadRequest);
        }
        let err = f.service.verify_code(f.user.id, &code).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyRequests);
    }

    #[tokio::test]
    async fn test_resend_respects_cooldown() {
        let f = fixture().await;
        f.service.resend_code(f.user.id).await.unwrap();
        let err = f.service.resend_code(f.user.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyRequests);

        // A direct issue clears the cooldown.
        f.service.issue_code(f.user.id, None).await.unwrap();
        f.service.resend_code(f.user.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_hourly_issue_cap() {
        let f = fixture().await;
        for _ in 0..10 {
            f.service.issue_code(f.user.id, None).await.unwrap();
        }
        let err = f.service.issue_code(f.user.id, None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyRequests);
    }

    #[tokio::test]
    async fn test_out_of_range_lifetime_is_rejected() {
        let f = fixture().await;
        for minutes in [u64::MAX, 1 << 50] {
            let err = f.service.issue_code(f.user.id, Some(minutes)).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::BadRequest);
        }

        // Nothing was stored and the hourly budget is untouched.
        let err = f.service.verify_code(f.user.id, "123456").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        for _ in 0..10 {
            f.service.issue_code(f.user.id, None).await.unwrap();
        }
    }

    #[test]
    fn test_code_deadline_bounds() {
        let now = Utc::now();
        assert_eq!(code_deadline(now, 5).unwrap(), now + chrono::Duration::minutes(5));
        assert!(code_deadline(now, u64::MAX).is_err());
        assert!(code_deadline(now, i64::MAX as u64).is_err());
    }
}
