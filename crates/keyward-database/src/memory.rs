//! In-process implementation of every repository trait.
//!
//! All state sits behind one `tokio::sync::Mutex`, so each repository call
//! is a single critical section and multi-row operations are as atomic as
//! their SQL counterparts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_entity::sanction::{NewSanction, Sanction};
use keyward_entity::session::{DeviceInfo, RevokedReason, Session};
use keyward_entity::two_factor::TwoFactorSecurity;
use keyward_entity::user::{CreateUser, User, UserStatus};

use crate::repositories::{
    SanctionRepository, SessionRepository, TwoFactorRepository, UserRepository,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    two_factor: HashMap<Uuid, TwoFactorSecurity>,
    sanctions: Vec<Sanction>,
}

impl State {
    fn active_sessions_sorted(&self, user_id: Uuid) -> Vec<&Session> {
        let mut sessions: Vec<&Session> = self
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.revoked)
            .collect();
        sessions.sort_by(|a, b| {
            b.last_used_at
                .cmp(&a.last_used_at)
                .then(b.created_at.cmp(&a.created_at))
                .then(b.id.cmp(&a.id))
        });
        sessions
    }

    fn revoke_ids(
        &mut self,
        ids: &[Uuid],
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> Vec<Session> {
        let mut revoked = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.sessions.get_mut(id) {
                session.revoked = true;
                session.revoked_reason = Some(reason);
                session.revoked_at = Some(now);
                revoked.push(session.clone());
            }
        }
        revoked
    }
}

/// In-memory durable store for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a `Database` error until
    /// switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::database("Store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        self.check_available()?;
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create(&self, input: CreateUser, now: DateTime<Utc>) -> AppResult<User> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(AppError::conflict("Email already registered"));
        }
        let user = User {
            id: Uuid::now_v7(),
            email: input.email,
            password_hash: input.password_hash,
            role: input.role,
            status: UserStatus::Active,
            blocked_until: None,
            two_factor_enabled: input.two_factor_enabled,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list(&self, limit: i64) -> AppResult<Vec<User>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn upsert(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        device: &DeviceInfo,
        now: DateTime<Utc>,
    ) -> AppResult<Session> {
        self.check_available()?;
        let key = device.session_key();
        let mut state = self.state.lock().await;

        let existing = state
            .sessions
            .values_mut()
            .find(|s| s.user_id == user_id && s.device_key == key);

        if let Some(session) = existing {
            session.refresh_token = refresh_token.to_string();
            session.device_id = device.device_id.clone();
            session.device_type = device.device_type.clone();
            session.device_model = device.device_model.clone();
            session.os = device.os.clone();
            session.os_version = device.os_version.clone();
            session.ip_address = device.ip.clone();
            session.revoked = false;
            session.revoked_reason = None;
            session.revoked_at = None;
            session.last_used_at = now;
            return Ok(session.clone());
        }

        let session = Session {
            id: Uuid::now_v7(),
            user_id,
            refresh_token: refresh_token.to_string(),
            device_key: key,
            device_id: device.device_id.clone(),
            device_type: device.device_type.clone(),
            device_model: device.device_model.clone(),
            os: device.os.clone(),
            os_version: device.os_version.clone(),
            ip_address: device.ip.clone(),
            revoked: false,
            revoked_reason: None,
            revoked_at: None,
            created_at: now,
            last_used_at: now,
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Session>> {
        self.check_available()?;
        Ok(self.state.lock().await.sessions.get(&id).cloned())
    }

    async fn find_by_refresh_token(&self, refresh_token: &str) -> AppResult<Option<Session>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.refresh_token == refresh_token)
            .cloned())
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .active_sessions_sorted(user_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_all_by_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut sessions: Vec<Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(sessions)
    }

    async fn count_active_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.revoked)
            .count() as i64)
    }

    async fn revoke_excess(
        &self,
        user_id: Uuid,
        keep: u32,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let excess: Vec<Uuid> = state
            .active_sessions_sorted(user_id)
            .into_iter()
            .skip(keep as usize)
            .map(|s| s.id)
            .collect();
        Ok(state.revoke_ids(&excess, reason, now))
    }

    async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        except: Option<Uuid>,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let targets: Vec<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && !s.revoked && Some(s.id) != except)
            .map(|s| s.id)
            .collect();
        Ok(state.revoke_ids(&targets, reason, now))
    }

    async fn revoke(
        &self,
        session_id: Uuid,
        reason: RevokedReason,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Session>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let Some(session) = state.sessions.get_mut(&session_id) else {
            return Ok(None);
        };
        if !session.revoked {
            session.revoked = true;
            session.revoked_reason = Some(reason);
            session.revoked_at = Some(now);
        }
        Ok(Some(session.clone()))
    }

    async fn rotate_refresh_token(
        &self,
        session_id: Uuid,
        old_token: &str,
        new_token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&session_id) {
            Some(session) if !session.revoked && session.refresh_token == old_token => {
                session.refresh_token = new_token.to_string();
                session.last_used_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let ids: Vec<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.sessions.remove(id))
            .collect())
    }

    async fn delete_revoked_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Session>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let ids: Vec<Uuid> = state
            .sessions
            .values()
            .filter(|s| s.revoked && s.revoked_at.unwrap_or(s.last_used_at) < cutoff)
            .map(|s| s.id)
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| state.sessions.remove(id))
            .collect())
    }
}

#[async_trait]
impl TwoFactorRepository for MemoryStore {
    async fn find(&self, user_id: Uuid) -> AppResult<Option<TwoFactorSecurity>> {
        self.check_available()?;
        Ok(self.state.lock().await.two_factor.get(&user_id).cloned())
    }

    async fn store_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<TwoFactorSecurity> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let record = TwoFactorSecurity {
            user_id,
            code_hash: Some(code_hash.to_string()),
            code_expires_at: Some(expires_at),
            attempts: 0,
            updated_at: now,
        };
        state.two_factor.insert(user_id, record.clone());
        Ok(record)
    }

    async fn increment_attempts(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<i32>> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        match state.two_factor.get_mut(&user_id) {
            Some(record) if record.code_hash.is_some() => {
                record.attempts += 1;
                record.updated_at = now;
                Ok(Some(record.attempts))
            }
            _ => Ok(None),
        }
    }

    async fn consume_code(
        &self,
        user_id: Uuid,
        code_hash: &str,
        now: DateTime<Utc>,
        max_attempts: i32,
    ) -> AppResult<bool> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let Some(record) = state.two_factor.get_mut(&user_id) else {
            return Ok(false);
        };
        let matches = record.code_hash.as_deref() == Some(code_hash)
            && !record.is_expired(now)
            && !record.is_locked(max_attempts);
        if matches {
            record.code_hash = None;
            record.code_expires_at = None;
            record.attempts = 0;
            record.updated_at = now;
        }
        Ok(matches)
    }

    async fn clear_code(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if let Some(record) = state.two_factor.get_mut(&user_id) {
            record.code_hash = None;
            record.code_expires_at = None;
            record.attempts = 0;
            record.updated_at = now;
        }
        Ok(())
    }
}

#[async_trait]
impl SanctionRepository for MemoryStore {
    async fn block_user(&self, sanction: NewSanction, now: DateTime<Utc>) -> AppResult<Sanction> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let Some(user) = state.users.get_mut(&sanction.user_id) else {
            return Err(AppError::not_found("User not found"));
        };
        user.status = UserStatus::Blocked;
        user.blocked_until = Some(sanction.expires_at);
        user.updated_at = now;

        for prior in state
            .sanctions
            .iter_mut()
            .filter(|s| s.user_id == sanction.user_id)
        {
            prior.active = false;
        }

        let created = Sanction {
            id: Uuid::now_v7(),
            user_id: sanction.user_id,
            admin_id: sanction.admin_id,
            reason: sanction.reason,
            active: true,
            created_at: now,
            expires_at: sanction.expires_at,
        };
        state.sanctions.push(created.clone());
        Ok(created)
    }

    async fn unblock_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        for sanction in state.sanctions.iter_mut().filter(|s| s.user_id == user_id) {
            sanction.active = false;
        }
        match state.users.get_mut(&user_id) {
            Some(user) => {
                user.status = UserStatus::Active;
                user.blocked_until = None;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_active(&self, user_id: Uuid) -> AppResult<Option<Sanction>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .sanctions
            .iter()
            .find(|s| s.user_id == user_id && s.active)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Sanction>> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut sanctions: Vec<Sanction> = state
            .sanctions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sanctions.reverse();
        Ok(sanctions)
    }

    async fn find_expired_blocks(&self, now: DateTime<Utc>) -> AppResult<Vec<Uuid>> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.block_has_lapsed(now))
            .map(|u| u.id)
            .collect())
    }
}
