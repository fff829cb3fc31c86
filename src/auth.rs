//! Customer identity helpers and the admin password gate.
//!
//! Customer accounts come from the hosted auth provider; this module only
//! consumes the user record. Orders are not owned by accounts: a signed-in
//! customer sees orders through a phone number linked to their user id.
//!
//! The admin dashboard is guarded by a single bcrypt-hashed password with
//! a lockout after repeated failures. Lockout state is persisted in the
//! local key-value store so it survives restarts.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{AuthError, StoreError};
use crate::local_store::KeyValueStore;

const MAX_FAILED_ATTEMPTS: u32 = 5;
const LOCKOUT_MINUTES: i64 = 15;
const LOCKOUT_ATTEMPTS_KEY: &str = "admin_lockout_attempts";
const LOCKOUT_LAST_ATTEMPT_KEY: &str = "admin_lockout_last_attempt";
const PHONE_LINK_PREFIX: &str = "user_phone_";

// ---------------------------------------------------------------------------
// Customer identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Signed-in customer as reported by the auth provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl AuthUser {
    /// Full name, then email, then phone, then `"User"`.
    pub fn display_name(&self) -> &str {
        non_blank(&self.user_metadata.full_name)
            .or_else(|| non_blank(&self.email))
            .or_else(|| non_blank(&self.phone))
            .unwrap_or("User")
    }
}

/// Phone numbers customers typed in to see their orders, keyed by user id.
#[derive(Clone)]
pub struct PhoneLinks {
    store: Arc<dyn KeyValueStore>,
}

impl PhoneLinks {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str) -> String {
        format!("{PHONE_LINK_PREFIX}{user_id}")
    }

    /// Remember `phone` for `user_id`. Blank input is ignored and returns
    /// `Ok(None)`.
    pub fn link_phone(&self, user_id: &str, phone: &str) -> Result<Option<String>, StoreError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Ok(None);
        }
        self.store.write_raw(&Self::key(user_id), phone)?;
        info!(user_id, "phone linked to account");
        Ok(Some(phone.to_string()))
    }

    pub fn stored_phone(&self, user_id: &str) -> Option<String> {
        self.store
            .read_raw(&Self::key(user_id))
            .filter(|p| !p.trim().is_empty())
    }

    /// Account phone, then metadata phone, then the stored link.
    pub fn linked_phone(&self, user: &AuthUser) -> Option<String> {
        non_blank(&user.phone)
            .or_else(|| non_blank(&user.user_metadata.phone))
            .map(str::to_string)
            .or_else(|| self.stored_phone(&user.id))
    }
}

// ---------------------------------------------------------------------------
// Admin gate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct LockoutEntry {
    attempts: u32,
    last_attempt: DateTime<Utc>,
}

fn check_lockout(lockout: &LockoutEntry, now: DateTime<Utc>) -> Result<(), AuthError> {
    if lockout.attempts >= MAX_FAILED_ATTEMPTS {
        let elapsed = now - lockout.last_attempt;
        if elapsed < Duration::minutes(LOCKOUT_MINUTES) {
            return Err(AuthError::LockedOut(LOCKOUT_MINUTES - elapsed.num_minutes()));
        }
    }
    Ok(())
}

/// Hash a new admin password for storage.
pub fn hash_password(password: &str) -> Result<String, String> {
    let password = Zeroizing::new(password.to_string());
    if password.trim().is_empty() {
        return Err("Password is required".into());
    }
    bcrypt::hash(password.as_str(), bcrypt::DEFAULT_COST)
        .map_err(|e| format!("Failed to hash password: {e}"))
}

/// Password check for the owner dashboard. Failure counts live in the
/// key-value store, so every gate over the same store shares one lockout.
pub struct AdminGate {
    password_hash: Option<String>,
    store: Arc<dyn KeyValueStore>,
}

impl AdminGate {
    pub fn new(password_hash: Option<String>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            password_hash: password_hash.filter(|h| !h.trim().is_empty()),
            store,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.password_hash.is_some()
    }

    fn load_lockout(&self) -> LockoutEntry {
        let attempts = self
            .store
            .read_raw(LOCKOUT_ATTEMPTS_KEY)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let last_attempt = self
            .store
            .read_raw(LOCKOUT_LAST_ATTEMPT_KEY)
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);
        LockoutEntry {
            attempts,
            last_attempt,
        }
    }

    fn persist_lockout(&self, lockout: &LockoutEntry) {
        let attempts = self
            .store
            .write_raw(LOCKOUT_ATTEMPTS_KEY, &lockout.attempts.to_string());
        let last = self
            .store
            .write_raw(LOCKOUT_LAST_ATTEMPT_KEY, &lockout.last_attempt.to_rfc3339());
        if let Err(e) = attempts.and(last) {
            warn!(error = %e, "failed to persist admin lockout state");
        }
    }

    fn clear_lockout(&self) {
        for key in [LOCKOUT_ATTEMPTS_KEY, LOCKOUT_LAST_ATTEMPT_KEY] {
            if let Err(e) = self.store.remove_raw(key) {
                warn!(key, error = %e, "failed to clear admin lockout state");
            }
        }
    }

    /// Check `password` against the stored hash.
    pub fn verify(&self, password: &str) -> Result<(), AuthError> {
        let password = Zeroizing::new(password.to_string());
        let Some(hash) = self.password_hash.as_deref() else {
            return Err(AuthError::NotConfigured);
        };

        let mut lockout = self.load_lockout();
        check_lockout(&lockout, Utc::now())?;

        if bcrypt::verify(password.as_str(), hash).unwrap_or(false) {
            if lockout.attempts > 0 {
                self.clear_lockout();
            }
            info!("admin login successful");
            return Ok(());
        }

        lockout.attempts += 1;
        lockout.last_attempt = Utc::now();
        self.persist_lockout(&lockout);
        warn!(attempts = lockout.attempts, "failed admin login attempt");
        Err(AuthError::InvalidPassword)
    }

    pub fn failed_attempts(&self) -> u32 {
        self.load_lockout().attempts
    }
}
