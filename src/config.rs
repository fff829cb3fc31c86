//! Deployment configuration.
//!
//! The storefront runs in one of two modes: "configured" (remote backend
//! URL and access key both present) or "unconfigured" (local fallback
//! store). Services hold a [`SettingsHandle`] and take a fresh snapshot on
//! every call, so changing the handle switches backends for the very next
//! operation.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::storage;

pub const DEFAULT_STORAGE_BUCKET: &str = "order-images";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Connection parameters for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub url: String,
    pub anon_key: String,
    pub storage_bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub storage_bucket: String,
    /// Base URL of the generative content endpoints (`/concept`, `/image`, `/chat`).
    pub api_base_url: String,
    pub data_dir: PathBuf,
    /// bcrypt hash of the admin dashboard password.
    pub admin_password_hash: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            data_dir: default_data_dir(),
            admin_password_hash: None,
        }
    }
}

fn env_first(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// `$XDG_DATA_HOME` (or `~/.local/share`) joined with the app folder.
pub fn default_data_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                .join(".local")
                .join("share")
        });
    base.join("com.samyra.bakery")
}

impl Settings {
    /// Settings for a deployment with no remote backend.
    pub fn local_only(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Self::default()
        }
    }

    /// Read settings from the environment, falling back to the OS
    /// credential store for the backend connection and admin hash.
    pub fn from_env() -> Self {
        let mut settings = Self::from_env_only();
        if settings.supabase_url.is_none() {
            settings.supabase_url = storage::get_credential(storage::KEY_SUPABASE_URL);
        }
        if settings.supabase_anon_key.is_none() {
            settings.supabase_anon_key = storage::get_credential(storage::KEY_SUPABASE_ANON_KEY);
        }
        if settings.admin_password_hash.is_none() {
            settings.admin_password_hash =
                storage::get_credential(storage::KEY_ADMIN_PASSWORD_HASH);
        }
        settings
    }

    /// Environment only, without touching the OS credential store.
    pub fn from_env_only() -> Self {
        let settings = Self {
            supabase_url: env_first(&["SUPABASE_URL", "VITE_SUPABASE_URL"]),
            supabase_anon_key: env_first(&["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"]),
            storage_bucket: env_first(&["SAMYRA_STORAGE_BUCKET"])
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
            api_base_url: env_first(&["SAMYRA_API_URL", "VITE_API_URL"])
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            data_dir: env_first(&["SAMYRA_DATA_DIR"])
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            admin_password_hash: env_first(&["SAMYRA_ADMIN_PASSWORD_HASH"]),
        };
        if settings.supabase_url.is_some() != settings.supabase_anon_key.is_some() {
            warn!("only one of the remote backend URL / access key is set, using local store");
        }
        settings
    }

    /// Remote connection when both the URL and the key are non-empty.
    pub fn remote(&self) -> Option<RemoteCredentials> {
        let url = self.supabase_url.as_deref().map(str::trim).unwrap_or("");
        let key = self.supabase_anon_key.as_deref().map(str::trim).unwrap_or("");
        if url.is_empty() || key.is_empty() {
            return None;
        }
        Some(RemoteCredentials {
            url: url.to_string(),
            anon_key: key.to_string(),
            storage_bucket: self.storage_bucket.clone(),
        })
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote().is_some()
    }
}

/// Shared, updatable settings injected into the services.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Current settings. A poisoned lock still yields the last value.
    pub fn snapshot(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Mutate the settings in place; takes effect on the next service call.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
        debug!(remote = guard.is_remote_configured(), "settings updated");
    }

    pub fn remote(&self) -> Option<RemoteCredentials> {
        self.snapshot().remote()
    }
}
