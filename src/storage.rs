//! Backend credentials in the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. Environment variables take
//! precedence; the keyring is where an operator stores the Supabase key
//! for a long-running install.

use keyring::Entry;
use tracing::{info, warn};

const SERVICE_NAME: &str = "samyra-bakery";

pub const KEY_SUPABASE_URL: &str = "supabase_url";
pub const KEY_SUPABASE_ANON_KEY: &str = "supabase_anon_key";
pub const KEY_ADMIN_PASSWORD_HASH: &str = "admin_password_hash";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[
    KEY_SUPABASE_URL,
    KEY_SUPABASE_ANON_KEY,
    KEY_ADMIN_PASSWORD_HASH,
];

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Whether a non-blank value is stored under `key`.
pub fn has_credential(key: &str) -> bool {
    get_credential(key).is_some_and(|v| !v.trim().is_empty())
}

/// Save the remote backend connection for later runs.
pub fn store_remote_credentials(url: &str, anon_key: &str) -> Result<(), String> {
    let url = url.trim();
    let anon_key = anon_key.trim();
    if url.is_empty() || anon_key.is_empty() {
        return Err("Both the backend URL and the access key are required".into());
    }
    set_credential(KEY_SUPABASE_URL, url)?;
    set_credential(KEY_SUPABASE_ANON_KEY, anon_key)?;
    info!("remote backend credentials stored");
    Ok(())
}

/// Delete every stored credential; the next run falls back to local mode.
pub fn factory_reset() -> Result<(), String> {
    info!("performing factory reset, deleting all credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_unknown_key_is_not_stored() {
        assert!(!has_credential("samyra_test_never_written"));
        assert!(get_credential("samyra_test_never_written").is_none());
    }

    #[test]
    fn test_store_remote_credentials_rejects_blank_values() {
        assert!(store_remote_credentials("", "key").is_err());
        assert!(store_remote_credentials("https://x.supabase.co", "   ").is_err());
    }
}
