use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::commands::auth::require_admin;
use crate::commands::parse_payload;
use crate::{diagnostics, storage, Storefront};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectPayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "supabase_url")]
    url: String,
    #[serde(alias = "anon_key", alias = "supabaseAnonKey")]
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct AdminPayload {
    #[serde(default)]
    password: Option<String>,
}

pub fn get_about_info() -> Value {
    diagnostics::about_info()
}

/// Runtime status plus which values are saved in the OS credential store.
pub fn get_status(sf: &Storefront) -> Result<Value, String> {
    let mut status = diagnostics::status(&sf.settings().snapshot(), sf.db())?;
    status["storedCredentials"] = json!({
        "remote": storage::has_credential(storage::KEY_SUPABASE_URL)
            && storage::has_credential(storage::KEY_SUPABASE_ANON_KEY),
        "adminPassword": storage::has_credential(storage::KEY_ADMIN_PASSWORD_HASH),
    });
    Ok(status)
}

/// Save the hosted backend connection and switch to it immediately.
pub fn settings_connect(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ConnectPayload = parse_payload(arg0)?;
    if sf.admin_gate().is_configured() {
        require_admin(sf, payload.password.as_deref())?;
    }
    storage::store_remote_credentials(&payload.url, &payload.anon_key)?;
    sf.settings().update(|s| {
        s.supabase_url = Some(payload.url.trim().to_string());
        s.supabase_anon_key = Some(payload.anon_key.trim().to_string());
    });
    info!("remote backend connected");
    Ok(json!({ "success": true, "backend": "remote" }))
}

/// Forget every stored credential; later calls use the local store.
pub fn settings_factory_reset(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: AdminPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    storage::factory_reset()?;
    sf.settings().update(|s| {
        s.supabase_url = None;
        s.supabase_anon_key = None;
        s.admin_password_hash = None;
    });
    Ok(json!({ "success": true, "backend": "local" }))
}
