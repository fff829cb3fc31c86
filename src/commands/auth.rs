use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::{hash_password, AuthUser};
use crate::commands::{parse_payload, to_json};
use crate::{storage, tracking, Storefront};

#[derive(Debug, Deserialize)]
struct AdminLoginPayload {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetPasswordPayload {
    #[serde(default, alias = "current_password", alias = "password")]
    current_password: Option<String>,
    #[serde(alias = "new_password")]
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct LinkPhonePayload {
    user: AuthUser,
    phone: String,
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    user: AuthUser,
}

/// Verify the admin password carried by a command payload.
pub(crate) fn require_admin(sf: &Storefront, password: Option<&str>) -> Result<(), String> {
    sf.admin_gate()
        .verify(password.unwrap_or_default())
        .map_err(|e| e.to_string())
}

pub fn admin_login(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: AdminLoginPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    Ok(json!({ "success": true }))
}

/// Set or change the admin password. Changing an existing password needs
/// the current one. The hash is kept in the OS credential store.
pub fn admin_set_password(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: SetPasswordPayload = parse_payload(arg0)?;
    if sf.admin_gate().is_configured() {
        require_admin(sf, payload.current_password.as_deref())?;
    }
    let hash = hash_password(&payload.new_password)?;
    storage::set_credential(storage::KEY_ADMIN_PASSWORD_HASH, &hash)?;
    sf.settings().update(|s| s.admin_password_hash = Some(hash));
    info!("admin password updated");
    Ok(json!({ "success": true }))
}

pub fn account_link_phone(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: LinkPhonePayload = parse_payload(arg0)?;
    let linked = sf
        .phone_links
        .link_phone(&payload.user.id, &payload.phone)
        .map_err(|e| e.to_string())?;
    Ok(json!({ "phone": linked }))
}

/// Dashboard for a signed-in customer: display name, linked phone and the
/// orders placed with that phone.
pub async fn account_orders(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: AccountPayload = parse_payload(arg0)?;
    let phone = sf.phone_links.linked_phone(&payload.user);
    let orders = match &phone {
        Some(phone) => tracking::orders_for_phone_link(&sf.orders, phone).await,
        None => Vec::new(),
    };
    Ok(json!({
        "displayName": payload.user.display_name(),
        "phone": phone,
        "orders": to_json(&orders)?,
    }))
}
