use serde::Deserialize;
use serde_json::{json, Value};

use crate::commands::auth::require_admin;
use crate::commands::{parse_payload, to_json, ImagePayload};
use crate::models::{ProductInput, ProductPatch};
use crate::Storefront;

#[derive(Debug, Deserialize)]
struct AdminPayload {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductCreatePayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(flatten)]
    input: ProductInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductUpdatePayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "product_id", alias = "id")]
    product_id: String,
    #[serde(flatten)]
    patch: ProductPatch,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductActivePayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "product_id", alias = "id")]
    product_id: String,
    #[serde(alias = "is_active")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductIdPayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "product_id", alias = "id")]
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct ProductImagePayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(flatten)]
    image: ImagePayload,
}

/// Public menu. Never empty.
pub async fn menu_get_active(sf: &Storefront) -> Result<Value, String> {
    to_json(&sf.products.get_active_products().await)
}

/// Every catalog entry including hidden ones.
pub async fn menu_get_all(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: AdminPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    to_json(&sf.products.get_all_products().await)
}

pub async fn product_create(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ProductCreatePayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    if payload.input.name.trim().is_empty() {
        return Err("Product name is required".into());
    }
    let product = sf
        .products
        .create_product(payload.input)
        .await
        .map_err(|e| e.to_string())?;
    to_json(&product)
}

pub async fn product_update(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ProductUpdatePayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let updated = sf
        .products
        .update_product(&payload.product_id, payload.patch)
        .await
        .map_err(|e| e.to_string())?;
    match updated {
        Some(product) => to_json(&product),
        None => Ok(Value::Null),
    }
}

pub async fn product_set_active(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ProductActivePayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let updated = sf
        .products
        .set_product_active(&payload.product_id, payload.is_active)
        .await
        .map_err(|e| e.to_string())?;
    match updated {
        Some(product) => to_json(&product),
        None => Ok(Value::Null),
    }
}

pub async fn product_delete(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ProductIdPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let deleted = sf
        .products
        .delete_product(&payload.product_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "deleted": deleted }))
}

pub async fn product_upload_image(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ProductImagePayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let url = sf
        .products
        .upload_image(payload.image.into_upload()?)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "url": url }))
}
