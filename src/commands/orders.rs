use serde::Deserialize;
use serde_json::{json, Value};

use crate::admin::{self, ActionOutcome, StatusFilter};
use crate::commands::auth::require_admin;
use crate::commands::{parse_payload, to_json, ImagePayload};
use crate::models::NewOrder;
use crate::tracking::{self, TrackedOrder};
use crate::workflow::OrderStatus;
use crate::Storefront;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderIdPayload {
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct TrackPayload {
    #[serde(alias = "input")]
    query: String,
}

#[derive(Debug, Deserialize)]
struct AdminPayload {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderListPayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderActionPayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    #[serde(default, alias = "owner_notes", alias = "ownerNotes")]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatusPayload {
    #[serde(default)]
    password: Option<String>,
    #[serde(alias = "order_id", alias = "id")]
    order_id: String,
    status: String,
    #[serde(default, alias = "owner_notes", alias = "note")]
    owner_notes: Option<String>,
}

/// Place a new order. Customer-facing; no admin password.
pub async fn order_create(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let fields: NewOrder = parse_payload(arg0)?;
    if fields.customer_name.trim().is_empty() || fields.customer_phone.trim().is_empty() {
        return Err("Name and phone number are required".into());
    }
    let order = sf
        .orders
        .create_order(fields)
        .await
        .map_err(|e| e.to_string())?;
    to_json(&order)
}

/// One order with its tracking timeline, or `null`.
pub async fn order_get(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: OrderIdPayload = parse_payload(arg0)?;
    match sf.orders.get_order_by_id(payload.order_id.trim()).await {
        Some(order) => to_json(&TrackedOrder::from(order)),
        None => Ok(Value::Null),
    }
}

/// Tracking box lookup: order id or phone number.
pub async fn order_track(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: TrackPayload = parse_payload(arg0)?;
    let found: Vec<TrackedOrder> = tracking::track(&sf.orders, &payload.query)
        .await
        .into_iter()
        .map(TrackedOrder::from)
        .collect();
    to_json(&found)
}

pub async fn order_list(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: OrderListPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let filter = StatusFilter::parse(payload.status.as_deref().unwrap_or_default())?;

    let all = sf.orders.get_all_orders().await;
    let counts: serde_json::Map<String, Value> = admin::status_counts(&all)
        .into_iter()
        .map(|(status, count)| (status.to_string(), json!(count)))
        .collect();
    let orders = admin::filter_orders(all, &filter);
    Ok(json!({
        "counts": counts,
        "orders": to_json(&orders)?,
    }))
}

/// Set any status directly. The service accepts every value; unknown
/// names are rejected here.
pub async fn order_update_status(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: OrderStatusPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let status: OrderStatus = payload.status.parse()?;
    let notes = payload
        .owner_notes
        .as_deref()
        .filter(|n| !n.trim().is_empty());
    let updated = sf
        .orders
        .update_order_status(&payload.order_id, status, notes)
        .await
        .map_err(|e| e.to_string())?;
    match updated {
        Some(order) => to_json(&order),
        None => Ok(Value::Null),
    }
}

fn action_result(outcome: ActionOutcome, note: Option<&str>) -> Result<Value, String> {
    match outcome {
        ActionOutcome::Updated(order) => Ok(json!({
            "order": to_json(&order)?,
            "whatsappLink": admin::whatsapp_update_link(&order, note),
        })),
        ActionOutcome::NotFound => Err("Order not found".into()),
        ActionOutcome::NotAvailable(status) => Err(format!(
            "No such action for an order that is {}",
            status.label()
        )),
    }
}

pub async fn order_advance(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: OrderActionPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let outcome = admin::advance_order(&sf.orders, &payload.order_id, payload.note.as_deref())
        .await
        .map_err(|e| e.to_string())?;
    action_result(outcome, payload.note.as_deref())
}

pub async fn order_cancel(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: OrderActionPayload = parse_payload(arg0)?;
    require_admin(sf, payload.password.as_deref())?;
    let outcome = admin::cancel_order(&sf.orders, &payload.order_id, payload.note.as_deref())
        .await
        .map_err(|e| e.to_string())?;
    action_result(outcome, payload.note.as_deref())
}

pub async fn order_delete(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let admin_payload: AdminPayload = parse_payload(arg0.clone())?;
    require_admin(sf, admin_payload.password.as_deref())?;
    let payload: OrderIdPayload = parse_payload(arg0)?;
    let deleted = sf
        .orders
        .delete_order(&payload.order_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "deleted": deleted }))
}

/// Upload a customer reference photo; returns the URL to put on the order.
pub async fn order_upload_reference(sf: &Storefront, arg0: Option<Value>) -> Result<Value, String> {
    let payload: ImagePayload = parse_payload(arg0)?;
    let url = sf
        .orders
        .upload_reference_image(payload.into_upload()?)
        .await
        .map_err(|e| e.to_string())?;
    Ok(json!({ "url": url }))
}
