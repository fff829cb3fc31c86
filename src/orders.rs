//! Order service: the dual-backend facade over customer orders.
//!
//! Every call re-reads the settings handle and routes to the remote
//! backend when it is configured, or to the local fallback collection
//! otherwise. Reads never fail (backend errors degrade to `None` / empty);
//! writes surface [`ServiceError::Persistence`].

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::SettingsHandle;
use crate::error::{RemoteError, ServiceError};
use crate::local_store::{KeyValueStore, LocalCollection, ORDERS_KEY};
use crate::models::{touch_timestamp, NewOrder, Order};
use crate::remote::{eq, Sort, SupabaseClient, ORDERS_TABLE};
use crate::uploads::{self, ImageUpload, ORDERS_FOLDER};
use crate::workflow::OrderStatus;

#[derive(Clone)]
pub struct OrderService {
    settings: SettingsHandle,
    local: LocalCollection<Order>,
}

/// Newest first; ties keep their stored order.
fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl OrderService {
    pub fn new(settings: SettingsHandle, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings,
            local: LocalCollection::new(store, ORDERS_KEY),
        }
    }

    /// Remote client when the backend is configured, evaluated per call.
    fn remote(&self) -> Option<Result<SupabaseClient, RemoteError>> {
        self.settings
            .remote()
            .map(|credentials| SupabaseClient::new(&credentials))
    }

    pub fn is_remote(&self) -> bool {
        self.settings.remote().is_some()
    }

    /// Assign an id, mark the order `pending`, and persist it.
    pub async fn create_order(&self, fields: NewOrder) -> Result<Order, ServiceError> {
        let order = Order::from_new(fields);

        if let Some(client) = self.remote() {
            let client = client?;
            let row = serde_json::to_value(&order)
                .map_err(|e| ServiceError::Persistence(format!("serialize order: {e}")))?;
            let created = client
                .insert::<Order>(ORDERS_TABLE, &row)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ServiceError::Persistence("backend returned no row for new order".into())
                })?;
            info!(order_id = %created.id, "order created (remote)");
            return Ok(created);
        }

        let mut orders = self.local.read_all();
        orders.insert(0, order.clone());
        self.local.write_all(&orders)?;
        info!(order_id = %order.id, "order created (local)");
        Ok(order)
    }

    /// Exact id match; `None` on a miss or a backend failure.
    pub async fn get_order_by_id(&self, order_id: &str) -> Option<Order> {
        if let Some(client) = self.remote() {
            let result = match client {
                Ok(client) => {
                    client
                        .select::<Order>(ORDERS_TABLE, &[eq("id", order_id)], None)
                        .await
                }
                Err(e) => Err(e),
            };
            return match result {
                Ok(rows) => rows.into_iter().next(),
                Err(e) => {
                    warn!(order_id, error = %e, "order lookup failed");
                    None
                }
            };
        }

        self.local.read_all().into_iter().find(|o| o.id == order_id)
    }

    /// Orders whose `customer_phone` equals `phone` byte for byte, newest
    /// first. No normalisation: `"+91 98765 43210"` does not match
    /// `"+919876543210"`.
    pub async fn get_orders_by_phone(&self, phone: &str) -> Vec<Order> {
        if let Some(client) = self.remote() {
            let result = match client {
                Ok(client) => {
                    client
                        .select::<Order>(
                            ORDERS_TABLE,
                            &[eq("customer_phone", phone)],
                            Some(Sort::Desc("created_at")),
                        )
                        .await
                }
                Err(e) => Err(e),
            };
            return result.unwrap_or_else(|e| {
                warn!(error = %e, "phone lookup failed");
                Vec::new()
            });
        }

        let mut orders: Vec<Order> = self
            .local
            .read_all()
            .into_iter()
            .filter(|o| o.customer_phone == phone)
            .collect();
        sort_newest_first(&mut orders);
        orders
    }

    /// Every order, newest first.
    pub async fn get_all_orders(&self) -> Vec<Order> {
        if let Some(client) = self.remote() {
            let result = match client {
                Ok(client) => {
                    client
                        .select::<Order>(ORDERS_TABLE, &[], Some(Sort::Desc("created_at")))
                        .await
                }
                Err(e) => Err(e),
            };
            return result.unwrap_or_else(|e| {
                warn!(error = %e, "order listing failed");
                Vec::new()
            });
        }

        let mut orders = self.local.read_all();
        sort_newest_first(&mut orders);
        orders
    }

    /// Set the status and move `updated_at` strictly past its stored
    /// value. `owner_notes` is only written when provided; `None` keeps the
    /// existing note. Any status is accepted, including backwards moves.
    pub async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        owner_notes: Option<&str>,
    ) -> Result<Option<Order>, ServiceError> {
        if let Some(client) = self.remote() {
            let client = client?;
            let Some(current) = client
                .select::<Order>(ORDERS_TABLE, &[eq("id", order_id)], None)
                .await?
                .into_iter()
                .next()
            else {
                debug!(order_id, "status update matched no order");
                return Ok(None);
            };
            let mut patch = json!({
                "status": status,
                "updated_at": touch_timestamp(&current.updated_at),
            });
            if let Some(notes) = owner_notes {
                patch["owner_notes"] = Value::String(notes.to_string());
            }
            let updated = client
                .update::<Order>(ORDERS_TABLE, &[eq("id", order_id)], &patch)
                .await?
                .into_iter()
                .next();
            match &updated {
                Some(order) => {
                    info!(order_id, status = %order.status, "order status updated (remote)")
                }
                None => debug!(order_id, "status update matched no order"),
            }
            return Ok(updated);
        }

        let mut orders = self.local.read_all();
        let Some(idx) = orders.iter().position(|o| o.id == order_id) else {
            debug!(order_id, "status update matched no order");
            return Ok(None);
        };
        {
            let order = &mut orders[idx];
            order.status = status;
            order.updated_at = touch_timestamp(&order.updated_at);
            if let Some(notes) = owner_notes {
                order.owner_notes = Some(notes.to_string());
            }
        }
        self.local.write_all(&orders)?;
        let updated = orders.swap_remove(idx);
        info!(order_id, status = %updated.status, "order status updated (local)");
        Ok(Some(updated))
    }

    /// Hard delete. Returns whether a record was actually removed.
    pub async fn delete_order(&self, order_id: &str) -> Result<bool, ServiceError> {
        if let Some(client) = self.remote() {
            let removed = client?.delete(ORDERS_TABLE, &[eq("id", order_id)]).await?;
            info!(order_id, removed, "order delete (remote)");
            return Ok(removed > 0);
        }

        let orders = self.local.read_all();
        let before = orders.len();
        let remaining: Vec<Order> = orders.into_iter().filter(|o| o.id != order_id).collect();
        self.local.write_all(&remaining)?;
        let removed = remaining.len() < before;
        info!(order_id, removed, "order delete (local)");
        Ok(removed)
    }

    /// Store a customer's reference photo and return its URL.
    pub async fn upload_reference_image(
        &self,
        upload: ImageUpload,
    ) -> Result<String, ServiceError> {
        upload.validate()?;
        let remote = self.remote().transpose()?;
        uploads::store_image(remote, upload, ORDERS_FOLDER).await
    }
}
