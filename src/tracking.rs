//! Customer-facing order lookups.

use serde::Serialize;

use crate::ids;
use crate::models::Order;
use crate::orders::OrderService;
use crate::workflow::{timeline, TrackingView};

/// What a customer typed into the tracking box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingQuery {
    OrderId(String),
    Phone(String),
}

impl TrackingQuery {
    /// `None` for blank input. Anything starting with `ORD-` is an order
    /// id; everything else is treated as a phone number.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if ids::looks_like_order_id(input) {
            Some(TrackingQuery::OrderId(input.to_string()))
        } else {
            Some(TrackingQuery::Phone(input.to_string()))
        }
    }
}

/// An order together with its rendered timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub tracking: TrackingView,
}

impl From<Order> for TrackedOrder {
    fn from(order: Order) -> Self {
        let tracking = timeline(&order.status);
        Self { order, tracking }
    }
}

/// Orders matching the tracking input, newest first. Blank input and
/// misses both yield an empty list.
pub async fn track(service: &OrderService, input: &str) -> Vec<Order> {
    match TrackingQuery::parse(input) {
        None => Vec::new(),
        Some(TrackingQuery::OrderId(id)) => {
            service.get_order_by_id(&id).await.into_iter().collect()
        }
        Some(TrackingQuery::Phone(phone)) => service.get_orders_by_phone(&phone).await,
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Orders for a signed-in customer's linked phone. Unlike
/// [`OrderService::get_orders_by_phone`], a number that differs only in
/// spacing also matches.
pub async fn orders_for_phone_link(service: &OrderService, phone: &str) -> Vec<Order> {
    if phone.trim().is_empty() {
        return Vec::new();
    }
    let wanted = strip_whitespace(phone);
    service
        .get_all_orders()
        .await
        .into_iter()
        .filter(|o| o.customer_phone == phone || strip_whitespace(&o.customer_phone) == wanted)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Settings, SettingsHandle};
    use crate::local_store::MemoryKvStore;
    use crate::models::NewOrder;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn service() -> OrderService {
        let settings = SettingsHandle::new(Settings::local_only(PathBuf::from("/tmp/unused")));
        OrderService::new(settings, Arc::new(MemoryKvStore::new()))
    }

    fn order_for(phone: &str) -> NewOrder {
        NewOrder {
            customer_name: "Meera".into(),
            customer_phone: phone.into(),
            cake_flavor: "Butterscotch".into(),
            ..NewOrder::default()
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(TrackingQuery::parse("   "), None);
        assert_eq!(
            TrackingQuery::parse(" ORD-LOYW3V28-AB12 "),
            Some(TrackingQuery::OrderId("ORD-LOYW3V28-AB12".into()))
        );
        assert_eq!(
            TrackingQuery::parse("ord-lower"),
            Some(TrackingQuery::Phone("ord-lower".into()))
        );
        assert_eq!(
            TrackingQuery::parse("+91 98765 43210"),
            Some(TrackingQuery::Phone("+91 98765 43210".into()))
        );
    }

    #[tokio::test]
    async fn test_track_by_id_and_phone() {
        let svc = service();
        let order = svc.create_order(order_for("+919876543210")).await.unwrap();

        assert_eq!(track(&svc, &order.id).await, vec![order.clone()]);
        assert_eq!(track(&svc, "+919876543210").await, vec![order]);
        assert!(track(&svc, "ORD-MISSING-0000").await.is_empty());
        assert!(track(&svc, "").await.is_empty());
    }

    #[tokio::test]
    async fn test_phone_link_tolerates_spacing() {
        let svc = service();
        let spaced = svc.create_order(order_for("+91 98765 43210")).await.unwrap();
        let compact = svc.create_order(order_for("+919876543210")).await.unwrap();
        svc.create_order(order_for("+911234567890")).await.unwrap();

        let found = orders_for_phone_link(&svc, "+919876543210").await;
        let ids: Vec<&str> = found.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(found.len(), 2);
        assert!(ids.contains(&spaced.id.as_str()));
        assert!(ids.contains(&compact.id.as_str()));

        assert_eq!(svc.get_orders_by_phone("+919876543210").await.len(), 1);
        assert!(orders_for_phone_link(&svc, " ").await.is_empty());
    }

    #[test]
    fn test_tracked_order_serializes_flat() {
        let order = Order::from_new(order_for("1"));
        let value = serde_json::to_value(TrackedOrder::from(order.clone())).unwrap();
        assert_eq!(value["id"], order.id.as_str());
        assert_eq!(value["tracking"]["kind"], "progress");
        assert_eq!(value["tracking"]["steps"][0]["label"], "Order Received");
    }
}
