//! Order dashboard rules for the bakery owner.
//!
//! Advancing and cancelling are the two actions the dashboard offers;
//! both go through [`OrderService::update_order_status`], which itself
//! accepts any status.

use std::collections::BTreeMap;

use reqwest::Url;
use tracing::info;

use crate::error::ServiceError;
use crate::models::Order;
use crate::orders::OrderService;
use crate::workflow::{OrderStatus, ALL_STATUSES};

/// Dashboard filter: one status or everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    /// `"all"` (or blank) selects everything; otherwise a known status.
    pub fn parse(input: &str) -> Result<Self, String> {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        input.parse().map(StatusFilter::Only)
    }
}

/// Count of orders per known status. Every known status is present, with
/// zero when no order has it; unknown stored values are not counted.
pub fn status_counts(orders: &[Order]) -> BTreeMap<OrderStatus, usize> {
    let mut counts: BTreeMap<OrderStatus, usize> =
        ALL_STATUSES.iter().cloned().map(|s| (s, 0)).collect();
    for order in orders {
        if let Some(count) = counts.get_mut(&order.status) {
            *count += 1;
        }
    }
    counts
}

pub fn filter_orders(orders: Vec<Order>, filter: &StatusFilter) -> Vec<Order> {
    match filter {
        StatusFilter::All => orders,
        StatusFilter::Only(status) => orders.into_iter().filter(|o| &o.status == status).collect(),
    }
}

/// A blank note means "leave the stored note alone".
fn note_input(note: Option<&str>) -> Option<&str> {
    note.filter(|n| !n.trim().is_empty())
}

/// Result of an admin action.
#[derive(Debug)]
pub enum ActionOutcome {
    Updated(Order),
    NotFound,
    /// The order's current status offers no such action.
    NotAvailable(OrderStatus),
}

/// Move an order to the next step of the linear sequence.
pub async fn advance_order(
    service: &OrderService,
    order_id: &str,
    note: Option<&str>,
) -> Result<ActionOutcome, ServiceError> {
    let Some(order) = service.get_order_by_id(order_id).await else {
        return Ok(ActionOutcome::NotFound);
    };
    let Some(next) = order.status.next() else {
        return Ok(ActionOutcome::NotAvailable(order.status));
    };
    info!(order_id, from = %order.status, to = %next, "advancing order");
    Ok(service
        .update_order_status(order_id, next, note_input(note))
        .await?
        .map_or(ActionOutcome::NotFound, ActionOutcome::Updated))
}

/// Cancel an order that is not yet delivered or cancelled.
pub async fn cancel_order(
    service: &OrderService,
    order_id: &str,
    note: Option<&str>,
) -> Result<ActionOutcome, ServiceError> {
    let Some(order) = service.get_order_by_id(order_id).await else {
        return Ok(ActionOutcome::NotFound);
    };
    if !order.status.can_cancel() {
        return Ok(ActionOutcome::NotAvailable(order.status));
    }
    info!(order_id, from = %order.status, "cancelling order");
    Ok(service
        .update_order_status(order_id, OrderStatus::Cancelled, note_input(note))
        .await?
        .map_or(ActionOutcome::NotFound, ActionOutcome::Updated))
}

/// Link that opens a WhatsApp chat with the customer, prefilled with a
/// status update.
pub fn whatsapp_update_link(order: &Order, note: Option<&str>) -> Option<String> {
    let digits: String = order
        .customer_phone
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return None;
    }
    let text = format!(
        "Hi {}! Update on your order {}: {}. {}",
        order.customer_name,
        order.id,
        order.status.label(),
        note.unwrap_or("")
    );
    let mut url = Url::parse(&format!("https://wa.me/{digits}")).ok()?;
    url.query_pairs_mut().append_pair("text", text.trim_end());
    Some(url.to_string())
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

    async fn place(svc: &OrderService, name: &str) -> Order {
        svc.create_order(NewOrder {
            customer_name: name.into(),
            customer_phone: "+91 98765-43210".into(),
            ..NewOrder::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_advance_walks_the_sequence_then_stops() {
        let svc = service();
        let order = place(&svc, "Riya").await;
        let mut seen = Vec::new();
        loop {
            match advance_order(&svc, &order.id, None).await.unwrap() {
                ActionOutcome::Updated(o) => seen.push(o.status),
                ActionOutcome::NotAvailable(status) => {
                    assert_eq!(status, OrderStatus::Delivered);
                    break;
                }
                ActionOutcome::NotFound => panic!("order vanished"),
            }
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(seen.last(), Some(&OrderStatus::Delivered));
    }

    #[tokio::test]
    async fn test_blank_note_preserves_existing_note() {
        let svc = service();
        let order = place(&svc, "Riya").await;
        advance_order(&svc, &order.id, Some("call before delivery"))
            .await
            .unwrap();
        let ActionOutcome::Updated(updated) =
            advance_order(&svc, &order.id, Some("   ")).await.unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(updated.status, OrderStatus::Baking);
        assert_eq!(updated.owner_notes.as_deref(), Some("call before delivery"));
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let svc = service();
        let order = place(&svc, "Riya").await;
        let ActionOutcome::Updated(cancelled) =
            cancel_order(&svc, &order.id, Some("customer called")).await.unwrap()
        else {
            panic!("expected update");
        };
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(matches!(
            cancel_order(&svc, &order.id, None).await.unwrap(),
            ActionOutcome::NotAvailable(OrderStatus::Cancelled)
        ));
        assert!(matches!(
            cancel_order(&svc, "ORD-NOPE-0000", None).await.unwrap(),
            ActionOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn test_counts_and_filter() {
        let svc = service();
        let a = place(&svc, "A").await;
        place(&svc, "B").await;
        advance_order(&svc, &a.id, None).await.unwrap();

        let orders = svc.get_all_orders().await;
        let counts = status_counts(&orders);
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[&OrderStatus::Pending], 1);
        assert_eq!(counts[&OrderStatus::Confirmed], 1);
        assert_eq!(counts[&OrderStatus::Delivered], 0);

        let confirmed = filter_orders(orders.clone(), &StatusFilter::parse("confirmed").unwrap());
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, a.id);
        assert_eq!(filter_orders(orders, &StatusFilter::parse("all").unwrap()).len(), 2);
        assert!(StatusFilter::parse("lost").is_err());
    }

    #[test]
    fn test_whatsapp_link() {
        let mut order = Order::from_new(NewOrder {
            customer_name: "Riya".into(),
            customer_phone: "+91 98765-43210".into(),
            ..NewOrder::default()
        });
        order.status = OrderStatus::Ready;
        let link = whatsapp_update_link(&order, Some("pick up at 5")).unwrap();
        assert!(link.starts_with("https://wa.me/919876543210?text="));
        let url = Url::parse(&link).unwrap();
        let text = url.query_pairs().next().unwrap().1.into_owned();
        assert_eq!(
            text,
            format!("Hi Riya! Update on your order {}: Ready. pick up at 5", order.id)
        );

        order.customer_phone = "n/a".into();
        assert!(whatsapp_update_link(&order, None).is_none());
    }
}
