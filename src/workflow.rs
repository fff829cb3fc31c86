//! Order status workflow and the presentation rules derived from it.
//!
//! Orders move forward along a fixed six-step sequence by manual admin
//! action; `cancelled` is a side branch. Nothing here rejects a transition:
//! `next()` and `can_cancel()` only describe which actions the admin
//! dashboard offers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Baking,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
    /// A stored value this build has no mapping for. Kept verbatim so a
    /// read-modify-write never rewrites it.
    Unknown(String),
}

/// The forward progression shown on the tracking timeline.
pub const LINEAR_SEQUENCE: [OrderStatus; 6] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Baking,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// Every known status, in dashboard order.
pub const ALL_STATUSES: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Baking,
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Baking => "baking",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Unknown(raw) => raw.as_str(),
        }
    }

    /// Admin "advance" target. `delivered`, `cancelled` and unknown
    /// values have none.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Baking),
            OrderStatus::Baking => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Cancellation is offered from every state except the terminal ones.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OrderStatus::Unknown(_))
    }

    /// Position in [`LINEAR_SEQUENCE`]; `-1` for cancelled or unknown.
    pub fn progress_index(&self) -> i32 {
        LINEAR_SEQUENCE
            .iter()
            .position(|s| s == self)
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    /// Fill ratio for the tracking progress bar; `None` when there is no
    /// timeline position (the cancelled banner is shown instead).
    pub fn progress_fraction(&self) -> Option<f64> {
        let index = self.progress_index();
        if index < 0 {
            return None;
        }
        Some(index as f64 / (LINEAR_SEQUENCE.len() - 1) as f64)
    }

    /// Label used on the admin and customer dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Baking => "Baking",
            OrderStatus::Ready => "Ready",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Unknown(_) => "Unknown",
        }
    }

    /// Label used on the tracking timeline.
    pub fn tracking_label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Order Received",
            other => other.label(),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => OrderStatus::Pending,
            "confirmed" => OrderStatus::Confirmed,
            "baking" => OrderStatus::Baking,
            "ready" => OrderStatus::Ready,
            "out_for_delivery" => OrderStatus::OutForDelivery,
            "delivered" => OrderStatus::Delivered,
            "cancelled" => OrderStatus::Cancelled,
            _ => {
                tracing::warn!(status = %raw, "unmapped order status");
                OrderStatus::Unknown(raw)
            }
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    /// Strict parse for operator input: unknown values are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = OrderStatus::from(s.trim().to_lowercase());
        if status.is_known() {
            Ok(status)
        } else {
            Err(format!("Unknown order status: {s}"))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tracking timeline
// ---------------------------------------------------------------------------

/// One step of the tracking timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineStep {
    pub status: OrderStatus,
    pub label: &'static str,
    pub completed: bool,
    pub current: bool,
}

/// What the tracking view renders for an order's status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackingView {
    Cancelled,
    Progress {
        fraction: f64,
        steps: Vec<TimelineStep>,
    },
}

/// Timeline for `status`. Cancelled orders get a banner instead of a
/// progress bar; unknown values render an empty bar with no step reached.
pub fn timeline(status: &OrderStatus) -> TrackingView {
    if *status == OrderStatus::Cancelled {
        return TrackingView::Cancelled;
    }
    let current = status.progress_index();
    let steps = LINEAR_SEQUENCE
        .iter()
        .enumerate()
        .map(|(idx, step)| TimelineStep {
            status: step.clone(),
            label: step.tracking_label(),
            completed: (idx as i32) <= current,
            current: idx as i32 == current,
        })
        .collect();
    TrackingView::Progress {
        fraction: status.progress_fraction().unwrap_or(0.0),
        steps,
    }
}
