//! Order and catalog records, exactly as they are persisted.
//!
//! Field names are the column names of the `orders` / `products` tables
//! and the keys of the locally stored JSON, so the same serde shape works
//! for both backends.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::OrderStatus;

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current time as `2024-05-01T10:00:00.000Z`.
pub fn now_iso() -> String {
    format_iso(Utc::now())
}

fn format_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A fresh `updated_at` that sorts strictly after `previous`.
///
/// Stored timestamps only keep milliseconds, so two mutations inside the
/// same millisecond would otherwise produce equal values.
pub fn touch_timestamp(previous: &str) -> String {
    let now = Utc::now().trunc_subsecs(3);
    match DateTime::parse_from_rfc3339(previous) {
        Ok(prev) => {
            let prev = prev.with_timezone(&Utc);
            if now > prev {
                format_iso(now)
            } else {
                format_iso(prev + Duration::milliseconds(1))
            }
        }
        Err(_) => format_iso(now),
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Cake concept produced by the AI design flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConcept {
    pub name: String,
    pub description: String,
    #[serde(rename = "suggestedFlavors")]
    pub suggested_flavors: Vec<String>,
    #[serde(rename = "visualPrompt")]
    pub visual_prompt: String,
}

/// One customer request for a cake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub event_date: String,
    #[serde(default)]
    pub cake_flavor: String,
    #[serde(default)]
    pub cake_weight: String,
    #[serde(default)]
    pub occasion: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_concept: Option<AiConcept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_image_url: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields supplied by the customer when placing an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewOrder {
    #[serde(alias = "customerName")]
    pub customer_name: String,
    #[serde(alias = "customerPhone")]
    pub customer_phone: String,
    #[serde(alias = "eventDate")]
    pub event_date: String,
    #[serde(alias = "cakeFlavor")]
    pub cake_flavor: String,
    #[serde(alias = "cakeWeight")]
    pub cake_weight: String,
    pub occasion: String,
    pub details: String,
    #[serde(default, alias = "referenceImageUrl", skip_serializing_if = "Option::is_none")]
    pub reference_image_url: Option<String>,
    #[serde(default, alias = "aiConcept", skip_serializing_if = "Option::is_none")]
    pub ai_concept: Option<AiConcept>,
    #[serde(default, alias = "aiImageUrl", skip_serializing_if = "Option::is_none")]
    pub ai_image_url: Option<String>,
}

impl Order {
    /// Build a fresh `pending` order with a newly assigned id.
    pub fn from_new(fields: NewOrder) -> Self {
        let now = now_iso();
        Self {
            id: crate::ids::order_id(),
            customer_name: fields.customer_name,
            customer_phone: fields.customer_phone,
            event_date: fields.event_date,
            cake_flavor: fields.cake_flavor,
            cake_weight: fields.cake_weight,
            occasion: fields.occasion,
            details: fields.details,
            reference_image_url: fields.reference_image_url,
            ai_concept: fields.ai_concept,
            ai_image_url: fields.ai_image_url,
            status: OrderStatus::Pending,
            owner_notes: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// One menu entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price_range: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub category: String,
    #[serde(alias = "priceRange")]
    pub price_range: String,
    pub description: String,
    #[serde(alias = "imageUrl")]
    pub image_url: String,
    #[serde(alias = "isActive")]
    pub is_active: bool,
    #[serde(alias = "sortOrder")]
    pub sort_order: i32,
}

/// Partial product update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, alias = "priceRange", skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, alias = "isActive", skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, alias = "sortOrder", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl Product {
    pub fn from_input(input: ProductInput) -> Self {
        let now = now_iso();
        Self {
            id: crate::ids::product_id(),
            name: input.name,
            category: input.category,
            price_range: input.price_range,
            description: input.description,
            image_url: input.image_url,
            is_active: input.is_active,
            sort_order: input.sort_order,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

impl ProductPatch {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    /// Apply every present field to `product`.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(price_range) = &self.price_range {
            product.price_range = price_range.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = image_url.clone();
        }
        if let Some(is_active) = self.is_active {
            product.is_active = is_active;
        }
        if let Some(sort_order) = self.sort_order {
            product.sort_order = sort_order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_order() -> NewOrder {
        NewOrder {
            customer_name: "Asha".into(),
            customer_phone: "+919876543210".into(),
            event_date: "2026-11-02".into(),
            cake_flavor: "Red Velvet".into(),
            cake_weight: "1 kg".into(),
            occasion: "Birthday".into(),
            details: "Write 'Happy 7th'".into(),
            ..NewOrder::default()
        }
    }

    #[test]
    fn test_now_iso_has_millis_and_z() {
        let ts = now_iso();
        assert_eq!(ts.len(), "2024-05-01T10:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_touch_timestamp_moves_forward_from_future_value() {
        let prev = "2999-01-01T00:00:00.000Z";
        assert_eq!(touch_timestamp(prev), "2999-01-01T00:00:00.001Z");
    }

    #[test]
    fn test_touch_timestamp_uses_clock_when_ahead() {
        let prev = "2001-01-01T00:00:00.000Z";
        let next = touch_timestamp(prev);
        assert!(next.as_str() > prev);
        assert!(next.starts_with("20") && !next.starts_with("2001"));
    }

    #[test]
    fn test_touch_timestamp_tolerates_garbage() {
        let next = touch_timestamp("not a date");
        assert!(next.ends_with('Z'));
    }

    #[test]
    fn test_order_from_new_starts_pending() {
        let order = Order::from_new(sample_new_order());
        assert!(order.id.starts_with("ORD-"));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.created_at, order.updated_at);
        assert!(order.owner_notes.is_none());
    }

    #[test]
    fn test_order_json_omits_absent_optionals_and_uses_camel_concept() {
        let mut order = Order::from_new(sample_new_order());
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("owner_notes").is_none());
        assert!(json.get("ai_concept").is_none());
        assert_eq!(json["status"], "pending");

        order.ai_concept = Some(AiConcept {
            name: "Jungle Roar".into(),
            description: "Lions".into(),
            suggested_flavors: vec!["Chocolate".into()],
            visual_prompt: "lion cake".into(),
        });
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["ai_concept"]["suggestedFlavors"][0], "Chocolate");
        assert_eq!(json["ai_concept"]["visualPrompt"], "lion cake");
    }

    #[test]
    fn test_order_accepts_null_optionals_from_backend() {
        let row = serde_json::json!({
            "id": "ORD-1-AAAA",
            "customer_name": "A",
            "customer_phone": "1",
            "event_date": "2026-01-01",
            "cake_flavor": "Vanilla",
            "cake_weight": "1 kg",
            "occasion": "Birthday",
            "details": "",
            "reference_image_url": null,
            "ai_concept": null,
            "ai_image_url": null,
            "status": "baking",
            "owner_notes": null,
            "created_at": "2026-01-01T00:00:00.000Z",
            "updated_at": "2026-01-01T00:00:00.000Z"
        });
        let order: Order = serde_json::from_value(row).unwrap();
        assert_eq!(order.status, OrderStatus::Baking);
        assert!(order.owner_notes.is_none());
    }

    #[test]
    fn test_product_patch_applies_only_present_fields() {
        let mut product = Product::from_input(ProductInput {
            name: "Black Forest".into(),
            category: "Custom".into(),
            price_range: "₹850 - ₹2,800".into(),
            description: "Cherries".into(),
            image_url: String::new(),
            is_active: true,
            sort_order: 8,
        });
        let patch = ProductPatch {
            price_range: Some("₹900 - ₹3,000".into()),
            ..ProductPatch::active(false)
        };
        patch.apply(&mut product);
        assert_eq!(product.name, "Black Forest");
        assert_eq!(product.price_range, "₹900 - ₹3,000");
        assert!(!product.is_active);
        assert_eq!(product.sort_order, 8);
    }

    #[test]
    fn test_product_patch_serializes_sparse() {
        let json = serde_json::to_value(ProductPatch::active(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "is_active": true }));
    }
}
