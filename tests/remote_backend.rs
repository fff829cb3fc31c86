//! Remote-mode behaviour against an in-process fake of the hosted
//! backend (PostgREST tables, object storage, generative endpoints).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use samyra_bakery_lib::admin::{self, ActionOutcome};
use samyra_bakery_lib::commands::orders as order_commands;
use samyra_bakery_lib::{
    ImageUpload, NewOrder, OrderStatus, ProductInput, Settings, SettingsHandle, Storefront,
};

#[derive(Default)]
struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    objects: Mutex<Vec<(String, String, usize)>>,
}

type Shared = Arc<FakeBackend>;
type Params = HashMap<String, String>;

fn matches(row: &Value, params: &Params) -> bool {
    params
        .iter()
        .filter(|(key, _)| key.as_str() != "select" && key.as_str() != "order")
        .all(|(column, condition)| {
            let Some(expected) = condition.strip_prefix("eq.") else {
                return false;
            };
            match row.get(column) {
                Some(Value::String(s)) => s == expected,
                Some(other) => other.to_string() == expected,
                None => false,
            }
        })
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    }
}

fn apply_order(rows: &mut [Value], params: &Params) {
    let Some((column, direction)) = params.get("order").and_then(|o| o.rsplit_once('.')) else {
        return;
    };
    rows.sort_by(|a, b| {
        let ord = compare(a.get(column), b.get(column));
        if direction == "desc" {
            ord.reverse()
        } else {
            ord
        }
    });
}

async fn select_rows(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> Json<Vec<Value>> {
    let tables = backend.tables.lock().unwrap();
    let mut rows: Vec<Value> = tables
        .get(&table)
        .map(|rows| rows.iter().filter(|r| matches(r, &params)).cloned().collect())
        .unwrap_or_default();
    apply_order(&mut rows, &params);
    Json(rows)
}

async fn insert_rows(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    Json(rows): Json<Vec<Value>>,
) -> (StatusCode, Json<Vec<Value>>) {
    let mut tables = backend.tables.lock().unwrap();
    tables.entry(table).or_default().extend(rows.iter().cloned());
    (StatusCode::CREATED, Json(rows))
}

async fn update_rows(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
    Json(patch): Json<Value>,
) -> Json<Vec<Value>> {
    let mut tables = backend.tables.lock().unwrap();
    let mut updated = Vec::new();
    for row in tables.entry(table).or_default().iter_mut() {
        if !matches(row, &params) {
            continue;
        }
        if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(updated)
}

async fn delete_rows(
    State(backend): State<Shared>,
    Path(table): Path<String>,
    Query(params): Query<Params>,
) -> Json<Vec<Value>> {
    let mut tables = backend.tables.lock().unwrap();
    let rows = tables.entry(table).or_default();
    let (removed, kept): (Vec<Value>, Vec<Value>) =
        rows.drain(..).partition(|row| matches(row, &params));
    *rows = kept;
    Json(removed)
}

async fn upload_object(
    State(backend): State<Shared>,
    Path((bucket, path)): Path<(String, String)>,
    body: Bytes,
) -> Json<Value> {
    backend
        .objects
        .lock()
        .unwrap()
        .push((bucket.clone(), path.clone(), body.len()));
    Json(json!({ "Key": format!("{bucket}/{path}") }))
}

async fn generative(Path(name): Path<String>, Json(body): Json<Value>) -> Json<Value> {
    match name.as_str() {
        "concept" => Json(json!({
            "name": "Midnight Garden",
            "description": format!("Inspired by {}", body["prompt"].as_str().unwrap_or_default()),
            "suggestedFlavors": ["Blueberry", "Vanilla Bean"],
            "visualPrompt": "dark blue cake with sugar flowers",
        })),
        "image" => Json(json!({ "image": "data:image/png;base64,AAAA" })),
        _ => Json(json!({
            "text": format!("{} turns so far", body["history"].as_array().map_or(0, Vec::len)),
        })),
    }
}

fn fake_backend(backend: Shared) -> Router {
    Router::new()
        .route(
            "/rest/v1/{table}",
            get(select_rows)
                .post(insert_rows)
                .patch(update_rows)
                .delete(delete_rows),
        )
        .route("/storage/v1/object/{bucket}/{*path}", post(upload_object))
        .route("/api/{name}", post(generative))
        .with_state(backend)
}

fn failing_backend() -> Router {
    Router::new().fallback(|| async {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "database is down" })),
        )
    })
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve") });
    format!("http://{addr}")
}

fn remote_settings(base: &str) -> Settings {
    Settings {
        supabase_url: Some(format!("{base}/")),
        supabase_anon_key: Some("anon-key".into()),
        api_base_url: format!("{base}/api"),
        ..Settings::local_only(PathBuf::from("/tmp/unused"))
    }
}

async fn remote_storefront() -> (Storefront, Shared, String) {
    let backend = Shared::default();
    let base = spawn(fake_backend(backend.clone())).await;
    let settings = SettingsHandle::new(remote_settings(&base));
    let sf = Storefront::in_memory(settings).expect("storefront");
    (sf, backend, base)
}

fn new_order(phone: &str) -> NewOrder {
    NewOrder {
        customer_name: "Meera".into(),
        customer_phone: phone.into(),
        event_date: "2026-12-24".into(),
        cake_flavor: "Chocolate Truffle".into(),
        cake_weight: "2 kg".into(),
        occasion: "Anniversary".into(),
        details: "Gold leaf on top".into(),
        ..NewOrder::default()
    }
}

fn product(name: &str, sort_order: i32, is_active: bool) -> ProductInput {
    ProductInput {
        name: name.into(),
        category: "Custom".into(),
        price_range: "₹900 - ₹3,000".into(),
        description: String::new(),
        image_url: String::new(),
        is_active,
        sort_order,
    }
}

#[tokio::test]
async fn remote_order_lifecycle_goes_through_the_backend() {
    let (sf, backend, _) = remote_storefront().await;
    assert!(sf.orders.is_remote());

    let order = sf.orders.create_order(new_order("+919800000001")).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(backend.tables.lock().unwrap()["orders"].len(), 1);

    let fetched = sf.orders.get_order_by_id(&order.id).await.unwrap();
    assert_eq!(fetched, order);
    assert!(sf.orders.get_order_by_id("ORD-0-NONE").await.is_none());

    let updated = sf
        .orders
        .update_order_status(&order.id, OrderStatus::Confirmed, Some("Paid advance"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Confirmed);
    assert_eq!(updated.owner_notes.as_deref(), Some("Paid advance"));

    match admin::advance_order(&sf.orders, &order.id, None).await.unwrap() {
        ActionOutcome::Updated(o) => {
            assert_eq!(o.status, OrderStatus::Baking);
            assert_eq!(o.owner_notes.as_deref(), Some("Paid advance"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert!(sf.orders.delete_order(&order.id).await.unwrap());
    assert!(!sf.orders.delete_order(&order.id).await.unwrap());
    assert!(sf.orders.get_all_orders().await.is_empty());
}

#[tokio::test]
async fn remote_status_update_moves_updated_at_past_stored_value() {
    let (sf, backend, _) = remote_storefront().await;
    let order = sf.orders.create_order(new_order("+919800000009")).await.unwrap();
    {
        let mut tables = backend.tables.lock().unwrap();
        let row = tables.get_mut("orders").unwrap().first_mut().unwrap();
        row["updated_at"] = json!("2999-01-01T00:00:00.000Z");
    }

    let updated = sf
        .orders
        .update_order_status(&order.id, OrderStatus::Baking, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.updated_at, "2999-01-01T00:00:00.001Z");

    assert!(sf
        .orders
        .update_order_status("ORD-0-NONE", OrderStatus::Ready, None)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn remote_phone_lookup_is_exact_and_newest_first() {
    let (sf, _, _) = remote_storefront().await;
    let first = sf.orders.create_order(new_order("+919800000002")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = sf.orders.create_order(new_order("+919800000002")).await.unwrap();
    sf.orders.create_order(new_order("+91 98000 00002")).await.unwrap();

    let ids: Vec<String> = sf
        .orders
        .get_orders_by_phone("+919800000002")
        .await
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(ids, vec![second.id.clone(), first.id]);

    let tracked = order_commands::order_track(&sf, Some(json!({ "query": second.id })))
        .await
        .unwrap();
    assert_eq!(tracked.as_array().unwrap().len(), 1);
    assert_eq!(tracked[0]["tracking"]["kind"], "progress");
}

#[tokio::test]
async fn remote_catalog_falls_back_to_seeds_until_populated() {
    let (sf, _, _) = remote_storefront().await;
    let seeds = sf.products.get_active_products().await;
    assert_eq!(seeds.len(), 9);
    assert!(seeds.iter().all(|p| p.id.starts_with("default-")));

    let late = sf.products.create_product(product("Late", 5, true)).await.unwrap();
    let early = sf.products.create_product(product("Early", 1, true)).await.unwrap();
    sf.products.create_product(product("Hidden", 0, false)).await.unwrap();

    let active: Vec<String> = sf
        .products
        .get_active_products()
        .await
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(active, vec!["Early", "Late"]);
    assert_eq!(sf.products.get_all_products().await[0].name, "Hidden");

    let hidden = sf
        .products
        .set_product_active(&early.id, false)
        .await
        .unwrap()
        .unwrap();
    assert!(!hidden.is_active);
    assert!(sf.products.delete_product(&late.id).await.unwrap());
    assert_eq!(sf.products.get_active_products().await.len(), 9);
}

#[tokio::test]
async fn remote_uploads_return_public_urls() {
    let (sf, backend, base) = remote_storefront().await;
    let url = sf
        .orders
        .upload_reference_image(ImageUpload::new("idea.JPG", "image/jpeg", vec![1, 2, 3]))
        .await
        .unwrap();
    assert!(url.starts_with(&format!("{base}/storage/v1/object/public/order-images/orders/")));
    assert!(url.ends_with(".JPG"));

    let objects = backend.objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].0, "order-images");
    assert!(objects[0].1.starts_with("orders/"));
    assert_eq!(objects[0].2, 3);
}

#[tokio::test]
async fn backend_failures_degrade_reads_and_surface_on_writes() {
    let base = spawn(failing_backend()).await;
    let sf = Storefront::in_memory(SettingsHandle::new(remote_settings(&base))).unwrap();

    assert!(sf.orders.get_order_by_id("ORD-1-ABCD").await.is_none());
    assert!(sf.orders.get_orders_by_phone("+919800000003").await.is_empty());
    assert!(sf.orders.get_all_orders().await.is_empty());
    assert_eq!(sf.products.get_active_products().await.len(), 9);
    assert!(sf.products.get_all_products().await.is_empty());

    let err = sf
        .orders
        .create_order(new_order("+919800000003"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("database is down"));
    assert!(sf
        .orders
        .update_order_status("ORD-1-ABCD", OrderStatus::Ready, None)
        .await
        .is_err());
    assert!(sf.products.delete_product("p").await.is_err());
}

#[tokio::test]
async fn backend_choice_follows_settings_on_every_call() {
    let (sf, _, base) = remote_storefront().await;
    sf.settings().update(|s| {
        s.supabase_url = None;
        s.supabase_anon_key = None;
    });
    let local = sf.orders.create_order(new_order("+919800000004")).await.unwrap();
    assert!(!sf.orders.is_remote());

    sf.settings().update(|s| {
        s.supabase_url = Some(base.clone());
        s.supabase_anon_key = Some("anon-key".into());
    });
    assert!(sf.orders.get_order_by_id(&local.id).await.is_none());
    let remote = sf.orders.create_order(new_order("+919800000004")).await.unwrap();
    assert_eq!(sf.orders.get_all_orders().await.len(), 1);

    sf.settings().update(|s| s.supabase_anon_key = Some("   ".into()));
    let ids: Vec<String> = sf
        .orders
        .get_all_orders()
        .await
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(ids, vec![local.id]);
    assert!(sf.orders.get_order_by_id(&remote.id).await.is_none());
}

#[tokio::test]
async fn generative_endpoints_are_used_when_reachable() {
    let (sf, _, _) = remote_storefront().await;
    let concept = sf.generative.generate_concept("a moonlit garden").await;
    assert_eq!(concept.name, "Midnight Garden");
    assert!(!concept.is_demo());
    assert!(concept.description.contains("moonlit garden"));

    let image = sf.generative.generate_image(&concept.visual_prompt).await;
    assert_eq!(image, "data:image/png;base64,AAAA");

    let history = vec![
        samyra_bakery_lib::ai::ChatTurn::user("hi"),
        samyra_bakery_lib::ai::ChatTurn::bot("hello"),
    ];
    let reply = sf.generative.send_chat_message(&history, "eggless?").await;
    assert_eq!(reply, "2 turns so far");
}
