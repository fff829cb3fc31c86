//! Samyra's Yummy Cakes - storefront backend.
//!
//! Order lifecycle and menu catalog for a home bakery. Every record lives
//! either in the hosted backend (when its URL and access key are
//! configured) or in a local SQLite-backed fallback store; the services
//! pick one per call.
//!
//! [`Storefront`] wires the services together for the command layer and
//! the `samyra-bakery` binary.

use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod admin;
pub mod ai;
pub mod auth;
pub mod commands;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod ids;
pub mod local_store;
pub mod models;
pub mod orders;
pub mod products;
pub mod remote;
pub mod storage;
pub mod tracking;
pub mod uploads;
pub mod workflow;

pub use config::{Settings, SettingsHandle};
pub use error::{AuthError, RemoteError, ServiceError, StoreError, UploadError};
pub use models::{AiConcept, NewOrder, Order, Product, ProductInput, ProductPatch};
pub use orders::OrderService;
pub use products::ProductService;
pub use uploads::ImageUpload;
pub use workflow::OrderStatus;

use auth::{AdminGate, PhoneLinks};
use db::DbState;
use local_store::{KeyValueStore, SqliteKvStore};

// ============================================================================
// Logging
// ============================================================================

/// Console + daily rolling file logging under `<data_dir>/logs`.
///
/// `RUST_LOG` overrides the default filter. Safe to call once per process.
pub fn init_tracing(data_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,samyra_bakery_lib=debug"));

    let log_dir = diagnostics::log_dir(data_dir);
    diagnostics::prune_old_logs(&log_dir);
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    // Dropping the guard flushes and stops the file writer; the process
    // logs until exit.
    std::mem::forget(guard);
}

// ============================================================================
// Storefront
// ============================================================================

/// All services over one settings handle and one local database.
pub struct Storefront {
    settings: SettingsHandle,
    db: Arc<DbState>,
    store: Arc<dyn KeyValueStore>,
    pub orders: OrderService,
    pub products: ProductService,
    pub generative: ai::GenerativeClient,
    pub phone_links: PhoneLinks,
}

impl Storefront {
    /// Open (or create) the local database under `settings.data_dir`.
    pub fn open(settings: Settings) -> Result<Self, String> {
        let db = db::init(&settings.data_dir)?;
        let storefront = Self::with_db(SettingsHandle::new(settings), Arc::new(db));
        info!(
            remote = storefront.settings.snapshot().is_remote_configured(),
            "storefront ready"
        );
        Ok(storefront)
    }

    /// Storefront over a throwaway in-memory database.
    pub fn in_memory(settings: SettingsHandle) -> Result<Self, String> {
        Ok(Self::with_db(settings, Arc::new(db::open_in_memory()?)))
    }

    fn with_db(settings: SettingsHandle, db: Arc<DbState>) -> Self {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteKvStore::new(db.clone()));
        Self {
            orders: OrderService::new(settings.clone(), store.clone()),
            products: ProductService::new(settings.clone(), store.clone()),
            generative: ai::GenerativeClient::new(settings.clone()),
            phone_links: PhoneLinks::new(store.clone()),
            settings,
            db,
            store,
        }
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn db(&self) -> &DbState {
        &self.db
    }

    /// Admin gate over the currently configured password hash.
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(
            self.settings.snapshot().admin_password_hash,
            self.store.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn storefront() -> Storefront {
        let settings = SettingsHandle::new(Settings::local_only(PathBuf::from("/tmp/unused")));
        Storefront::in_memory(settings).expect("in-memory storefront")
    }

    #[tokio::test]
    async fn test_services_share_the_local_database() {
        let sf = storefront();
        let order = sf
            .orders
            .create_order(NewOrder {
                customer_name: "Asha".into(),
                customer_phone: "+919876543210".into(),
                ..NewOrder::default()
            })
            .await
            .unwrap();

        let raw = {
            let conn = sf.db().conn.lock().unwrap();
            db::get_setting(&conn, "local", local_store::ORDERS_KEY).unwrap()
        };
        assert!(raw.contains(&order.id));
        assert_eq!(sf.products.get_active_products().await.len(), 9);
    }

    #[test]
    fn test_admin_gate_follows_settings() {
        let sf = storefront();
        assert!(!sf.admin_gate().is_configured());
        let hash = bcrypt::hash("owner", 4).unwrap();
        sf.settings().update(|s| s.admin_password_hash = Some(hash));
        assert!(sf.admin_gate().verify("owner").is_ok());
    }
}
