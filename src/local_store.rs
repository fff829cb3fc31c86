//! Local fallback persistence used when no remote backend is configured.
//!
//! Each entity type lives in one serialized JSON array under a fixed key.
//! Every mutation reads the whole array and writes the whole array back;
//! there are no partial writes. A missing, unreadable or corrupt entry is
//! treated as an empty collection.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::db::{self, DbState};
use crate::error::StoreError;

pub const ORDERS_KEY: &str = "samyra_orders";
pub const PRODUCTS_KEY: &str = "samyra_products";

/// `local_settings` category holding the fallback collections.
const LOCAL_CATEGORY: &str = "local";

/// Raw string persistence keyed by a fixed name.
pub trait KeyValueStore: Send + Sync {
    /// `None` when the key is absent or the store cannot be read.
    fn read_raw(&self, key: &str) -> Option<String>;
    fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Drop `key`; returns whether it was present.
    fn remove_raw(&self, key: &str) -> Result<bool, StoreError>;
}

/// Store backed by the `local_settings` table.
#[derive(Clone)]
pub struct SqliteKvStore {
    db: Arc<DbState>,
}

impl SqliteKvStore {
    pub fn new(db: Arc<DbState>) -> Self {
        Self { db }
    }
}

impl KeyValueStore for SqliteKvStore {
    fn read_raw(&self, key: &str) -> Option<String> {
        let conn = match self.db.conn.lock() {
            Ok(c) => c,
            Err(e) => {
                error!("local store lock failed: {e}");
                return None;
            }
        };
        db::get_setting(&conn, LOCAL_CATEGORY, key)
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.db.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        db::set_setting(&conn, LOCAL_CATEGORY, key, value).map_err(StoreError::Database)
    }

    fn remove_raw(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.db.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        db::delete_setting(&conn, LOCAL_CATEGORY, key).map_err(StoreError::Database)
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn read_raw(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn write_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(key)
            .is_some())
    }
}

/// A whole-collection view of one entity type in a [`KeyValueStore`].
pub struct LocalCollection<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LocalCollection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> LocalCollection<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Read every record. Never fails: bad data reads as empty.
    pub fn read_all(&self) -> Vec<T> {
        let Some(raw) = self.store.read_raw(self.key) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(key = self.key, error = %e, "local collection unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Replace the stored collection with `items`.
    pub fn write_all(&self, items: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string(items).map_err(|e| StoreError::Serialize {
            key: self.key.to_string(),
            message: e.to_string(),
        })?;
        self.store.write_raw(self.key, &json)
    }
}
