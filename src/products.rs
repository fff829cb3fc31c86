//! Catalog service for the bakery menu.
//!
//! Same routing as the order service: remote table when configured, the
//! local `samyra_products` collection otherwise. The public menu is never
//! empty; when the active backend has no active rows (or fails) the
//! built-in seed catalog is served instead.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SettingsHandle;
use crate::error::{RemoteError, ServiceError};
use crate::local_store::{KeyValueStore, LocalCollection, PRODUCTS_KEY};
use crate::models::{now_iso, touch_timestamp, Product, ProductInput, ProductPatch};
use crate::remote::{eq, Sort, SupabaseClient, PRODUCTS_TABLE};
use crate::uploads::{self, ImageUpload, PRODUCTS_FOLDER};

// ---------------------------------------------------------------------------
// Seed catalog
// ---------------------------------------------------------------------------

const SEED_IMAGE_BASE: &str = "https://images.unsplash.com/photo-";
const SEED_IMAGE_PARAMS: &str = "?auto=format&fit=crop&w=600&q=80";

/// (name, category, price range, unsplash photo id, description)
const SEEDS: [(&str, &str, &str, &str, &str); 9] = [
    (
        "Classic Chocolate Truffle",
        "Birthday",
        "₹800 - ₹2,500",
        "1578985545062-69928b1d9587",
        "Rich dark chocolate layers with velvety ganache.",
    ),
    (
        "Red Velvet Dream",
        "Wedding",
        "₹1,200 - ₹4,000",
        "1616541823729-00fe0aacd32c",
        "Vibrant red sponge with cream cheese frosting.",
    ),
    (
        "Vanilla Bean Elegance",
        "Anniversary",
        "₹700 - ₹2,000",
        "1535141192574-5d4897c12636",
        "Light and fluffy vanilla sponge with fresh cream.",
    ),
    (
        "Fondant Fantasy",
        "Custom",
        "₹2,000 - ₹8,000",
        "1558961363-fa8fdf82db35",
        "Fully customizable fondant cakes for any theme.",
    ),
    (
        "Strawberry Bliss",
        "Birthday",
        "₹900 - ₹3,000",
        "1621303837174-89787a7d4729",
        "Fresh strawberry sponge with whipped cream layers.",
    ),
    (
        "Butterscotch Crunch",
        "Anniversary",
        "₹750 - ₹2,200",
        "1563729784474-d77dbb933a9e",
        "Caramel butterscotch with crunchy praline topping.",
    ),
    (
        "Pineapple Delight",
        "Birthday",
        "₹600 - ₹1,800",
        "1464349095431-e9a21285b5f3",
        "Tropical pineapple sponge with cherry garnish.",
    ),
    (
        "Black Forest",
        "Custom",
        "₹850 - ₹2,800",
        "1606890737304-57a1ca8a5b62",
        "Classic chocolate with kirsch-soaked cherries and whipped cream.",
    ),
    (
        "Rose & Pistachio",
        "Wedding",
        "₹1,500 - ₹5,000",
        "1519869325930-281384570c4e",
        "Delicate rosewater sponge with pistachio buttercream.",
    ),
];

/// Built-in menu shown when the catalog is empty. Ids are `default-1`..`default-9`
/// and timestamps are blank; these entries are never persisted.
pub fn seed_catalog() -> Vec<Product> {
    SEEDS
        .iter()
        .zip(1..)
        .map(|(&(name, category, price_range, photo, description), n)| Product {
            id: format!("default-{n}"),
            name: name.to_string(),
            category: category.to_string(),
            price_range: price_range.to_string(),
            description: description.to_string(),
            image_url: format!("{SEED_IMAGE_BASE}{photo}{SEED_IMAGE_PARAMS}"),
            is_active: true,
            sort_order: n,
            created_at: String::new(),
            updated_at: String::new(),
        })
        .collect()
}

fn sort_for_display(products: &mut [Product]) {
    products.sort_by_key(|p| p.sort_order);
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProductService {
    settings: SettingsHandle,
    local: LocalCollection<Product>,
}

impl ProductService {
    pub fn new(settings: SettingsHandle, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            settings,
            local: LocalCollection::new(store, PRODUCTS_KEY),
        }
    }

    fn remote(&self) -> Option<Result<SupabaseClient, RemoteError>> {
        self.settings
            .remote()
            .map(|credentials| SupabaseClient::new(&credentials))
    }

    /// Local products ordered by `sort_order`.
    fn local_sorted(&self) -> Vec<Product> {
        let mut products = self.local.read_all();
        sort_for_display(&mut products);
        products
    }

    /// Active entries for the public menu. Never empty.
    pub async fn get_active_products(&self) -> Vec<Product> {
        let active = match self.remote() {
            Some(client) => {
                let result = match client {
                    Ok(client) => {
                        client
                            .select::<Product>(
                                PRODUCTS_TABLE,
                                &[eq("is_active", true)],
                                Some(Sort::Asc("sort_order")),
                            )
                            .await
                    }
                    Err(e) => Err(e),
                };
                result.unwrap_or_else(|e| {
                    warn!(error = %e, "active product listing failed, serving seed catalog");
                    Vec::new()
                })
            }
            None => self
                .local_sorted()
                .into_iter()
                .filter(|p| p.is_active)
                .collect(),
        };

        if active.is_empty() {
            debug!("no active products, serving seed catalog");
            return seed_catalog();
        }
        active
    }

    /// Every entry including hidden ones, for the admin view. A remote
    /// failure falls back to whatever the local collection holds.
    pub async fn get_all_products(&self) -> Vec<Product> {
        let Some(client) = self.remote() else {
            return self.local_sorted();
        };
        let result = match client {
            Ok(client) => {
                client
                    .select::<Product>(PRODUCTS_TABLE, &[], Some(Sort::Asc("sort_order")))
                    .await
            }
            Err(e) => Err(e),
        };
        match result {
            Ok(products) => products,
            Err(e) => {
                warn!(error = %e, "product listing failed, using local collection");
                self.local_sorted()
            }
        }
    }

    pub async fn create_product(&self, input: ProductInput) -> Result<Product, ServiceError> {
        let product = Product::from_input(input);

        if let Some(client) = self.remote() {
            let row = serde_json::to_value(&product)
                .map_err(|e| ServiceError::Persistence(format!("serialize product: {e}")))?;
            let created = client?
                .insert::<Product>(PRODUCTS_TABLE, &row)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ServiceError::Persistence("backend returned no row for new product".into())
                })?;
            info!(product_id = %created.id, "product created (remote)");
            return Ok(created);
        }

        let mut products = self.local.read_all();
        products.push(product.clone());
        self.local.write_all(&products)?;
        info!(product_id = %product.id, "product created (local)");
        Ok(product)
    }

    /// Apply `patch` and refresh `updated_at`. `Ok(None)` when no product
    /// has this id.
    pub async fn update_product(
        &self,
        product_id: &str,
        patch: ProductPatch,
    ) -> Result<Option<Product>, ServiceError> {
        if let Some(client) = self.remote() {
            let client = client?;
            let mut body = serde_json::to_value(&patch)
                .map_err(|e| ServiceError::Persistence(format!("serialize patch: {e}")))?;
            if let Value::Object(map) = &mut body {
                map.insert("updated_at".into(), Value::String(now_iso()));
            }
            let updated = client
                .update::<Product>(PRODUCTS_TABLE, &[eq("id", product_id)], &body)
                .await?
                .into_iter()
                .next();
            if updated.is_none() {
                debug!(product_id, "product update matched no row");
            }
            return Ok(updated);
        }

        let mut products = self.local.read_all();
        let Some(idx) = products.iter().position(|p| p.id == product_id) else {
            debug!(product_id, "product update matched no row");
            return Ok(None);
        };
        {
            let product = &mut products[idx];
            patch.apply(product);
            product.updated_at = touch_timestamp(&product.updated_at);
        }
        self.local.write_all(&products)?;
        info!(product_id, "product updated (local)");
        Ok(Some(products.swap_remove(idx)))
    }

    /// Soft show/hide toggle.
    pub async fn set_product_active(
        &self,
        product_id: &str,
        is_active: bool,
    ) -> Result<Option<Product>, ServiceError> {
        self.update_product(product_id, ProductPatch::active(is_active))
            .await
    }

    /// Hard delete. Returns whether a record was removed.
    pub async fn delete_product(&self, product_id: &str) -> Result<bool, ServiceError> {
        if let Some(client) = self.remote() {
            let removed = client?.delete(PRODUCTS_TABLE, &[eq("id", product_id)]).await?;
            info!(product_id, removed, "product delete (remote)");
            return Ok(removed > 0);
        }

        let products = self.local.read_all();
        let before = products.len();
        let remaining: Vec<Product> = products
            .into_iter()
            .filter(|p| p.id != product_id)
            .collect();
        self.local.write_all(&remaining)?;
        Ok(remaining.len() < before)
    }

    /// Store a catalog image and return its URL.
    pub async fn upload_image(&self, upload: ImageUpload) -> Result<String, ServiceError> {
        upload.validate()?;
        let remote = self.remote().transpose()?;
        uploads::store_image(remote, upload, PRODUCTS_FOLDER).await
    }
}
