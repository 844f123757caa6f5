//! Product catalog backed by the document store.
//!
//! The catalog is read with unbounded fetch-all queries and filtered on the
//! client side, matching the platform's document-per-product layout. Admin
//! edits write straight through to the store; there is no local cache.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use tangelo_core::ProductId;

use crate::models::collections;
use crate::models::{NewProduct, Product, ProductPatch};
use crate::store::{DocumentStore, StoreError};

/// Catalog reads and admin writes.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    /// Create the service over a document store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// List products, optionally restricted to one category.
    ///
    /// Fetches the whole collection and filters locally; documents that do
    /// not parse as products are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, category: Option<&str>) -> Result<Vec<Product>, StoreError> {
        let docs = self.store.list(collections::PRODUCTS).await?;
        let products = docs
            .iter()
            .filter_map(|doc| match Product::from_doc(doc) {
                Ok(product) => Some(product),
                Err(err) => {
                    tracing::warn!(id = %doc.id, error = %err, "skipping malformed product document");
                    None
                }
            })
            .filter(|p| category.is_none_or(|c| p.category == c))
            .collect();
        Ok(products)
    }

    /// Fetch one product. `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails or the document is
    /// malformed.
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let Some(doc) = self.store.get(collections::PRODUCTS, id.as_str()).await? else {
            return Ok(None);
        };
        Ok(Some(Product::from_doc(&doc)?))
    }

    /// Distinct non-empty categories, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, StoreError> {
        let products = self.list_products(None).await?;
        let mut categories: Vec<String> = Vec::new();
        for product in products {
            if !product.category.is_empty() && !categories.contains(&product.category) {
                categories.push(product.category);
            }
        }
        Ok(categories)
    }

    /// Add a product; returns the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn add_product(&self, product: &NewProduct) -> Result<ProductId, StoreError> {
        let data = serde_json::to_value(product)?;
        let id = self.store.create(collections::PRODUCTS, data).await?;
        info!(id = %id, "product added");
        Ok(ProductId::new(id))
    }

    /// Merge the given fields into a product document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the product does not exist.
    #[instrument(skip(self, patch))]
    pub async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<(), StoreError> {
        let fields = serde_json::to_value(&patch)?;
        self.store
            .update(collections::PRODUCTS, id.as_str(), fields)
            .await
    }

    /// Delete a product. Order history is untouched; its lines carry copies.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), StoreError> {
        self.store.delete(collections::PRODUCTS, id.as_str()).await
    }

    /// Populate an empty catalog with the default product set.
    ///
    /// Does nothing if the catalog already has products.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    #[instrument(skip(self))]
    pub async fn seed_default_products(&self) -> Result<(), StoreError> {
        if !self.store.list(collections::PRODUCTS).await?.is_empty() {
            return Ok(());
        }

        for product in default_products() {
            self.add_product(&product).await?;
        }
        info!("seeded default catalog");
        Ok(())
    }
}

fn seed(name: &str, description: &str, cents: i64, stock: u32, category: &str) -> NewProduct {
    let image = name.replace(' ', "+");
    NewProduct {
        name: name.to_owned(),
        description: description.to_owned(),
        price: Decimal::new(cents, 2),
        stock,
        category: category.to_owned(),
        image_url: Some(format!(
            "https://via.placeholder.com/300x200.png?text={image}"
        )),
    }
}

/// The default catalog used to seed an empty store.
#[must_use]
pub fn default_products() -> Vec<NewProduct> {
    vec![
        seed("Wireless Keyboard", "Slim wireless keyboard with quiet keys.", 2999, 40, "Electronics"),
        seed("Yoga Pants", "Comfortable stretch yoga pants for workouts.", 2499, 60, "Clothing"),
        seed("Bluetooth Speaker", "Portable speaker with deep bass and long battery life.", 3999, 35, "Electronics"),
        seed("Travel Mug", "Insulated mug keeps drinks hot or cold for hours.", 1499, 80, "Accessories"),
        seed("Graphic Tee", "Trendy t-shirt with a cool graphic print.", 1899, 70, "Clothing"),
        seed("Laptop Sleeve", "Protective neoprene sleeve for 13-inch laptops.", 1699, 50, "Accessories"),
        seed("Running Shoes", "Lightweight shoes designed for runners.", 5999, 30, "Footwear"),
        seed("Desk Organizer", "Keep your workspace tidy with this organizer.", 1299, 90, "Office"),
        seed("Beanie Hat", "Warm knit beanie for cold weather.", 1199, 55, "Clothing"),
        seed("Fitness Tracker", "Track your steps, sleep, and calories burned.", 4499, 25, "Electronics"),
        seed("Sunglasses", "UV-protected sunglasses with polarized lenses.", 2199, 65, "Accessories"),
        seed("Notebook", "Hardcover notebook with lined pages.", 799, 120, "Office"),
        seed("Rain Jacket", "Waterproof jacket for rainy days.", 4999, 20, "Clothing"),
        seed("Wireless Earbuds", "Compact earbuds with charging case.", 5499, 32, "Electronics"),
        seed("Leather Wallet", "Premium leather wallet with multiple compartments.", 2499, 40, "Accessories"),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;

    fn catalog() -> (CatalogService, Arc<MemoryDocumentStore>) {
        let store = Arc::new(MemoryDocumentStore::new());
        (CatalogService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let (catalog, _) = catalog();
        let id = catalog
            .add_product(&seed("Travel Mug", "Insulated.", 1499, 80, "Accessories"))
            .await
            .unwrap();

        let product = catalog.get_product(&id).await.unwrap().unwrap();
        assert_eq!(product.name, "Travel Mug");
        assert_eq!(product.price, Decimal::new(1499, 2));
        assert_eq!(product.stock, 80);
    }

    #[tokio::test]
    async fn test_list_filters_by_category() {
        let (catalog, _) = catalog();
        catalog.seed_default_products().await.unwrap();

        let all = catalog.list_products(None).await.unwrap();
        assert_eq!(all.len(), 15);

        let electronics = catalog.list_products(Some("Electronics")).await.unwrap();
        assert_eq!(electronics.len(), 4);
        assert!(electronics.iter().all(|p| p.category == "Electronics"));
    }

    #[tokio::test]
    async fn test_categories_are_distinct_and_non_empty() {
        let (catalog, _) = catalog();
        catalog.seed_default_products().await.unwrap();
        catalog
            .add_product(&seed("Mystery Item", "Uncategorized.", 100, 1, ""))
            .await
            .unwrap();

        let mut categories = catalog.categories().await.unwrap();
        categories.sort();
        assert_eq!(
            categories,
            vec!["Accessories", "Clothing", "Electronics", "Footwear", "Office"]
        );
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (catalog, _) = catalog();
        catalog.seed_default_products().await.unwrap();
        catalog.seed_default_products().await.unwrap();
        assert_eq!(catalog.list_products(None).await.unwrap().len(), 15);
    }

    #[tokio::test]
    async fn test_update_patches_only_given_fields() {
        let (catalog, _) = catalog();
        let id = catalog
            .add_product(&seed("Notebook", "Lined pages.", 799, 120, "Office"))
            .await
            .unwrap();

        catalog
            .update_product(
                &id,
                ProductPatch {
                    stock: Some(100),
                    ..ProductPatch::default()
                },
            )
            .await
            .unwrap();

        let product = catalog.get_product(&id).await.unwrap().unwrap();
        assert_eq!(product.stock, 100);
        assert_eq!(product.name, "Notebook");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_none() {
        let (catalog, _) = catalog();
        let id = catalog
            .add_product(&seed("Notebook", "Lined pages.", 799, 120, "Office"))
            .await
            .unwrap();
        catalog.delete_product(&id).await.unwrap();
        assert!(catalog.get_product(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_document_is_skipped() {
        let (catalog, store) = catalog();
        catalog
            .add_product(&seed("Notebook", "Lined pages.", 799, 120, "Office"))
            .await
            .unwrap();
        store
            .set(collections::PRODUCTS, "broken", serde_json::json!({"name": 42}))
            .await
            .unwrap();

        assert_eq!(catalog.list_products(None).await.unwrap().len(), 1);
    }
}
