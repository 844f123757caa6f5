//! Local shopping cart.
//!
//! The cart never leaves this device: lines are held in memory and persisted
//! in full after every mutation, so whichever save lands last wins. Each line
//! snapshots the product's name, price, and stock at the time it was added;
//! checkout re-validates against live stock.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, instrument};

use tangelo_core::ProductId;

use crate::models::{CartLine, Product};

/// Errors from cart persistence and mutation.
#[derive(Debug, Error)]
pub enum CartError {
    /// Reading or writing the cart file failed.
    #[error("cart I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted cart could not be (de)serialized.
    #[error("cart serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The referenced product has no line in the cart.
    #[error("no cart line for product {0}")]
    NoSuchLine(ProductId),
}

/// Whole-cart persistence.
///
/// Implementations load and save the full line set; there is no per-line
/// granularity and no merging of concurrent writers.
pub trait CartStore: Send + Sync {
    /// Load every persisted line. An absent cart is an empty one.
    fn load(&self) -> Result<Vec<CartLine>, CartError>;

    /// Replace the persisted cart with `lines`.
    fn save(&self, lines: &[CartLine]) -> Result<(), CartError>;
}

/// Cart persisted as a single JSON file on local disk.
pub struct JsonFileCartStore {
    path: PathBuf,
}

impl JsonFileCartStore {
    /// Persist the cart at `path`. Parent directories are created on first
    /// save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CartStore for JsonFileCartStore {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(lines)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// In-memory cart persistence for tests.
#[derive(Default)]
pub struct MemoryCartStore {
    lines: Mutex<Vec<CartLine>>,
}

impl MemoryCartStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for MemoryCartStore {
    fn load(&self) -> Result<Vec<CartLine>, CartError> {
        Ok(self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn save(&self, lines: &[CartLine]) -> Result<(), CartError> {
        *self
            .lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = lines.to_vec();
        Ok(())
    }
}

/// The cart: in-memory line set synced to a [`CartStore`] on every mutation.
///
/// The persisted copy is written before the in-memory copy is updated, so on
/// a failed save the two stay consistent with each other.
pub struct CartService {
    store: Arc<dyn CartStore>,
    lines: Mutex<Vec<CartLine>>,
}

impl CartService {
    /// Load the persisted cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted cart exists but cannot be read.
    pub fn new(store: Arc<dyn CartStore>) -> Result<Self, CartError> {
        let lines = store.load()?;
        debug!(lines = lines.len(), "cart loaded");
        Ok(Self {
            store,
            lines: Mutex::new(lines),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CartLine>> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current cart lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.lock().clone()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lock().iter().map(CartLine::line_total).sum()
    }

    /// Add `quantity` of a product. An existing line for the same product
    /// has its quantity increased; the stored price and stock snapshot are
    /// refreshed from the product.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the cart fails.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add(&self, product: &Product, quantity: u32) -> Result<(), CartError> {
        let mut lines = self.lock();
        let mut updated = lines.clone();

        if let Some(line) = updated.iter_mut().find(|l| l.id == product.id) {
            line.quantity += quantity;
            line.price = product.price;
            line.stock = product.stock;
        } else {
            updated.push(CartLine {
                id: product.id.clone(),
                name: product.name.clone(),
                price: product.price,
                quantity,
                stock: product.stock,
            });
        }

        self.store.save(&updated)?;
        *lines = updated;
        Ok(())
    }

    /// Set a line's quantity, clamped to `1..=stock` against the stock
    /// snapshot the line holds.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NoSuchLine`] if the product is not in the cart,
    /// or an error if persisting the cart fails.
    #[instrument(skip(self))]
    pub fn set_quantity(&self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let mut lines = self.lock();
        let mut updated = lines.clone();

        let line = updated
            .iter_mut()
            .find(|l| &l.id == product_id)
            .ok_or_else(|| CartError::NoSuchLine(product_id.clone()))?;
        line.quantity = quantity.clamp(1, line.stock.max(1));

        self.store.save(&updated)?;
        *lines = updated;
        Ok(())
    }

    /// Remove a product's line. Removing an absent product is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the cart fails.
    #[instrument(skip(self))]
    pub fn remove(&self, product_id: &ProductId) -> Result<(), CartError> {
        let mut lines = self.lock();
        let updated: Vec<CartLine> = lines
            .iter()
            .filter(|l| &l.id != product_id)
            .cloned()
            .collect();

        self.store.save(&updated)?;
        *lines = updated;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the cart fails.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<(), CartError> {
        let mut lines = self.lock();
        self.store.save(&[])?;
        lines.clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: &str, price: Decimal, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            stock,
            category: String::new(),
            image_url: None,
        }
    }

    fn cart() -> CartService {
        CartService::new(Arc::new(MemoryCartStore::new())).unwrap()
    }

    #[test]
    fn test_add_new_line() {
        let cart = cart();
        cart.add(&product("p1", Decimal::from(10), 5), 2).unwrap();

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(cart.total(), Decimal::from(20));
    }

    #[test]
    fn test_add_same_product_merges_quantities() {
        let cart = cart();
        let p = product("p1", Decimal::from(10), 5);
        cart.add(&p, 2).unwrap();
        cart.add(&p, 1).unwrap();

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
    }

    #[test]
    fn test_add_refreshes_price_and_stock_snapshot() {
        let cart = cart();
        cart.add(&product("p1", Decimal::from(10), 5), 1).unwrap();
        cart.add(&product("p1", Decimal::from(12), 3), 1).unwrap();

        let lines = cart.lines();
        assert_eq!(lines[0].price, Decimal::from(12));
        assert_eq!(lines[0].stock, 3);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_set_quantity_clamps_to_stock_snapshot() {
        let cart = cart();
        cart.add(&product("p1", Decimal::from(10), 5), 1).unwrap();

        cart.set_quantity(&ProductId::new("p1"), 99).unwrap();
        assert_eq!(cart.lines()[0].quantity, 5);

        cart.set_quantity(&ProductId::new("p1"), 0).unwrap();
        assert_eq!(cart.lines()[0].quantity, 1);
    }

    #[test]
    fn test_set_quantity_missing_line_fails() {
        let cart = cart();
        let err = cart.set_quantity(&ProductId::new("ghost"), 1).unwrap_err();
        assert!(matches!(err, CartError::NoSuchLine(_)));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let cart = cart();
        cart.add(&product("p1", Decimal::from(10), 5), 1).unwrap();
        cart.remove(&ProductId::new("p1")).unwrap();
        cart.remove(&ProductId::new("p1")).unwrap();
        assert!(cart.lines().is_empty());
    }

    #[test]
    fn test_cart_persists_across_services() {
        let store = Arc::new(MemoryCartStore::new());
        {
            let cart = CartService::new(store.clone()).unwrap();
            cart.add(&product("p1", Decimal::new(1099, 2), 5), 2).unwrap();
        }

        let reloaded = CartService::new(store).unwrap();
        assert_eq!(reloaded.lines().len(), 1);
        assert_eq!(reloaded.total(), Decimal::new(2198, 2));
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("tangelo-cart-{}", uuid::Uuid::new_v4()));
        let store = JsonFileCartStore::new(dir.join("cart.json"));

        // Missing file reads as an empty cart.
        assert!(store.load().unwrap().is_empty());

        let lines = vec![CartLine {
            id: ProductId::new("p1"),
            name: "Travel Mug".to_owned(),
            price: Decimal::new(1499, 2),
            quantity: 2,
            stock: 80,
        }];
        store.save(&lines).unwrap();
        assert_eq!(store.load().unwrap(), lines);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
