//! Shared application state.

use std::sync::Arc;

use crate::cart::{CartError, CartService, CartStore};
use crate::catalog::CatalogService;
use crate::checkout::CheckoutService;
use crate::config::StorefrontConfig;
use crate::orders::OrderService;
use crate::services::auth::{AccountService, IdentityProvider};
use crate::store::DocumentStore;

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: CatalogService,
    cart: Arc<CartService>,
    checkout: CheckoutService,
    orders: OrderService,
    accounts: AccountService,
}

impl AppState {
    /// Wire the services over the given backends.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted cart exists but cannot be loaded.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        cart_store: Arc<dyn CartStore>,
    ) -> Result<Self, CartError> {
        let cart = Arc::new(CartService::new(cart_store)?);
        let catalog = CatalogService::new(store.clone());
        let checkout = CheckoutService::new(store.clone(), cart.clone());
        let orders = OrderService::new(store.clone());
        let accounts = AccountService::new(identity, store);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                cart,
                checkout,
                orders,
                accounts,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }
}
