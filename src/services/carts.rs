//! Server-held till carts. Each cart is keyed by id and lives until it is
//! checked out, discarded, or left idle past the configured TTL.

use crate::{
    errors::ServiceError,
    pos::{Cart, CartError, CartLine, RemovalState},
    services::{
        checkout::{CheckoutService, Receipt},
        menu::MenuService,
        payment_methods::PaymentMethodService,
    },
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

impl From<CartError> for ServiceError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::LineNotFound(_) => ServiceError::NotFound(err.to_string()),
            CartError::NotInRemovalMode => ServiceError::InvalidOperation(err.to_string()),
            CartError::CheckoutInProgress => ServiceError::Conflict(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    pub lines: Vec<CartLine>,
    pub total: Decimal,
    pub removal: Option<RemovalState>,
    pub payment_method_id: Option<Uuid>,
}

impl CartView {
    fn new(id: Uuid, cart: &Cart) -> Self {
        Self {
            id,
            lines: cart.lines().to_vec(),
            total: cart.total(),
            removal: cart.removal(),
            payment_method_id: cart.payment_method_id(),
        }
    }
}

#[derive(Debug)]
struct OpenCart {
    cart: Cart,
    last_touched: Instant,
}

impl OpenCart {
    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

/// Open carts by id
#[derive(Debug, Default)]
pub struct CartRegistry {
    carts: DashMap<Uuid, OpenCart>,
}

impl CartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.carts.insert(
            id,
            OpenCart {
                cart: Cart::new(),
                last_touched: Instant::now(),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.carts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carts.is_empty()
    }

    pub fn snapshot(&self, id: Uuid) -> Result<Cart, ServiceError> {
        self.carts
            .get(&id)
            .map(|open| open.cart.clone())
            .ok_or_else(|| cart_not_found(id))
    }

    /// Runs `f` against the cart while holding its entry; `f` must not await.
    /// A cart that is being checked out cannot be changed.
    pub fn with_cart<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Cart) -> Result<T, ServiceError>,
    ) -> Result<(T, CartView), ServiceError> {
        let mut entry = self.carts.get_mut(&id).ok_or_else(|| cart_not_found(id))?;
        if entry.cart.is_checking_out() {
            return Err(CartError::CheckoutInProgress.into());
        }
        entry.touch();
        let out = f(&mut entry.cart)?;
        Ok((out, CartView::new(id, &entry.cart)))
    }

    /// Freezes the cart and returns the copy that will be recorded
    pub fn begin_checkout(&self, id: Uuid) -> Result<Cart, ServiceError> {
        let mut entry = self.carts.get_mut(&id).ok_or_else(|| cart_not_found(id))?;
        entry.cart.begin_checkout()?;
        entry.touch();
        Ok(entry.cart.clone())
    }

    /// Clears the cart after a recorded sale, or unfreezes it untouched.
    /// Returns false when the cart no longer exists.
    pub fn finish_checkout(&self, id: Uuid, recorded: bool) -> bool {
        let Some(mut entry) = self.carts.get_mut(&id) else {
            return false;
        };
        if recorded {
            entry.cart.clear();
        } else {
            entry.cart.abort_checkout();
        }
        entry.touch();
        true
    }

    /// Removes the cart unless a checkout is running on it
    pub fn remove(&self, id: Uuid) -> Result<Cart, ServiceError> {
        match self.carts.remove_if(&id, |_, open| !open.cart.is_checking_out()) {
            Some((_, open)) => Ok(open.cart),
            None if self.carts.contains_key(&id) => Err(CartError::CheckoutInProgress.into()),
            None => Err(cart_not_found(id)),
        }
    }

    /// Drops carts untouched for `idle_ttl` as of `now`. Carts in checkout
    /// are kept. Returns how many were dropped.
    pub fn sweep_idle_at(&self, now: Instant, idle_ttl: Duration) -> usize {
        let mut dropped = 0;
        self.carts.retain(|_, open| {
            let keep = open.cart.is_checking_out()
                || now.saturating_duration_since(open.last_touched) < idle_ttl;
            if !keep {
                dropped += 1;
            }
            keep
        });
        dropped
    }

    pub fn sweep_idle(&self, idle_ttl: Duration) -> usize {
        self.sweep_idle_at(Instant::now(), idle_ttl)
    }
}

/// Periodically drops abandoned carts
pub async fn start_cleanup_task(registry: Arc<CartRegistry>, interval: Duration, idle_ttl: Duration) {
    let mut interval_timer = tokio::time::interval(interval);

    loop {
        interval_timer.tick().await;
        let dropped = registry.sweep_idle(idle_ttl);
        if dropped > 0 {
            info!(dropped, open = registry.len(), "Dropped idle carts");
        } else {
            debug!("Idle cart sweep completed");
        }
    }
}

fn cart_not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Cart {} not found", id))
}

/// Holds a cart frozen for checkout; unfreezes it if dropped unsettled,
/// e.g. when the request is cancelled mid-write.
struct CheckoutLease<'a> {
    registry: &'a CartRegistry,
    id: Uuid,
    settled: bool,
}

impl<'a> CheckoutLease<'a> {
    fn acquire(registry: &'a CartRegistry, id: Uuid) -> Result<(Self, Cart), ServiceError> {
        let cart = registry.begin_checkout(id)?;
        Ok((
            Self {
                registry,
                id,
                settled: false,
            },
            cart,
        ))
    }

    fn settle(mut self, recorded: bool) -> bool {
        self.settled = true;
        self.registry.finish_checkout(self.id, recorded)
    }
}

impl Drop for CheckoutLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.registry.finish_checkout(self.id, false);
        }
    }
}

#[derive(Clone)]
pub struct CartService {
    registry: Arc<CartRegistry>,
    menu: Arc<MenuService>,
    payment_methods: Arc<PaymentMethodService>,
    checkout: Arc<CheckoutService>,
}

impl CartService {
    pub fn new(
        registry: Arc<CartRegistry>,
        menu: Arc<MenuService>,
        payment_methods: Arc<PaymentMethodService>,
        checkout: Arc<CheckoutService>,
    ) -> Self {
        Self {
            registry,
            menu,
            payment_methods,
            checkout,
        }
    }

    pub fn registry(&self) -> Arc<CartRegistry> {
        self.registry.clone()
    }

    pub fn create(&self) -> CartView {
        let id = self.registry.open();
        debug!(cart_id = %id, "Cart opened");
        CartView::new(id, &Cart::new())
    }

    pub fn get(&self, id: Uuid) -> Result<CartView, ServiceError> {
        let cart = self.registry.snapshot(id)?;
        Ok(CartView::new(id, &cart))
    }

    /// Rings up one unit of an active menu item
    #[instrument(skip(self))]
    pub async fn add_item(&self, id: Uuid, menu_item_id: Uuid) -> Result<CartView, ServiceError> {
        // resolve the price before touching the cart entry
        let snapshot = self.menu.active_snapshot(menu_item_id).await?;
        let (_, view) = self.registry.with_cart(id, |cart| {
            cart.add_item(&snapshot);
            Ok(())
        })?;
        Ok(view)
    }

    pub fn toggle_remove_mode(&self, id: Uuid, menu_item_id: Uuid) -> Result<CartView, ServiceError> {
        let (_, view) = self
            .registry
            .with_cart(id, |cart| Ok(cart.trigger_remove_mode(menu_item_id)?))?;
        Ok(view)
    }

    pub fn step_removal(&self, id: Uuid, delta: i64) -> Result<CartView, ServiceError> {
        let (_, view) = self
            .registry
            .with_cart(id, |cart| Ok(cart.step_removal(delta)?))?;
        Ok(view)
    }

    /// Removes `quantity` units, defaulting to the pending removal amount
    /// for that line, or 1.
    pub fn confirm_remove(
        &self,
        id: Uuid,
        menu_item_id: Uuid,
        quantity: Option<u32>,
    ) -> Result<(u32, CartView), ServiceError> {
        if quantity == Some(0) {
            return Err(ServiceError::ValidationError(
                "Quantity to remove must be at least 1".to_string(),
            ));
        }
        self.registry.with_cart(id, |cart| {
            let quantity = quantity.unwrap_or_else(|| match cart.removal() {
                Some(state) if state.menu_item_id == menu_item_id => state.pending,
                _ => 1,
            });
            Ok(cart.confirm_remove(menu_item_id, quantity))
        })
    }

    /// Selects (or clears) the cart's payment method. The method must exist.
    pub async fn select_payment_method(
        &self,
        id: Uuid,
        payment_method_id: Option<Uuid>,
    ) -> Result<CartView, ServiceError> {
        if let Some(method_id) = payment_method_id {
            self.payment_methods.get(method_id).await?;
        }
        let (_, view) = self.registry.with_cart(id, |cart| {
            cart.select_payment_method(payment_method_id);
            Ok(())
        })?;
        Ok(view)
    }

    /// Records the cart as a sale. An explicit payment method overrides the
    /// cart's selection. The cart is frozen while the sale is written: it
    /// cannot change and cannot be checked out twice. It is cleared only
    /// after both writes succeed.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        id: Uuid,
        payment_method_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Receipt, ServiceError> {
        let (lease, cart) = CheckoutLease::acquire(&self.registry, id)?;
        let payment_method_id = payment_method_id.or(cart.payment_method_id());

        // an empty cart is rejected below without any lookup
        if let Some(method_id) = payment_method_id.filter(|_| !cart.is_empty()) {
            self.payment_methods.get(method_id).await?;
        }

        let receipt = self
            .checkout
            .checkout(&cart, payment_method_id, user_id)
            .await?;

        if !lease.settle(true) {
            warn!(cart_id = %id, sale_id = %receipt.sale.id, "Cart vanished during checkout");
        }
        info!(cart_id = %id, sale_id = %receipt.sale.id, "Cart checked out");
        Ok(receipt)
    }

    pub fn discard(&self, id: Uuid) -> Result<(), ServiceError> {
        self.registry.remove(id).map(|_| ())
    }
}
