use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::menu_item;

/// Menu item as captured at the moment it is rung up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl From<&menu_item::Model> for MenuItemSnapshot {
    fn from(item: &menu_item::Model) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub name: String,
    /// Unit price captured when the line was first added
    pub price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The line currently being removed and how many units are pending removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RemovalState {
    pub menu_item_id: Uuid,
    pub pending: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Item {0} is not in the cart")]
    LineNotFound(Uuid),
    #[error("No cart line is in removal mode")]
    NotInRemovalMode,
    #[error("Cart is being checked out")]
    CheckoutInProgress,
}

/// An in-memory till cart. At most one line per menu item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    removal: Option<RemovalState>,
    payment_method_id: Option<Uuid>,
    checking_out: bool,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, menu_item_id: Uuid) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.menu_item_id == menu_item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn removal(&self) -> Option<RemovalState> {
        self.removal
    }

    pub fn payment_method_id(&self) -> Option<Uuid> {
        self.payment_method_id
    }

    pub fn is_checking_out(&self) -> bool {
        self.checking_out
    }

    /// Freezes the cart for a checkout. Only one checkout may run at a time.
    pub fn begin_checkout(&mut self) -> Result<(), CartError> {
        if self.checking_out {
            return Err(CartError::CheckoutInProgress);
        }
        self.checking_out = true;
        Ok(())
    }

    /// Unfreezes the cart after a failed checkout, leaving its lines as they were
    pub fn abort_checkout(&mut self) {
        self.checking_out = false;
    }

    pub fn select_payment_method(&mut self, payment_method_id: Option<Uuid>) {
        self.payment_method_id = payment_method_id;
    }

    /// Adds one unit, creating the line at quantity 1 if needed.
    /// An existing line keeps its original price.
    pub fn add_item(&mut self, item: &MenuItemSnapshot) -> &CartLine {
        let idx = match self.lines.iter().position(|l| l.menu_item_id == item.id) {
            Some(idx) => {
                self.lines[idx].quantity = self.lines[idx].quantity.saturating_add(1);
                idx
            }
            None => {
                self.lines.push(CartLine {
                    menu_item_id: item.id,
                    name: item.name.clone(),
                    price: item.price,
                    quantity: 1,
                });
                self.lines.len() - 1
            }
        };
        &self.lines[idx]
    }

    /// Enters removal mode for a line with one unit pending, or leaves it
    /// when that line is already in removal mode. Entering on one line
    /// replaces removal mode on any other.
    pub fn trigger_remove_mode(&mut self, menu_item_id: Uuid) -> Result<Option<RemovalState>, CartError> {
        if self.line(menu_item_id).is_none() {
            return Err(CartError::LineNotFound(menu_item_id));
        }

        self.removal = match self.removal {
            Some(state) if state.menu_item_id == menu_item_id => None,
            _ => Some(RemovalState {
                menu_item_id,
                pending: 1,
            }),
        };
        Ok(self.removal)
    }

    /// Moves the pending removal amount by `delta`, kept within 1..=line quantity.
    pub fn step_removal(&mut self, delta: i64) -> Result<RemovalState, CartError> {
        let mut state = self.removal.ok_or(CartError::NotInRemovalMode)?;
        let max = self
            .line(state.menu_item_id)
            .map(|l| l.quantity)
            .ok_or(CartError::LineNotFound(state.menu_item_id))?;

        let next = (i64::from(state.pending) + delta).clamp(1, i64::from(max.max(1)));
        state.pending = u32::try_from(next).unwrap_or(1);
        self.removal = Some(state);
        Ok(state)
    }

    /// Removes up to `quantity` units from a line and leaves removal mode.
    /// Returns the number of units actually removed; an unknown id removes nothing.
    pub fn confirm_remove(&mut self, menu_item_id: Uuid, quantity: u32) -> u32 {
        let Some(idx) = self.lines.iter().position(|l| l.menu_item_id == menu_item_id) else {
            return 0;
        };

        self.removal = None;
        let current = self.lines[idx].quantity;
        let removed = quantity.min(current);
        if removed >= current {
            self.lines.remove(idx);
        } else {
            self.lines[idx].quantity -= removed;
        }
        removed
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Empties the cart and forgets the selected payment method
    pub fn clear(&mut self) {
        self.lines.clear();
        self.removal = None;
        self.payment_method_id = None;
        self.checking_out = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(name: &str, price: Decimal) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
        }
    }

    #[test]
    fn adding_twice_yields_one_line_with_quantity_two() {
        let mut cart = Cart::new();
        let adobo = snapshot("Adobo", dec!(50));
        cart.add_item(&adobo);
        cart.add_item(&adobo);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn repeat_add_keeps_the_first_captured_price() {
        let mut cart = Cart::new();
        let mut sisig = snapshot("Sisig", dec!(120));
        cart.add_item(&sisig);
        sisig.price = dec!(150);
        cart.add_item(&sisig);

        assert_eq!(cart.line(sisig.id).unwrap().price, dec!(120));
        assert_eq!(cart.total(), dec!(240));
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(50));
        let b = snapshot("B", dec!(30));
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);

        assert_eq!(cart.total(), dec!(130));
    }

    #[test]
    fn trigger_remove_mode_toggles_and_resets_pending() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&a);

        let state = cart.trigger_remove_mode(a.id).unwrap().unwrap();
        assert_eq!(state.pending, 1);
        cart.step_removal(1).unwrap();
        assert_eq!(cart.removal().unwrap().pending, 2);

        assert_eq!(cart.trigger_remove_mode(a.id).unwrap(), None);
        let state = cart.trigger_remove_mode(a.id).unwrap().unwrap();
        assert_eq!(state.pending, 1);
    }

    #[test]
    fn only_one_line_is_in_removal_mode() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        let b = snapshot("B", dec!(20));
        cart.add_item(&a);
        cart.add_item(&b);

        cart.trigger_remove_mode(a.id).unwrap();
        cart.trigger_remove_mode(b.id).unwrap();
        assert_eq!(cart.removal().unwrap().menu_item_id, b.id);
    }

    #[test]
    fn trigger_remove_mode_on_missing_line_fails() {
        let mut cart = Cart::new();
        let id = Uuid::new_v4();
        assert_eq!(
            cart.trigger_remove_mode(id),
            Err(CartError::LineNotFound(id))
        );
    }

    #[test]
    fn step_removal_is_clamped_to_line_quantity() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        cart.add_item(&a);
        cart.add_item(&a);

        cart.trigger_remove_mode(a.id).unwrap();
        assert_eq!(cart.step_removal(-5).unwrap().pending, 1);
        assert_eq!(cart.step_removal(10).unwrap().pending, 2);
    }

    #[test]
    fn step_removal_without_removal_mode_fails() {
        let mut cart = Cart::new();
        assert_eq!(cart.step_removal(1), Err(CartError::NotInRemovalMode));
    }

    #[test]
    fn removing_less_than_quantity_decrements() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        for _ in 0..3 {
            cart.add_item(&a);
        }
        cart.trigger_remove_mode(a.id).unwrap();

        assert_eq!(cart.confirm_remove(a.id, 2), 2);
        assert_eq!(cart.line(a.id).unwrap().quantity, 1);
        assert!(cart.removal().is_none());
    }

    #[test]
    fn removing_at_least_quantity_deletes_the_line() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        cart.add_item(&a);
        cart.add_item(&a);

        assert_eq!(cart.confirm_remove(a.id, 5), 2);
        assert!(cart.line(a.id).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn confirm_remove_on_unknown_id_is_a_no_op() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        cart.add_item(&a);
        cart.trigger_remove_mode(a.id).unwrap();

        assert_eq!(cart.confirm_remove(Uuid::new_v4(), 1), 0);
        assert_eq!(cart.line(a.id).unwrap().quantity, 1);
        assert!(cart.removal().is_some());
    }

    #[test]
    fn clear_resets_everything() {
        let mut cart = Cart::new();
        let a = snapshot("A", dec!(10));
        cart.add_item(&a);
        cart.trigger_remove_mode(a.id).unwrap();
        cart.select_payment_method(Some(Uuid::new_v4()));

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.removal().is_none());
        assert!(cart.payment_method_id().is_none());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn only_one_checkout_runs_at_a_time() {
        let mut cart = Cart::new();
        cart.add_item(&snapshot("A", dec!(10)));

        cart.begin_checkout().unwrap();
        assert!(cart.is_checking_out());
        assert_eq!(cart.begin_checkout(), Err(CartError::CheckoutInProgress));

        cart.abort_checkout();
        assert!(!cart.is_checking_out());
        assert_eq!(cart.lines().len(), 1);

        cart.begin_checkout().unwrap();
        cart.clear();
        assert!(!cart.is_checking_out());
    }
}
