// Till
pub mod carts;
pub mod checkout;

// Catalog and stock
pub mod inventory;
pub mod menu;
pub mod payment_methods;

// Bookkeeping
pub mod dashboard;
pub mod expenses;
pub mod sales;
