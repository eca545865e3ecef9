//! Till-side domain logic that never touches the database.

pub mod cart;

pub use cart::{Cart, CartError, CartLine, MenuItemSnapshot, RemovalState};
