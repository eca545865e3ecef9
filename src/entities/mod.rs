pub mod expense;
pub mod inventory_item;
pub mod menu_item;
pub mod menu_item_ingredient;
pub mod payment_method;
pub mod sale;
pub mod sale_item;
