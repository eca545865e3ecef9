//! Fixtures shared by the unit tests.

use crate::{
    db::{establish_connection_with_config, run_migrations, DbConfig},
    entities::{menu_item, payment_method},
    services::checkout::{NewSale, NewSaleItem, Receipt, SaleStore, SeaOrmSaleStore},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;

/// Fresh, migrated in-memory database. One connection so every query sees
/// the same memory store.
pub async fn test_db() -> Arc<DatabaseConnection> {
    let db = establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("in-memory sqlite");
    run_migrations(&db).await.expect("migrations");
    Arc::new(db)
}

pub async fn seed_payment_method(db: &DatabaseConnection, name: &str) -> payment_method::Model {
    payment_method::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("payment method")
}

pub async fn seed_menu_item(db: &DatabaseConnection, name: &str, price: Decimal) -> menu_item::Model {
    menu_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        price: Set(price),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("menu item")
}

/// Writes a sale dated `date` with `(menu_item_id, quantity, price)` lines
pub async fn seed_sale(
    db: &Arc<DatabaseConnection>,
    date: NaiveDate,
    payment_method_id: Uuid,
    lines: &[(Uuid, i32, Decimal)],
) -> Receipt {
    let store = SeaOrmSaleStore::new(db.clone());
    let total = lines
        .iter()
        .map(|(_, qty, price)| *price * Decimal::from(*qty))
        .sum();
    let sale = store
        .insert_sale(NewSale {
            id: Uuid::new_v4(),
            date,
            total_amount: total,
            payment_method_id,
            user_id: None,
        })
        .await
        .expect("sale");
    let items = store
        .insert_sale_items(
            sale.id,
            lines
                .iter()
                .map(|(menu_item_id, quantity, price)| NewSaleItem {
                    menu_item_id: *menu_item_id,
                    quantity: *quantity,
                    price: *price,
                })
                .collect(),
        )
        .await
        .expect("sale items");
    Receipt { sale, items }
}
