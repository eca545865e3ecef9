use crate::{
    entities::{sale, sale_item},
    errors::{ServiceError, WriteStage},
    events::{Event, EventSender, SaleSource},
    pos::Cart,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const MISSING_PAYMENT_METHOD: &str = "Please select a payment method";
pub const EMPTY_CART: &str = "Cart is empty";

/// Sale row about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub id: Uuid,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub payment_method_id: Uuid,
    pub user_id: Option<Uuid>,
}

/// Sale item row about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSaleItem {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
}

/// What a completed checkout or manual entry hands back
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Receipt {
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
}

/// Persists a sale in two separate writes: the sale row, then its items.
#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn insert_sale(&self, sale: NewSale) -> Result<sale::Model, ServiceError>;

    async fn insert_sale_items(
        &self,
        sale_id: Uuid,
        items: Vec<NewSaleItem>,
    ) -> Result<Vec<sale_item::Model>, ServiceError>;
}

/// `SaleStore` backed by the application database
#[derive(Clone)]
pub struct SeaOrmSaleStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSaleStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SaleStore for SeaOrmSaleStore {
    async fn insert_sale(&self, sale: NewSale) -> Result<sale::Model, ServiceError> {
        let model = sale::ActiveModel {
            id: Set(sale.id),
            date: Set(sale.date),
            total_amount: Set(sale.total_amount),
            payment_method_id: Set(sale.payment_method_id),
            user_id: Set(sale.user_id),
            created_at: Set(Utc::now()),
        };
        Ok(model.insert(&*self.db).await?)
    }

    async fn insert_sale_items(
        &self,
        sale_id: Uuid,
        items: Vec<NewSaleItem>,
    ) -> Result<Vec<sale_item::Model>, ServiceError> {
        let rows: Vec<sale_item::Model> = items
            .into_iter()
            .map(|item| sale_item::Model {
                id: Uuid::new_v4(),
                sale_id,
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
                price: item.price,
            })
            .collect();

        let active = rows.iter().map(|row| sale_item::ActiveModel {
            id: Set(row.id),
            sale_id: Set(row.sale_id),
            menu_item_id: Set(row.menu_item_id),
            quantity: Set(row.quantity),
            price: Set(row.price),
        });

        sale_item::Entity::insert_many(active)
            .exec_without_returning(&*self.db)
            .await?;
        Ok(rows)
    }
}

/// Runs the sale/sale-items write sequence, stopping at the first failure.
/// A failure on the items write leaves the sale row in place.
pub(crate) async fn record_sale(
    store: &dyn SaleStore,
    event_sender: &EventSender,
    sale: NewSale,
    items: Vec<NewSaleItem>,
    source: SaleSource,
) -> Result<Receipt, ServiceError> {
    let sale_id = sale.id;

    let sale = store.insert_sale(sale).await.map_err(|e| {
        error!(sale_id = %sale_id, error = %e, "Failed to record sale");
        ServiceError::write_failed(WriteStage::Sale, e)
    })?;

    let items = store.insert_sale_items(sale.id, items).await.map_err(|e| {
        error!(sale_id = %sale.id, error = %e, "Failed to record sale items");
        ServiceError::write_failed(WriteStage::SaleItems, e)
    })?;

    counter!("pos.sales.recorded", 1);
    event_sender
        .send_or_log(Event::SaleRecorded {
            sale_id: sale.id,
            date: sale.date,
            total_amount: sale.total_amount,
            item_count: items.len(),
            source,
        })
        .await;

    Ok(Receipt { sale, items })
}

/// Turns a till cart into a recorded sale
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn SaleStore>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn SaleStore>, event_sender: Arc<EventSender>) -> Self {
        Self {
            store,
            event_sender,
        }
    }

    /// Records the cart as a sale dated today.
    ///
    /// Nothing is written when the payment method is missing or the cart is
    /// empty. The cart itself is never modified here; the caller clears it
    /// once this returns `Ok`.
    #[instrument(skip(self, cart), fields(lines = cart.lines().len()))]
    pub async fn checkout(
        &self,
        cart: &Cart,
        payment_method_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Receipt, ServiceError> {
        let Some(payment_method_id) = payment_method_id else {
            return Err(self.reject(MISSING_PAYMENT_METHOD).await);
        };
        if cart.is_empty() {
            return Err(self.reject(EMPTY_CART).await);
        }

        let items = cart
            .lines()
            .iter()
            .map(|line| {
                Ok(NewSaleItem {
                    menu_item_id: line.menu_item_id,
                    quantity: i32::try_from(line.quantity).map_err(|_| {
                        ServiceError::ValidationError(format!(
                            "Quantity for {} is too large",
                            line.name
                        ))
                    })?,
                    price: line.price,
                })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        let sale = NewSale {
            id: Uuid::new_v4(),
            date: Utc::now().date_naive(),
            total_amount: cart.total(),
            payment_method_id,
            user_id,
        };

        let receipt = record_sale(
            self.store.as_ref(),
            &self.event_sender,
            sale,
            items,
            SaleSource::Checkout,
        )
        .await?;

        info!(
            sale_id = %receipt.sale.id,
            total_amount = %receipt.sale.total_amount,
            "Transaction complete"
        );
        Ok(receipt)
    }

    async fn reject(&self, reason: &str) -> ServiceError {
        warn!(reason, "Checkout rejected");
        counter!("pos.checkout.rejected", 1);
        self.event_sender
            .send_or_log(Event::CheckoutRejected {
                cart_id: None,
                reason: reason.to_string(),
            })
            .await;
        ServiceError::ValidationError(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::MenuItemSnapshot;
    use assert_matches::assert_matches;
    use mockall::{mock, predicate::*};
    use rust_decimal_macros::dec;

    mock! {
        pub Store {}

        #[async_trait]
        impl SaleStore for Store {
            async fn insert_sale(&self, sale: NewSale) -> Result<sale::Model, ServiceError>;
            async fn insert_sale_items(
                &self,
                sale_id: Uuid,
                items: Vec<NewSaleItem>,
            ) -> Result<Vec<sale_item::Model>, ServiceError>;
        }
    }

    fn service(store: MockStore) -> CheckoutService {
        let (sender, _rx) = EventSender::channel(16);
        CheckoutService::new(Arc::new(store), Arc::new(sender))
    }

    fn item(name: &str, price: Decimal) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
        }
    }

    fn stored_sale(sale: NewSale) -> sale::Model {
        sale::Model {
            id: sale.id,
            date: sale.date,
            total_amount: sale.total_amount,
            payment_method_id: sale.payment_method_id,
            user_id: sale.user_id,
            created_at: Utc::now(),
        }
    }

    fn stored_items(sale_id: Uuid, items: Vec<NewSaleItem>) -> Vec<sale_item::Model> {
        items
            .into_iter()
            .map(|i| sale_item::Model {
                id: Uuid::new_v4(),
                sale_id,
                menu_item_id: i.menu_item_id,
                quantity: i.quantity,
                price: i.price,
            })
            .collect()
    }

    #[tokio::test]
    async fn missing_payment_method_performs_no_writes() {
        let mut store = MockStore::new();
        store.expect_insert_sale().times(0);
        store.expect_insert_sale_items().times(0);

        let mut cart = Cart::new();
        cart.add_item(&item("Adobo", dec!(50)));

        let err = service(store).checkout(&cart, None, None).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == MISSING_PAYMENT_METHOD);
    }

    #[tokio::test]
    async fn empty_cart_performs_no_writes() {
        let mut store = MockStore::new();
        store.expect_insert_sale().times(0);
        store.expect_insert_sale_items().times(0);

        let err = service(store)
            .checkout(&Cart::new(), Some(Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == EMPTY_CART);
    }

    #[tokio::test]
    async fn checkout_writes_sale_then_items_with_captured_prices() {
        let a = item("A", dec!(50));
        let b = item("B", dec!(30));
        let mut cart = Cart::new();
        cart.add_item(&a);
        cart.add_item(&a);
        cart.add_item(&b);

        let payment_method_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let (a_id, b_id) = (a.id, b.id);

        let mut seq = mockall::Sequence::new();
        let mut store = MockStore::new();
        store
            .expect_insert_sale()
            .withf(move |s| {
                s.total_amount == dec!(130)
                    && s.payment_method_id == payment_method_id
                    && s.user_id == Some(user_id)
                    && s.date == Utc::now().date_naive()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|s| Ok(stored_sale(s)));
        store
            .expect_insert_sale_items()
            .withf(move |_, items| {
                items
                    == &vec![
                        NewSaleItem {
                            menu_item_id: a_id,
                            quantity: 2,
                            price: dec!(50),
                        },
                        NewSaleItem {
                            menu_item_id: b_id,
                            quantity: 1,
                            price: dec!(30),
                        },
                    ]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|sale_id, items| Ok(stored_items(sale_id, items)));

        let receipt = service(store)
            .checkout(&cart, Some(payment_method_id), Some(user_id))
            .await
            .unwrap();

        assert_eq!(receipt.sale.total_amount, dec!(130));
        assert_eq!(receipt.items.len(), 2);
        assert!(receipt.items.iter().all(|i| i.sale_id == receipt.sale.id));
        // the cart is the caller's to clear
        assert_eq!(cart.lines().len(), 2);
    }

    #[tokio::test]
    async fn sale_write_failure_stops_before_items() {
        let mut store = MockStore::new();
        store
            .expect_insert_sale()
            .times(1)
            .returning(|_| Err(ServiceError::db_error("connection reset")));
        store.expect_insert_sale_items().times(0);

        let mut cart = Cart::new();
        cart.add_item(&item("A", dec!(10)));

        let err = service(store)
            .checkout(&cart, Some(Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::WriteFailed {
                stage: WriteStage::Sale,
                ..
            }
        );
    }

    #[tokio::test]
    async fn items_write_failure_names_the_items_stage() {
        let mut store = MockStore::new();
        store
            .expect_insert_sale()
            .times(1)
            .returning(|s| Ok(stored_sale(s)));
        store
            .expect_insert_sale_items()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Err(ServiceError::db_error("constraint failed")));

        let mut cart = Cart::new();
        cart.add_item(&item("A", dec!(10)));

        let err = service(store)
            .checkout(&cart, Some(Uuid::new_v4()), None)
            .await
            .unwrap_err();
        assert_eq!(err.response_message(), "Failed to record sale items.");
    }
}
