use crate::{
    entities::{menu_item, payment_method, sale, sale_item},
    errors::ServiceError,
    events::{EventSender, SaleSource},
    services::{
        checkout::{record_sale, NewSale, NewSaleItem, Receipt, SaleStore},
        menu::MenuService,
        payment_methods::PaymentMethodService,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const FILL_OUT_ALL_FIELDS: &str = "Please fill out all fields.";
pub const DEFAULT_PAGE_SIZE: u64 = 5;
/// Payment filter value that disables payment filtering
pub const ALL_PAYMENT_METHODS: &str = "All";

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct SalesQuery {
    /// Calendar date of the sale
    pub date: Option<NaiveDate>,
    /// Payment method name; "All" or absent disables the filter
    pub payment_method: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SaleLineView {
    pub menu_item_id: Uuid,
    pub menu_item_name: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl SaleLineView {
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// One sale with its payment method name and items
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleView {
    pub sale_id: Uuid,
    pub date: NaiveDate,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub payment_method_name: Option<String>,
    pub items: Vec<SaleLineView>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ManualSaleLine {
    pub menu_item_id: Option<Uuid>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ManualSaleRequest {
    pub payment_method_id: Option<Uuid>,
    #[serde(default)]
    pub items: Vec<ManualSaleLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuOption {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentOption {
    pub id: Uuid,
    pub name: String,
}

/// Choices offered by the manual sale entry form
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaleFormOptions {
    pub menu_items: Vec<MenuOption>,
    pub payment_methods: Vec<PaymentOption>,
}

#[derive(Clone)]
pub struct SalesService {
    db: Arc<DatabaseConnection>,
    store: Arc<dyn SaleStore>,
    event_sender: Arc<EventSender>,
    menu: Arc<MenuService>,
    payment_methods: Arc<PaymentMethodService>,
}

impl SalesService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        store: Arc<dyn SaleStore>,
        event_sender: Arc<EventSender>,
        menu: Arc<MenuService>,
        payment_methods: Arc<PaymentMethodService>,
    ) -> Self {
        Self {
            db,
            store,
            event_sender,
            menu,
            payment_methods,
        }
    }

    /// Newest sales first, filtered and paginated. Returns the page and the
    /// number of matching sales.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &SalesQuery) -> Result<(Vec<SaleView>, u64), ServiceError> {
        let mut select = sale::Entity::find();
        if let Some(date) = query.date {
            select = select.filter(sale::Column::Date.eq(date));
        }
        if let Some(name) = query
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != ALL_PAYMENT_METHODS)
        {
            select = select
                .join(JoinType::InnerJoin, sale::Relation::PaymentMethod.def())
                .filter(payment_method::Column::Name.eq(name));
        }

        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);

        let paginator = select
            .order_by_desc(sale::Column::CreatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let sales = paginator.fetch_page(page - 1).await?;

        Ok((self.hydrate(sales).await?, total))
    }

    /// Every sale dated within `[from, to]`, oldest first
    #[instrument(skip(self))]
    pub async fn in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SaleView>, ServiceError> {
        let sales = sale::Entity::find()
            .filter(sale::Column::Date.between(from, to))
            .order_by_asc(sale::Column::Date)
            .order_by_asc(sale::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.hydrate(sales).await
    }

    /// Distinct payment method names that appear on at least one sale
    pub async fn payment_method_names(&self) -> Result<Vec<String>, ServiceError> {
        let names: Vec<String> = payment_method::Entity::find()
            .select_only()
            .column(payment_method::Column::Name)
            .join(JoinType::InnerJoin, payment_method::Relation::Sales.def())
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;
        Ok(names.into_iter().collect::<BTreeSet<_>>().into_iter().collect())
    }

    /// Records a sale typed in by hand, priced at current menu prices
    #[instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn record_manual(
        &self,
        request: ManualSaleRequest,
        user_id: Option<Uuid>,
    ) -> Result<Receipt, ServiceError> {
        let Some(payment_method_id) = request.payment_method_id else {
            return Err(ServiceError::ValidationError(FILL_OUT_ALL_FIELDS.to_string()));
        };
        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(FILL_OUT_ALL_FIELDS.to_string()));
        }

        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            match (line.menu_item_id, line.quantity) {
                (Some(menu_item_id), Some(quantity)) if quantity >= 1 => {
                    lines.push((menu_item_id, quantity))
                }
                _ => {
                    return Err(ServiceError::ValidationError(
                        FILL_OUT_ALL_FIELDS.to_string(),
                    ))
                }
            }
        }

        self.payment_methods.get(payment_method_id).await?;

        let ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();
        let prices: HashMap<Uuid, Decimal> = menu_item::Entity::find()
            .filter(menu_item::Column::Id.is_in(ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.price))
            .collect();

        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(lines.len());
        for (menu_item_id, quantity) in lines {
            let price = *prices.get(&menu_item_id).ok_or_else(|| {
                ServiceError::NotFound(format!("Menu item {} not found", menu_item_id))
            })?;
            let quantity = i32::try_from(quantity).map_err(|_| {
                ServiceError::ValidationError("Quantity is too large".to_string())
            })?;
            total += price * Decimal::from(quantity);
            items.push(NewSaleItem {
                menu_item_id,
                quantity,
                price,
            });
        }

        let sale = NewSale {
            id: Uuid::new_v4(),
            date: Utc::now().date_naive(),
            total_amount: total,
            payment_method_id,
            user_id,
        };

        let receipt = record_sale(
            self.store.as_ref(),
            &self.event_sender,
            sale,
            items,
            SaleSource::ManualEntry,
        )
        .await?;

        info!(sale_id = %receipt.sale.id, "Sale added successfully");
        Ok(receipt)
    }

    /// Menu items and payment methods, fetched concurrently
    #[instrument(skip(self))]
    pub async fn form_options(&self) -> Result<SaleFormOptions, ServiceError> {
        let (menu_items, payment_methods) =
            tokio::try_join!(self.menu.list_active(), self.payment_methods.list())?;

        Ok(SaleFormOptions {
            menu_items: menu_items
                .into_iter()
                .map(|m| MenuOption {
                    id: m.id,
                    name: m.name,
                    price: m.price,
                })
                .collect(),
            payment_methods: payment_methods
                .into_iter()
                .map(|p| PaymentOption {
                    id: p.id,
                    name: p.name,
                })
                .collect(),
        })
    }

    async fn hydrate(&self, sales: Vec<sale::Model>) -> Result<Vec<SaleView>, ServiceError> {
        if sales.is_empty() {
            return Ok(Vec::new());
        }

        let sale_ids: Vec<Uuid> = sales.iter().map(|s| s.id).collect();
        let method_ids: Vec<Uuid> = sales
            .iter()
            .map(|s| s.payment_method_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let methods: HashMap<Uuid, String> = payment_method::Entity::find()
            .filter(payment_method::Column::Id.is_in(method_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        let rows = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.is_in(sale_ids))
            .find_also_related(menu_item::Entity)
            .all(&*self.db)
            .await?;

        let mut items: HashMap<Uuid, Vec<SaleLineView>> = HashMap::new();
        for (item, menu) in rows {
            items.entry(item.sale_id).or_default().push(SaleLineView {
                menu_item_id: item.menu_item_id,
                menu_item_name: menu.map(|m| m.name).unwrap_or_default(),
                quantity: item.quantity,
                price: item.price,
            });
        }

        Ok(sales
            .into_iter()
            .map(|s| SaleView {
                sale_id: s.id,
                date: s.date,
                total_amount: s.total_amount,
                created_at: s.created_at,
                payment_method_name: methods.get(&s.payment_method_id).cloned(),
                items: items.remove(&s.id).unwrap_or_default(),
            })
            .collect())
    }
}
