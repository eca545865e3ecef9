use crate::{
    entities::inventory_item,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const REQUIRED_FIELDS: &str = "Please fill out all required fields.";
pub const DEFAULT_PAGE_SIZE: u64 = 6;

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct InventoryQuery {
    /// Case-insensitive substring of the item name
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInventoryItemRequest {
    #[serde(default)]
    #[validate(length(max = 120))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub unit: String,
    pub quantity: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
    pub cost_per_unit: Option<Decimal>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInventoryItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    pub quantity: Option<Decimal>,
    pub reorder_level: Option<Decimal>,
    pub cost_per_unit: Option<Decimal>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
}

fn non_negative(field: &str, value: Decimal) -> Result<Decimal, ServiceError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            field
        )));
    }
    Ok(value)
}

#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Most recently updated first. Returns the page and the total match count.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: &InventoryQuery,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        let mut select = inventory_item::Entity::find();

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(inventory_item::Column::Name))).like(pattern),
            );
        }
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            select = select.filter(inventory_item::Column::Category.eq(category));
        }

        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = query.page.unwrap_or(1).max(1);

        let paginator = select
            .order_by_desc(inventory_item::Column::UpdatedAt)
            .paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        inventory_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreateInventoryItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;

        let name = request.name.trim().to_string();
        let unit = request.unit.trim().to_string();
        let (Some(quantity), Some(reorder_level), Some(cost_per_unit)) =
            (request.quantity, request.reorder_level, request.cost_per_unit)
        else {
            return Err(ServiceError::ValidationError(REQUIRED_FIELDS.to_string()));
        };
        if name.is_empty() || unit.is_empty() {
            return Err(ServiceError::ValidationError(REQUIRED_FIELDS.to_string()));
        }

        let item = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            unit: Set(unit),
            quantity: Set(non_negative("Quantity", quantity)?),
            reorder_level: Set(non_negative("Reorder level", reorder_level)?),
            cost_per_unit: Set(non_negative("Cost per unit", cost_per_unit)?),
            category: Set(request.category.filter(|c| !c.trim().is_empty())),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(item_id = %item.id, "Inventory item created");
        self.event_sender
            .send_or_log(Event::InventoryItemCreated(item.id))
            .await;
        if item.is_low_stock() {
            self.notify_low_stock(&item).await;
        }

        Ok(item)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateInventoryItemRequest,
    ) -> Result<inventory_item::Model, ServiceError> {
        request.validate()?;
        let existing = self.get(id).await?;
        let was_low = existing.is_low_stock();

        let mut active: inventory_item::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit.trim().to_string());
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(non_negative("Quantity", quantity)?);
        }
        if let Some(reorder_level) = request.reorder_level {
            active.reorder_level = Set(non_negative("Reorder level", reorder_level)?);
        }
        if let Some(cost_per_unit) = request.cost_per_unit {
            active.cost_per_unit = Set(non_negative("Cost per unit", cost_per_unit)?);
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category).filter(|c| !c.trim().is_empty()));
        }

        let item = active.update(&*self.db).await?;

        info!(item_id = %item.id, "Inventory item updated");
        self.event_sender
            .send_or_log(Event::InventoryItemUpdated(item.id))
            .await;
        if !was_low && item.is_low_stock() {
            self.notify_low_stock(&item).await;
        }

        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = inventory_item::Entity::delete_by_id(id)
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }

        info!(item_id = %id, "Inventory item deleted");
        self.event_sender
            .send_or_log(Event::InventoryItemDeleted(id))
            .await;
        Ok(())
    }

    /// Distinct non-empty categories, sorted
    pub async fn categories(&self) -> Result<Vec<String>, ServiceError> {
        let categories: Vec<Option<String>> = inventory_item::Entity::find()
            .select_only()
            .column(inventory_item::Column::Category)
            .filter(inventory_item::Column::Category.is_not_null())
            .distinct()
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(categories
            .into_iter()
            .flatten()
            .filter(|c| !c.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }

    /// Items at or below their reorder level, by name
    pub async fn low_stock(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let items = inventory_item::Entity::find()
            .filter(
                Expr::col(inventory_item::Column::Quantity)
                    .lte(Expr::col(inventory_item::Column::ReorderLevel)),
            )
            .order_by_asc(inventory_item::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    /// Items created on any calendar day (UTC) within `[from, to]`, oldest first
    #[instrument(skip(self))]
    pub async fn created_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        let start = from.and_time(NaiveTime::MIN).and_utc();
        let end = to
            .succ_opt()
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .ok_or_else(|| ServiceError::ValidationError("End date is out of range".to_string()))?;

        Ok(inventory_item::Entity::find()
            .filter(inventory_item::Column::CreatedAt.gte(start))
            .filter(inventory_item::Column::CreatedAt.lt(end))
            .order_by_asc(inventory_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Sum of quantities across every item regardless of unit
    pub async fn total_stock(&self) -> Result<Decimal, ServiceError> {
        let items = inventory_item::Entity::find().all(&*self.db).await?;
        Ok(total_stock(&items))
    }

    async fn notify_low_stock(&self, item: &inventory_item::Model) {
        self.event_sender
            .send_or_log(Event::InventoryLowStock {
                item_id: item.id,
                name: item.name.clone(),
                quantity: item.quantity,
                reorder_level: item.reorder_level,
            })
            .await;
    }
}

pub fn total_stock(items: &[inventory_item::Model]) -> Decimal {
    items.iter().map(|i| i.quantity).sum()
}
