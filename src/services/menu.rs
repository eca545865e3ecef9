use crate::{
    entities::{inventory_item, menu_item, menu_item_ingredient},
    errors::ServiceError,
    events::{Event, EventSender},
    pos::MenuItemSnapshot,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const NAME_AND_PRICE_REQUIRED: &str = "Name and price are required.";

/// Ingredient resolved through the inventory item it links to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    pub inventory_item_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItemView {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub ingredients: Vec<Ingredient>,
}

impl MenuItemView {
    fn from_model(model: menu_item::Model, ingredients: Vec<Ingredient>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            description: model.description,
            category: model.category,
            image_url: model.image_url,
            is_active: model.is_active,
            ingredients,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngredientInput {
    pub inventory_item_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[serde(default)]
    #[validate(length(max = 120))]
    pub name: String,
    pub price: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
    /// Replaces every ingredient link when present
    pub ingredients: Option<Vec<IngredientInput>>,
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price.is_sign_negative() {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn check_ingredients(ingredients: &[IngredientInput]) -> Result<(), ServiceError> {
    if ingredients.iter().any(|i| i.quantity <= Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Ingredient quantity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Menu maintenance and lookups for the till
#[derive(Clone)]
pub struct MenuService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl MenuService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Active menu items with their ingredients, ordered by name
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<MenuItemView>, ServiceError> {
        let items = menu_item::Entity::find()
            .filter(menu_item::Column::IsActive.eq(true))
            .order_by_asc(menu_item::Column::Name)
            .all(&*self.db)
            .await?;

        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let mut ingredients = self.ingredients_for(&ids).await?;

        Ok(items
            .into_iter()
            .map(|item| {
                let links = ingredients.remove(&item.id).unwrap_or_default();
                MenuItemView::from_model(item, links)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<MenuItemView, ServiceError> {
        let item = self.find_model(id).await?;
        let links = self
            .ingredients_for(&[id])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(MenuItemView::from_model(item, links))
    }

    /// Name and current price of an active item, for ringing it up
    pub async fn active_snapshot(&self, id: Uuid) -> Result<MenuItemSnapshot, ServiceError> {
        let item = self.find_model(id).await?;
        if !item.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Menu item {} is no longer available",
                item.name
            )));
        }
        Ok(MenuItemSnapshot::from(&item))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, request: CreateMenuItemRequest) -> Result<MenuItemView, ServiceError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        let price = match request.price {
            Some(price) if !name.is_empty() => price,
            _ => {
                return Err(ServiceError::ValidationError(
                    NAME_AND_PRICE_REQUIRED.to_string(),
                ))
            }
        };
        check_price(price)?;
        check_ingredients(&request.ingredients)?;

        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;
        menu_item::ActiveModel {
            id: Set(id),
            name: Set(name),
            price: Set(price),
            description: Set(request.description),
            category: Set(request.category),
            image_url: Set(request.image_url),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        replace_ingredients(&txn, id, &request.ingredients).await?;
        txn.commit().await?;

        info!(menu_item_id = %id, "Menu item created");
        self.event_sender
            .send_or_log(Event::MenuItemCreated(id))
            .await;

        self.get(id).await
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMenuItemRequest,
    ) -> Result<MenuItemView, ServiceError> {
        request.validate()?;
        if let Some(price) = request.price {
            check_price(price)?;
        }
        if let Some(ingredients) = &request.ingredients {
            check_ingredients(ingredients)?;
        }

        let existing = self.find_model(id).await?;
        let txn = self.db.begin().await?;

        let mut active: menu_item::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if request.description.is_some() {
            active.description = Set(request.description);
        }
        if request.category.is_some() {
            active.category = Set(request.category);
        }
        if request.image_url.is_some() {
            active.image_url = Set(request.image_url);
        }
        active.update(&txn).await?;

        if let Some(ingredients) = &request.ingredients {
            replace_ingredients(&txn, id, ingredients).await?;
        }
        txn.commit().await?;

        info!(menu_item_id = %id, "Menu item updated");
        self.event_sender
            .send_or_log(Event::MenuItemUpdated(id))
            .await;

        self.get(id).await
    }

    /// Soft delete: the item stays for sales history but leaves the menu
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_model(id).await?;
        let mut active: menu_item::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.update(&*self.db).await?;

        info!(menu_item_id = %id, "Menu item deactivated");
        self.event_sender
            .send_or_log(Event::MenuItemDeactivated(id))
            .await;
        Ok(())
    }

    async fn find_model(&self, id: Uuid) -> Result<menu_item::Model, ServiceError> {
        menu_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))
    }

    async fn ingredients_for(
        &self,
        menu_item_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Ingredient>>, ServiceError> {
        if menu_item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = menu_item_ingredient::Entity::find()
            .filter(menu_item_ingredient::Column::MenuItemId.is_in(menu_item_ids.to_vec()))
            .find_also_related(inventory_item::Entity)
            .all(&*self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<Ingredient>> = HashMap::new();
        for (link, inventory) in rows {
            // Links to deleted inventory items are skipped
            let Some(inventory) = inventory else { continue };
            grouped
                .entry(link.menu_item_id)
                .or_default()
                .push(Ingredient {
                    inventory_item_id: inventory.id,
                    name: inventory.name,
                    quantity: link.quantity,
                    unit: inventory.unit,
                });
        }
        Ok(grouped)
    }
}

async fn replace_ingredients<C: ConnectionTrait>(
    conn: &C,
    menu_item_id: Uuid,
    ingredients: &[IngredientInput],
) -> Result<(), ServiceError> {
    menu_item_ingredient::Entity::delete_many()
        .filter(menu_item_ingredient::Column::MenuItemId.eq(menu_item_id))
        .exec(conn)
        .await?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let links = ingredients
        .iter()
        .map(|i| menu_item_ingredient::ActiveModel {
            id: Set(Uuid::new_v4()),
            menu_item_id: Set(menu_item_id),
            inventory_item_id: Set(i.inventory_item_id),
            quantity: Set(i.quantity),
        });
    menu_item_ingredient::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn service() -> MenuService {
        let (sender, _rx) = EventSender::channel(16);
        MenuService::new(test_db().await, Arc::new(sender))
    }

    fn request(name: &str, price: Option<Decimal>) -> CreateMenuItemRequest {
        CreateMenuItemRequest {
            name: name.to_string(),
            price,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_requires_name_and_price() {
        let menu = service().await;

        let err = menu.create(request("  ", Some(dec!(10)))).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == NAME_AND_PRICE_REQUIRED);

        let err = menu.create(request("Halo-halo", None)).await.unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == NAME_AND_PRICE_REQUIRED);
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let menu = service().await;
        let err = menu
            .create(request("Lumpia", Some(dec!(-1))))
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }

    #[tokio::test]
    async fn deactivated_items_leave_the_menu_and_the_till() {
        let menu = service().await;
        let kept = menu.create(request("Pancit", Some(dec!(80)))).await.unwrap();
        let gone = menu.create(request("Lechon", Some(dec!(300)))).await.unwrap();

        menu.deactivate(gone.id).await.unwrap();

        let active = menu.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);

        assert!(menu.active_snapshot(kept.id).await.is_ok());
        assert_matches!(
            menu.active_snapshot(gone.id).await,
            Err(ServiceError::InvalidOperation(_))
        );
        // still readable directly for sales history
        assert!(!menu.get(gone.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn update_changes_only_given_fields() {
        let menu = service().await;
        let mut req = request("Sinigang", Some(dec!(150)));
        req.description = Some("Sour soup".into());
        let created = menu.create(req).await.unwrap();

        let updated = menu
            .update(
                created.id,
                UpdateMenuItemRequest {
                    price: Some(dec!(175)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price, dec!(175));
        assert_eq!(updated.name, "Sinigang");
        assert_eq!(updated.description.as_deref(), Some("Sour soup"));
    }

    #[tokio::test]
    async fn missing_item_is_not_found() {
        let menu = service().await;
        assert_matches!(
            menu.get(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            menu.deactivate(Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        );
    }
}
