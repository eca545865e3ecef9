use crate::{
    entities::payment_method,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentMethodRequest {
    #[validate(length(min = 1, max = 60))]
    pub name: String,
}

#[derive(Clone)]
pub struct PaymentMethodService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PaymentMethodService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<payment_method::Model>, ServiceError> {
        Ok(payment_method::Entity::find()
            .order_by_asc(payment_method::Column::Name)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<payment_method::Model, ServiceError> {
        payment_method::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment method {} not found", id)))
    }

    /// Names are unique ignoring case and surrounding whitespace
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        request: CreatePaymentMethodRequest,
    ) -> Result<payment_method::Model, ServiceError> {
        let name = request.name.trim().to_string();
        CreatePaymentMethodRequest { name: name.clone() }.validate()?;

        let duplicate = payment_method::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(payment_method::Column::Name)))
                    .eq(name.to_lowercase()),
            )
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Payment method {} already exists",
                name
            )));
        }

        let model = payment_method::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        info!(payment_method_id = %model.id, "Payment method created");
        self.event_sender
            .send_or_log(Event::PaymentMethodCreated(model.id))
            .await;
        Ok(model)
    }
}
