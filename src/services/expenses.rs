use crate::{
    entities::expense,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
pub struct ExpenseQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 60))]
    pub category: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub amount: Decimal,
    /// Defaults to today
    pub date: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct ExpenseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ExpenseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Newest first, optionally bounded by an inclusive date range
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ExpenseQuery) -> Result<Vec<expense::Model>, ServiceError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ServiceError::ValidationError(
                    "Start date must not be after end date".to_string(),
                ));
            }
        }

        let mut select = expense::Entity::find();
        if let Some(from) = query.from {
            select = select.filter(expense::Column::Date.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(expense::Column::Date.lte(to));
        }

        Ok(select
            .order_by_desc(expense::Column::Date)
            .order_by_desc(expense::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self, request), fields(category = %request.category))]
    pub async fn create(&self, request: CreateExpenseRequest) -> Result<expense::Model, ServiceError> {
        request.validate()?;
        if request.category.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Category is required".to_string(),
            ));
        }
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }

        let now = Utc::now();
        let model = expense::ActiveModel {
            id: Set(Uuid::new_v4()),
            category: Set(request.category.trim().to_string()),
            description: Set(request.description.filter(|d| !d.trim().is_empty())),
            amount: Set(request.amount),
            date: Set(request.date.unwrap_or_else(|| now.date_naive())),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(expense_id = %model.id, amount = %model.amount, "Expense recorded");
        self.event_sender
            .send_or_log(Event::ExpenseRecorded {
                expense_id: model.id,
                category: model.category.clone(),
                amount: model.amount,
            })
            .await;
        Ok(model)
    }
}
