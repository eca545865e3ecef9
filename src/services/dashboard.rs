use crate::{
    entities::{expense, payment_method, sale},
    errors::ServiceError,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

pub const RECENT_MONTHS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AmountByName {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShareByName {
    pub name: String,
    pub amount: Decimal,
    /// Percent of the series total, two decimal places
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardSummary {
    pub month: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub cashflow_by_payment_method: Vec<AmountByName>,
    pub income_by_payment_method: Vec<ShareByName>,
    pub expenses_by_category: Vec<ShareByName>,
    /// Months selectable on the dashboard, newest first
    pub recent_months: Vec<String>,
}

/// First and last calendar day of a `YYYY-MM` month
pub fn month_range(month: &str) -> Result<(NaiveDate, NaiveDate), ServiceError> {
    let invalid = || ServiceError::ValidationError(format!("Invalid month '{}', expected YYYY-MM", month));

    let (year, mon) = month.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || mon.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let mon: u32 = mon.parse().map_err(|_| invalid())?;

    let start = NaiveDate::from_ymd_opt(year, mon, 1).ok_or_else(invalid)?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((start, end))
}

/// `count` months ending at the month of `today`, newest first
pub fn recent_months_from(today: NaiveDate, count: usize) -> Vec<String> {
    let first = today.with_day(1).unwrap_or(today);
    (0..count)
        .filter_map(|i| first.checked_sub_months(Months::new(i as u32)))
        .map(|d| format!("{:04}-{:02}", d.year(), d.month()))
        .collect()
}

pub fn recent_months(count: usize) -> Vec<String> {
    recent_months_from(Utc::now().date_naive(), count)
}

/// Sums amounts per name, largest first (ties by name)
pub fn totals_by_name<I>(entries: I) -> Vec<AmountByName>
where
    I: IntoIterator<Item = (String, Decimal)>,
{
    let mut sums: HashMap<String, Decimal> = HashMap::new();
    for (name, amount) in entries {
        *sums.entry(name).or_default() += amount;
    }

    let mut rows: Vec<AmountByName> = sums
        .into_iter()
        .map(|(name, amount)| AmountByName { name, amount })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.name.cmp(&b.name)));
    rows
}

/// Attaches each row's share of the total. Empty when the total is zero.
pub fn with_percentages(rows: Vec<AmountByName>) -> Vec<ShareByName> {
    let total: Decimal = rows.iter().map(|r| r.amount).sum();
    if total.is_zero() {
        return Vec::new();
    }

    rows.into_iter()
        .map(|r| ShareByName {
            percentage: (r.amount * Decimal::ONE_HUNDRED / total).round_dp(2),
            name: r.name,
            amount: r.amount,
        })
        .collect()
}

/// Month-level aggregations over sales and expenses
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Σ sale totals per payment method within `[from, to]`
    #[instrument(skip(self))]
    pub async fn cashflow_by_payment_method(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AmountByName>, ServiceError> {
        let sales = sale::Entity::find()
            .filter(sale::Column::Date.between(from, to))
            .all(&*self.db)
            .await?;

        let names: HashMap<Uuid, String> = payment_method::Entity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        Ok(totals_by_name(sales.into_iter().map(|s| {
            let name = names
                .get(&s.payment_method_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string());
            (name, s.total_amount)
        })))
    }

    #[instrument(skip(self))]
    pub async fn income_percentage_by_payment_method(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShareByName>, ServiceError> {
        Ok(with_percentages(
            self.cashflow_by_payment_method(from, to).await?,
        ))
    }

    #[instrument(skip(self))]
    pub async fn expense_percentage_by_category(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ShareByName>, ServiceError> {
        let expenses = expense::Entity::find()
            .filter(expense::Column::Date.between(from, to))
            .all(&*self.db)
            .await?;

        Ok(with_percentages(totals_by_name(
            expenses.into_iter().map(|e| (e.category, e.amount)),
        )))
    }

    /// All dashboard series for one `YYYY-MM` month
    #[instrument(skip(self))]
    pub async fn summary(&self, month: &str) -> Result<DashboardSummary, ServiceError> {
        let (from, to) = month_range(month)?;

        let (cashflow, expenses) = tokio::try_join!(
            self.cashflow_by_payment_method(from, to),
            self.expense_percentage_by_category(from, to),
        )?;

        let total_income = cashflow.iter().map(|r| r.amount).sum();
        let total_expenses = expenses.iter().map(|r| r.amount).sum();

        Ok(DashboardSummary {
            month: month.trim().to_string(),
            from,
            to,
            total_income,
            total_expenses,
            income_by_payment_method: with_percentages(cashflow.clone()),
            cashflow_by_payment_method: cashflow,
            expenses_by_category: expenses,
            recent_months: recent_months(RECENT_MONTHS),
        })
    }
}
