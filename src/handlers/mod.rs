pub mod carts;
pub mod common;
pub mod dashboard;
pub mod expenses;
pub mod health;
pub mod inventory;
pub mod menu;
pub mod payment_methods;
pub mod reports;
pub mod sales;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    reports::ReportService,
    services::{
        carts::{CartRegistry, CartService},
        checkout::{CheckoutService, SaleStore, SeaOrmSaleStore},
        dashboard::DashboardService,
        expenses::ExpenseService,
        inventory::InventoryService,
        menu::MenuService,
        payment_methods::PaymentMethodService,
        sales::SalesService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub menu: Arc<MenuService>,
    pub inventory: Arc<InventoryService>,
    pub payment_methods: Arc<PaymentMethodService>,
    pub expenses: Arc<ExpenseService>,
    pub sales: Arc<SalesService>,
    pub dashboard: Arc<DashboardService>,
    pub checkout: Arc<CheckoutService>,
    pub carts: Arc<CartService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        let store: Arc<dyn SaleStore> = Arc::new(SeaOrmSaleStore::new(db_pool.clone()));
        Self::with_sale_store(db_pool, event_sender, config, store)
    }

    /// Same as [`AppServices::new`] with a caller-supplied sale store
    pub fn with_sale_store(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
        store: Arc<dyn SaleStore>,
    ) -> Self {
        let menu = Arc::new(MenuService::new(db_pool.clone(), event_sender.clone()));
        let inventory = Arc::new(InventoryService::new(db_pool.clone(), event_sender.clone()));
        let payment_methods = Arc::new(PaymentMethodService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let expenses = Arc::new(ExpenseService::new(db_pool.clone(), event_sender.clone()));
        let sales = Arc::new(SalesService::new(
            db_pool.clone(),
            store.clone(),
            event_sender.clone(),
            menu.clone(),
            payment_methods.clone(),
        ));
        let dashboard = Arc::new(DashboardService::new(db_pool));
        let checkout = Arc::new(CheckoutService::new(store, event_sender.clone()));
        let carts = Arc::new(CartService::new(
            Arc::new(CartRegistry::new()),
            menu.clone(),
            payment_methods.clone(),
            checkout.clone(),
        ));
        let reports = Arc::new(ReportService::new(
            sales.clone(),
            inventory.clone(),
            event_sender,
            config.business_name.clone(),
        ));

        Self {
            menu,
            inventory,
            payment_methods,
            expenses,
            sales,
            dashboard,
            checkout,
            carts,
            reports,
        }
    }
}
