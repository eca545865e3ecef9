//! Back-office commands for a restaurant POS deployment.
//!
//! ```text
//! pos-admin migrate
//! pos-admin seed
//! pos-admin token --user-id <uuid>
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal_macros::dec;
use tracing::{info, warn};
use uuid::Uuid;

use restaurant_pos::{
    auth::SessionAuth,
    config::{self, AppConfig},
    db::{self, DbPool},
    errors::ServiceError,
    events::{self, EventSender},
    services::{
        inventory::{CreateInventoryItemRequest, InventoryService},
        menu::{CreateMenuItemRequest, IngredientInput, MenuService},
        payment_methods::{CreatePaymentMethodRequest, PaymentMethodService},
    },
};

#[derive(Parser, Debug)]
#[command(name = "pos-admin", version, about = "Restaurant POS administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Insert default payment methods and a sample menu
    Seed,
    /// Mint a session token for a till terminal
    Token {
        #[arg(long)]
        user_id: Uuid,
    },
}

const DEFAULT_PAYMENT_METHODS: [&str; 3] = ["Cash", "GCash", "Card"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    match cli.command {
        Commands::Migrate => {
            let pool = connect(&cfg).await?;
            db::run_migrations(&pool).await?;
            info!("Migrations applied");
        }
        Commands::Seed => {
            let pool = connect(&cfg).await?;
            db::run_migrations(&pool).await?;
            seed(Arc::new(pool)).await?;
        }
        Commands::Token { user_id } => {
            let token = SessionAuth::from_config(&cfg)
                .issue_token(user_id)
                .context("failed to sign session token")?;
            println!("{}", token);
        }
    }

    Ok(())
}

async fn connect(cfg: &AppConfig) -> Result<DbPool> {
    db::establish_connection_from_app_config(cfg)
        .await
        .context("failed to connect to the database")
}

async fn seed(db: Arc<DbPool>) -> Result<()> {
    let (sender, rx) = EventSender::channel(256);
    let sender = Arc::new(sender);
    tokio::spawn(events::process_events(rx));

    let payment_methods = PaymentMethodService::new(db.clone(), sender.clone());
    for name in DEFAULT_PAYMENT_METHODS {
        match payment_methods
            .create(CreatePaymentMethodRequest {
                name: name.to_string(),
            })
            .await
        {
            Ok(method) => info!(name = %method.name, "Payment method added"),
            Err(ServiceError::Conflict(_)) => warn!(name, "Payment method already exists"),
            Err(err) => return Err(err.into()),
        }
    }

    let inventory = InventoryService::new(db.clone(), sender.clone());
    let pork = inventory
        .create(CreateInventoryItemRequest {
            name: "Pork Belly".into(),
            unit: "kg".into(),
            quantity: Some(dec!(12)),
            reorder_level: Some(dec!(3)),
            cost_per_unit: Some(dec!(320)),
            category: Some("Meat".into()),
        })
        .await?;
    let rice = inventory
        .create(CreateInventoryItemRequest {
            name: "Rice".into(),
            unit: "kg".into(),
            quantity: Some(dec!(25)),
            reorder_level: Some(dec!(5)),
            cost_per_unit: Some(dec!(52)),
            category: Some("Dry Goods".into()),
        })
        .await?;

    let menu = MenuService::new(db, sender);
    let samples = [
        ("Pork Adobo", dec!(120), Some("Mains"), vec![(pork.id, dec!(0.2)), (rice.id, dec!(0.15))]),
        ("Garlic Rice", dec!(35), Some("Sides"), vec![(rice.id, dec!(0.15))]),
        ("Iced Tea", dec!(45), Some("Drinks"), Vec::new()),
    ];
    for (name, price, category, ingredients) in samples {
        let item = menu
            .create(CreateMenuItemRequest {
                name: name.to_string(),
                price: Some(price),
                category: category.map(str::to_string),
                ingredients: ingredients
                    .into_iter()
                    .map(|(inventory_item_id, quantity)| IngredientInput {
                        inventory_item_id,
                        quantity,
                    })
                    .collect(),
                ..Default::default()
            })
            .await?;
        info!(name = %item.name, price = %item.price, "Menu item added");
    }

    info!("Seed complete");
    Ok(())
}
