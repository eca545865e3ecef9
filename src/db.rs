use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement,
};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        ServiceError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations against the pool
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Cheap round trip used by the readiness probe
pub async fn ping(pool: &DbPool) -> Result<(), DbErr> {
    let backend = pool.get_database_backend();
    pool.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_pool() -> Result<DbPool, ServiceError> {
        establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
    }

    #[tokio::test]
    async fn test_establish_connection() {
        let pool = setup_test_pool().await.expect("in-memory sqlite");
        assert!(ping(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = setup_test_pool().await.expect("in-memory sqlite");
        assert!(run_migrations(&pool).await.is_ok());
        assert!(run_migrations(&pool).await.is_ok());
    }

    #[tokio::test]
    async fn migrated_file_database_survives_reconnect() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("pos.db").display()
        );

        let pool = establish_connection(&url).await.expect("file sqlite");
        run_migrations(&pool).await.expect("migrations");
        pool.close().await.expect("close");

        let reopened = establish_connection(&url).await.expect("reopen");
        let backend = reopened.get_database_backend();
        let row = reopened
            .query_one(Statement::from_string(
                backend,
                "SELECT COUNT(*) AS n FROM payment_methods".to_string(),
            ))
            .await
            .expect("query")
            .expect("row");
        assert_eq!(row.try_get::<i64>("", "n").expect("count"), 0);
    }

    #[tokio::test]
    async fn sales_must_reference_existing_rows() {
        use crate::services::checkout::{NewSale, NewSaleItem, SaleStore, SeaOrmSaleStore};
        use crate::test_support::{seed_menu_item, seed_payment_method, test_db};
        use rust_decimal_macros::dec;

        let db = test_db().await;
        let store = SeaOrmSaleStore::new(db.clone());
        let new_sale = |payment_method_id| NewSale {
            id: uuid::Uuid::new_v4(),
            date: chrono::Utc::now().date_naive(),
            total_amount: dec!(20),
            payment_method_id,
            user_id: None,
        };

        assert!(store.insert_sale(new_sale(uuid::Uuid::new_v4())).await.is_err());

        let cash = seed_payment_method(&db, "Cash").await;
        let tea = seed_menu_item(&db, "Tea", dec!(20)).await;
        let sale = store.insert_sale(new_sale(cash.id)).await.expect("sale");

        let line = |menu_item_id| {
            vec![NewSaleItem {
                menu_item_id,
                quantity: 1,
                price: dec!(20),
            }]
        };
        assert!(store
            .insert_sale_items(uuid::Uuid::new_v4(), line(tea.id))
            .await
            .is_err());
        assert!(store
            .insert_sale_items(sale.id, line(uuid::Uuid::new_v4()))
            .await
            .is_err());
        assert_eq!(
            store
                .insert_sale_items(sale.id, line(tea.id))
                .await
                .expect("items")
                .len(),
            1
        );
    }

    #[test]
    fn db_config_follows_app_config() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "a6f1c0e9b7d24f3a8e5c1b0d9f7e6a5c4b3".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        cfg.db_max_connections = 3;
        cfg.db_acquire_timeout_secs = 2;

        let db_cfg = DbConfig::from(&cfg);
        assert_eq!(db_cfg.max_connections, 3);
        assert_eq!(db_cfg.acquire_timeout, Duration::from_secs(2));
        assert_eq!(db_cfg.url, "sqlite::memory:");
    }
}
