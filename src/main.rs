use std::{net::SocketAddr, sync::Arc};

use tokio::signal;
use tracing::{error, info};

use restaurant_pos as pos;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = pos::config::load_config()?;
    pos::config::init_tracing(cfg.log_level(), cfg.log_json);
    pos::handlers::health::init_start_time();

    let db_pool = pos::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        pos::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db_arc = Arc::new(db_pool);
    let (event_sender, event_rx) = pos::events::EventSender::channel(cfg.event_channel_capacity);
    tokio::spawn(pos::events::process_events(event_rx));

    let state = pos::AppState::new(db_arc, cfg.clone(), Arc::new(event_sender));
    tokio::spawn(pos::services::carts::start_cleanup_task(
        state.services.carts.registry(),
        cfg.cart_sweep_interval(),
        cfg.cart_idle_ttl(),
    ));
    let app = pos::build_router(state)?;

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!(business = %cfg.business_name, "restaurant-pos listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
