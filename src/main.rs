use std::sync::Arc;

use coinpurse::api::routes::{app_router, AppState};
use coinpurse::config::Config;
use coinpurse::ledger;
use coinpurse::market::MarketDataClient;
use coinpurse::persistence;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let db = match &config.database_url {
        Some(url) => Some(
            persistence::create_pool_and_migrate(url)
                .await
                .expect("database connection failed"),
        ),
        None => None,
    };

    let ledger = match &db {
        Some(pool) => {
            let ledger = ledger::hydrate(pool).await.expect("ledger hydration failed");
            info!(
                "hydrated {} users and {} positions",
                ledger.users.len(),
                ledger.positions.len()
            );
            Arc::new(RwLock::new(ledger))
        }
        None => ledger::new_shared(),
    };

    let market = Arc::new(MarketDataClient::new(
        config.finnhub_base_url.clone(),
        config.finnhub_api_key.clone(),
    ));

    let state = AppState {
        ledger,
        market,
        jwt_secret: config.jwt_secret.clone(),
        db,
    };

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap();
    info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}
