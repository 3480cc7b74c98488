//! Bakery payments - VNPay checkout service

use anyhow::Result;
use bakery_payments::api::{router, AppState};
use bakery_payments::config::AppConfig;
use bakery_payments::notify::{LogNotifier, NatsNotifier, Notifier};
use bakery_payments::repository::{
    in_memory::InMemoryOrderRepository, postgres::PgOrderRepository, OrderRepositoryRef,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    let config = AppConfig::from_env()?;

    let orders: OrderRepositoryRef = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgOrderRepository::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsNotifier::new(client, config.nats_subject.clone())),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, payment notifications go to the log");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    };

    let state = AppState::new(
        Arc::new(config.merchant.clone()),
        orders,
        notifier,
        config.notify_timeout,
    );
    let app = router(state);

    tracing::info!("🥐 Bakery payments listening on 0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
