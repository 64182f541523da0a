mod api;
mod middleware;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use tanka_pipeline::{build_outbound_gate, Pipeline};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::InboundGate,
    store::ListingStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tanka_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let categories = tanka_core::load_categories(&config.categories_path)?;
    tracing::info!(
        env = %config.env,
        categories = categories.categories.len(),
        path = %config.categories_path.display(),
        "categories loaded"
    );

    let outbound = build_outbound_gate(&config);
    let pipeline = Pipeline::from_app_config(&config, categories.scoring, outbound)?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
        categories: Arc::new(categories),
        store: ListingStore::new(),
    };
    let app = build_app(state, &InboundGate::from_app_config(&config));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
