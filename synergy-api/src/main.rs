//! # SynergySphere API Server
//!
//! REST API behind the SynergySphere single-page app: projects, tasks,
//! members, invitations and notifications over a Postgres database, with
//! accounts held by the hosted auth service.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p synergy-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON logs and `RUST_LOG` to override filters.

use std::process::ExitCode;
use synergy_api::{
    app::{build_router, AppState},
    config::Config,
    error::expose_internal_errors,
};
use synergy_shared::db::{
    migrations::{get_migration_status, run_migrations},
    pool::{close_pool, create_pool, get_pool_stats, health_check, DatabaseConfig},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "synergy_api=debug,synergy_shared=debug,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Server failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    tracing::info!(
        "SynergySphere API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    expose_internal_errors(config.is_development());

    let mut db_config = DatabaseConfig::new(config.database.url.clone());
    db_config.max_connections = config.database.max_connections;

    let pool = create_pool(&db_config).await?;
    health_check(&pool).await?;
    let stats = get_pool_stats(&pool);
    tracing::info!(
        connections = stats.total_connections,
        max_connections = db_config.max_connections,
        "Database connection established"
    );

    if config.database.run_migrations {
        run_migrations(&pool).await?;
    }

    match get_migration_status(&pool).await {
        Ok(status) if !status.is_up_to_date() => tracing::warn!(
            applied = status.applied_migrations,
            known = status.known_migrations,
            "Database schema is behind; set RUN_MIGRATIONS=true to apply"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read migration status"),
    }

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);
    tracing::info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
