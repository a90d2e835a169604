use anyhow::Context;
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use backoffice_api::{
    auth::issue_token,
    cli::{Cli, Commands},
    config::{AppConfig, SecurityConfig},
    database, router, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL, JWT_SECRET etc. are picked up locally
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command_or_default() {
        Commands::Token { user, role } => {
            let token = issue_token(&user, &role, &config.security)?;
            println!("{}", token);
            Ok(())
        }
        Commands::Serve { port, migrate } => serve(config, port, migrate).await,
    }
}

async fn serve(config: AppConfig, port: Option<u16>, migrate: bool) -> anyhow::Result<()> {
    tracing::info!("Starting backoffice API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        tracing::warn!("JWT_SECRET is not set; every authenticated request will be rejected");
    }

    let pool = database::connect(&config.database).await?;
    if migrate {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply migrations")?;
        tracing::info!("Migrations applied");
    }

    let port = port.unwrap_or(config.api.port);
    let cors = cors_layer(&config.security);
    let request_logging = config.api.enable_request_logging;

    let state = AppState::postgres(config, pool)?;
    let mut app = router(state).layer(cors);
    if request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Backoffice API listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("server error")
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
