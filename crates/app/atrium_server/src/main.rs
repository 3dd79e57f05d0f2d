//! Atrium API server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use atrium_api::config::ApiConfig;
use atrium_core::auth::social::GoogleVerifier;
use atrium_core::email::{EmailDispatcher, HttpMailer, LogMailer};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "atrium_server", about = "Atrium API server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3400")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/atrium"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,atrium_api=debug,atrium_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(database_url = %args.database_url, bind_addr = %args.bind_addr, "starting atrium_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    atrium_api::migrate(&pool).await?;

    let mut config = ApiConfig::from_env();
    config.bind_addr = args.bind_addr;
    config.database_url = args.database_url;

    let verifier = Arc::new(GoogleVerifier::new(config.google_client_id.clone())?);

    // Without mail API credentials, messages are logged instead of sent.
    let mailer: Arc<dyn EmailDispatcher> = match (
        std::env::var("MAIL_API_URL"),
        std::env::var("MAIL_API_KEY"),
        std::env::var("MAIL_FROM"),
    ) {
        (Ok(url), Ok(key), Ok(from)) => Arc::new(HttpMailer::new(url, key, from)?),
        _ => {
            info!("MAIL_API_URL/MAIL_API_KEY/MAIL_FROM not set, using log-only mailer");
            Arc::new(LogMailer)
        }
    };

    let state = atrium_api::AppState {
        pool,
        config: config.clone(),
        verifier,
        mailer,
    };

    let app = atrium_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
