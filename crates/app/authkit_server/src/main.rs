//! authkit API server binary.

use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use authkit_api::config::ApiConfig;
use authkit_api::{AppState, router};
use authkit_core::auth::AuthError;
use authkit_core::auth::jwt::TokenIssuer;
use authkit_core::auth::session::SessionService;
use authkit_core::store::postgres::PgUserStore;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "authkit_server", about = "authkit API server")]
struct Args {
    /// Port to listen on; overrides `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/authkit"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Create the demo account (user@example.com / password123) if absent.
    #[arg(long, default_value_t = false)]
    seed_demo_user: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,authkit_api=debug,authkit_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env();
    config.database_url = args.database_url.clone();
    if let Some(port) = args.port {
        config.bind_addr = format!("127.0.0.1:{port}");
    }

    info!(
        version = authkit_core::version(),
        addr = %config.bind_addr,
        "starting authkit_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    authkit_core::migrate::migrate(&pool).await?;

    let store = Arc::new(PgUserStore::new(pool));
    let sessions = Arc::new(SessionService::new(store, TokenIssuer::new(&config.tokens)));

    if args.seed_demo_user {
        seed_demo_user(&sessions).await;
    }

    let app = router(AppState { sessions });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the demo account unless it is already registered.
async fn seed_demo_user(sessions: &SessionService) {
    match sessions
        .register("user@example.com", "password123", "Demo User")
        .await
    {
        Ok(_) => info!("seeded demo user"),
        Err(AuthError::DuplicateIdentity) => {}
        Err(err) => warn!(error = %err, "failed to seed demo user"),
    }
}
