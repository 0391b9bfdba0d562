//! `CertVault` server
//!
//! Certificate issuance and verification over a JSON HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use certvault_core::config::{self, Config};
use certvault_core::tracing_init::init_tracing;
use certvault_server::admin::AdminService;
use certvault_server::auth::JwtManager;
use certvault_server::http::{AppState, build_router};
use certvault_server::storage::{ROLE_ADMIN, ServerDatabase};
use certvault_server::verification::geo::ConfiguredGeoLocator;

#[derive(Parser, Debug)]
#[command(name = "certvault")]
#[command(version, about = "CertVault - certificate issuance and verification server")]
struct Args {
    /// Path to a JSON config file (layered over ~/.config/certvault/settings.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to SQLite database file.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve(ServeArgs),
    /// Create an admin or staff account.
    CreateAdmin(CreateAdminArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Public base URL used in verification links.
    #[arg(long)]
    public_url: Option<String>,

    /// JWT secret key.
    #[arg(long, env = "CERTVAULT_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Access token TTL in seconds.
    #[arg(long)]
    access_ttl: Option<i64>,

    /// ip-api.com compatible endpoint for verification geolocation.
    #[cfg(feature = "geoip")]
    #[arg(long, env = "CERTVAULT_GEOIP_ENDPOINT")]
    geoip_endpoint: Option<String>,
}

#[derive(clap::Args, Debug)]
struct CreateAdminArgs {
    #[arg(long)]
    username: String,

    #[arg(long, default_value = "")]
    email: String,

    /// Account password.
    #[arg(long, env = "CERTVAULT_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    /// `admin` or `staff`.
    #[arg(long, default_value = ROLE_ADMIN)]
    role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing("certvault_server=info,certvault=info,tower_http=info", args.log_json);

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(path) = &args.db_path {
        config.server.database_path = Some(path.clone());
    }

    let command = args.command.unwrap_or(Command::Serve(ServeArgs::default()));
    if let Command::Serve(serve_args) = &command {
        apply_serve_overrides(&mut config, serve_args);
    }
    let config = Arc::new(config);

    let db_path = config
        .server
        .database_path
        .clone()
        .or_else(config::default_database_path)
        .ok_or_else(|| anyhow::anyhow!("Cannot determine database path; pass --db-path"))?;
    info!(path = %db_path.display(), "Opening database");
    let db = ServerDatabase::open(&db_path).await?;

    match command {
        Command::Serve(serve_args) => serve(config, db, &serve_args).await,
        Command::CreateAdmin(admin_args) => create_admin(&config, db, &admin_args).await,
    }
}

fn apply_serve_overrides(config: &mut Config, args: &ServeArgs) {
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr.to_string();
    }
    if let Some(url) = &args.public_url {
        config.server.public_base_url.clone_from(url);
    }
    if let Some(secret) = &args.jwt_secret {
        config.auth.jwt_secret.clone_from(secret);
    }
    if let Some(ttl) = args.access_ttl {
        config.auth.access_token_ttl_secs = ttl;
    }
}

#[cfg(feature = "geoip")]
fn geo_locator(args: &ServeArgs) -> anyhow::Result<ConfiguredGeoLocator> {
    use certvault_server::verification::geo::HttpGeoLocator;

    Ok(match &args.geoip_endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Geo lookups enabled");
            ConfiguredGeoLocator::Http(HttpGeoLocator::new(endpoint.as_str())?)
        }
        None => ConfiguredGeoLocator::Disabled,
    })
}

#[cfg(not(feature = "geoip"))]
#[allow(clippy::unnecessary_wraps)]
fn geo_locator(_args: &ServeArgs) -> anyhow::Result<ConfiguredGeoLocator> {
    Ok(ConfiguredGeoLocator::Disabled)
}

async fn serve(config: Arc<Config>, db: ServerDatabase, args: &ServeArgs) -> anyhow::Result<()> {
    if config.uses_dev_secret() {
        warn!("Using the built-in development JWT secret; set CERTVAULT_JWT_SECRET in production");
    }

    let addr: SocketAddr = config.server.listen_addr.parse().map_err(|e| {
        anyhow::anyhow!("Invalid listen address {}: {e}", config.server.listen_addr)
    })?;

    let state = AppState::new(Arc::clone(&config), db, geo_locator(args)?);
    let app = build_router(state);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        public_url = %config.server.public_base_url,
        "Starting certvault"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
        }
    })
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn create_admin(
    config: &Config,
    db: ServerDatabase,
    args: &CreateAdminArgs,
) -> anyhow::Result<()> {
    let jwt = Arc::new(JwtManager::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.access_token_ttl_secs,
    ));
    let admin = AdminService::new(db, jwt);
    let user = admin
        .create_admin(&args.username, &args.email, &args.password, &args.role)
        .await?;
    info!(user_id = %user.id, username = %user.username, role = %user.role, "Account created");
    Ok(())
}
