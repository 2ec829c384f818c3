//! Rentfleet REST API server.
//!
//! Wires the booking engine, wallet ledger, settlement coordinator, and
//! cleanup scheduler to an axum HTTP API backed by PostgreSQL.

mod api;
mod config;
mod logging;
mod metrics;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Error};
use ctrlc::set_handler;
use pico_args::Arguments;
use rentfleet::db::{PgBookingStore, PgContractStore, PgSlotStore, PgVehicleStore};
use rentfleet::{
    BookingManager, CleanupScheduler, Database, LogNotifier, PaymentGateway,
    SettlementCoordinator, SlotLedger, SystemClock, WalletManager,
};

const HELP: &str = "\
Run the rentfleet rental marketplace API server

USAGE:
  rf_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL                 PostgreSQL connection string
  JWT_SECRET                   Secret validating identity-provider tokens
  GATEWAY_PAY_URL              Payment gateway base URL
  GATEWAY_RETURN_URL           Redirect target after booking payments
  GATEWAY_WALLET_RETURN_URL    Redirect target after wallet top-ups
  GATEWAY_MERCHANT_CODE        Merchant identifier at the gateway
  GATEWAY_HASH_SECRET          Shared callback-signature secret
  BOOKING_CLEANUP_GRACE_SECS   Unpaid-booking grace period  [default: 900]
  METRICS_BIND                 Optional Prometheus exporter address
  (See .env for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let db_override: Option<String> = pargs.opt_value_from_str("--db-url")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = config::ServerConfig::from_env(bind_override, db_override)?;
    tracing::info!("starting rentfleet server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .context("failed to connect to database")?;
    db.health_check().await.context("database health check failed")?;
    tracing::info!("database connected");

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        tracing::info!("prometheus metrics exposed at {addr}");
    }

    let pool = Arc::new(db.pool().clone());
    let clock = Arc::new(SystemClock);
    let notifier = Arc::new(LogNotifier);

    let bookings = Arc::new(PgBookingStore::new(db.pool().clone()));
    let vehicles = Arc::new(PgVehicleStore::new(db.pool().clone()));
    let contracts = Arc::new(PgContractStore::new(db.pool().clone()));
    let slots = Arc::new(SlotLedger::new(Arc::new(PgSlotStore::new(
        db.pool().clone(),
    ))));
    let wallet = Arc::new(WalletManager::new(pool.clone()));

    let cleanup = Arc::new(CleanupScheduler::new(
        bookings.clone(),
        slots.clone(),
        Duration::from_secs(config.cleanup_grace_secs),
        clock.clone(),
    ));
    // cover timers lost with a previous process
    let reclaimed = cleanup.sweep().await?;
    if reclaimed > 0 {
        tracing::info!("reclaimed {reclaimed} unpaid bookings at startup");
    }

    let booking_manager = Arc::new(
        BookingManager::new(
            bookings.clone(),
            vehicles.clone(),
            contracts.clone(),
            slots.clone(),
            notifier.clone(),
            clock.clone(),
        )
        .with_cleanup(cleanup),
    );

    let gateway = Arc::new(PaymentGateway::new(config.gateway.clone()));
    let settlement = Arc::new(SettlementCoordinator::new(
        bookings,
        vehicles,
        contracts.clone(),
        wallet.clone(),
        gateway.verifier(),
        notifier.clone(),
        clock.clone(),
    ));

    let state = api::AppState {
        bookings: booking_manager,
        settlement,
        wallet,
        contracts,
        gateway,
        notifier,
        clock,
        pool,
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
    };

    let app = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!("listening on {}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
