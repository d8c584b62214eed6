use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use alivemon::{AlivenessMonitor, BroadcastPublisher, ProtocolRegistry};
use anyhow::Context;
use clap::Parser;
use tracing::info;

mod api;
mod config;
mod database;
mod events;
mod inventory;
mod pool;
mod sink;

use config::Config;
use database::DatabaseImpl;
use sink::LoggingSink;

/// Liveness monitoring daemon probing interfaces with ARP and LLDP
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the config file, created with defaults if missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_ref()).context("Failed to load configuration")?;
    if args.print_config {
        println!("{config}");
        return Ok(());
    }

    let pool = pool::open(&config.database.path, config.database.pool_size)
        .await
        .context("Failed to open database")?;
    {
        let conn = pool.get().await.context("Failed to get a database connection")?;
        database::initialize_database(&conn).await?;
    }
    let database = Arc::new(DatabaseImpl::new_from_pool(pool).with_id_range(config.id_pool.low, config.id_pool.high));

    let sink = Arc::new(LoggingSink::default());
    let inventory = Arc::new(inventory::from_config(&config.interfaces));
    let protocols = ProtocolRegistry::standard(&config.engine, inventory, sink.clone());
    let bus = BroadcastPublisher::new(config.engine.notification_capacity);
    let _event_logger = events::spawn_logger(&bus);

    let engine = AlivenessMonitor::builder()
        .config(config.engine.clone())
        .store(database.clone())
        .id_allocator(database)
        .publisher(Arc::new(bus))
        .protocols(protocols)
        .build()?;
    let resumed = engine.restore().await.context("Failed to restore stored monitoring sessions")?;
    info!(
        protocols = ?engine.protocols(),
        interfaces = config.interfaces.len(),
        resumed,
        "Monitoring engine ready"
    );

    let state = web::Data::new(api::AppState { engine, sink });
    let addr = (config.api.bind.as_str(), config.api.port);
    info!("Control API listening on {}:{}", addr.0, addr.1);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
