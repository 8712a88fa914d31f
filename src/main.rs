use clap::Parser;
use gorosso::application::engine::ShopEngine;
use gorosso::config::AppConfig;
use gorosso::domain::ports::SessionStoreRef;
use gorosso::infrastructure::in_memory::{
    InMemoryCatalogStore, InMemoryOrderStore, InMemoryPendingOrderLedger, InMemorySessionStore,
};
use gorosso::interfaces::csv::order_writer::OrderWriter;
use gorosso::interfaces::json::event_reader::EventReader;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input events file (one JSON event per line)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Write captured orders to this CSV file after the replay.
    #[arg(long)]
    export_orders: Option<PathBuf>,

    /// Print the catalog snapshot as a JSON line after the replay.
    #[arg(long)]
    snapshot: bool,
}

fn build_engine(cli: &Cli, config: AppConfig) -> gorosso::error::Result<ShopEngine> {
    let sessions: SessionStoreRef = Arc::new(InMemorySessionStore::new());

    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = &cli.db_path {
        use gorosso::domain::ports::{CatalogStoreRef, OrderStoreRef, PendingOrderLedgerRef};
        use gorosso::infrastructure::rocksdb::RocksDBStore;

        let store = RocksDBStore::open(db_path)?;
        let catalog: CatalogStoreRef = Arc::new(store.clone());
        let ledger: PendingOrderLedgerRef = Arc::new(store.clone());
        let orders: OrderStoreRef = Arc::new(store);
        return Ok(ShopEngine::new(config, catalog, ledger, orders, sessions));
    }

    Ok(ShopEngine::new(
        config,
        Arc::new(InMemoryCatalogStore::new()),
        Arc::new(InMemoryPendingOrderLedger::new()),
        Arc::new(InMemoryOrderStore::new()),
        sessions,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().into_diagnostic()?;
    let engine = build_engine(&cli, config).into_diagnostic()?;

    // Replay events, one structured reply per line.
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                let reply = engine.handle_event(event).await;
                let line = serde_json::to_string(&reply).into_diagnostic()?;
                writeln!(out, "{line}").into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading event: {e}");
            }
        }
    }

    let dropped = engine.sweep_expired().await.into_diagnostic()?;
    if dropped > 0 {
        tracing::info!(dropped, "expired reservations dropped");
    }

    if let Some(path) = &cli.export_orders {
        let orders = engine.orders().await.into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        let mut writer = OrderWriter::new(file);
        writer.write_orders(&orders).into_diagnostic()?;
    }

    if cli.snapshot {
        let snapshot = engine.catalog_snapshot().await.into_diagnostic()?;
        let line = serde_json::to_string(&snapshot).into_diagnostic()?;
        writeln!(out, "{line}").into_diagnostic()?;
    }

    Ok(())
}
