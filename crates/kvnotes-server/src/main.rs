use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use kvnotes_core::{KvStore, MemoryKv, SqliteKv};
use kvnotes_server::routes::{AppState, build_router};

#[derive(Parser)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:8080", env = "LISTEN_ADDR")]
    addr: SocketAddr,

    /// Path to the sqlite-backed note store
    #[arg(long, default_value = "kvnotes.db", env = "DATABASE_PATH")]
    database: PathBuf,

    /// Keep all state in memory (lost on exit)
    #[arg(long)]
    in_memory: bool,

    /// Emit structured JSON log lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    kvnotes_core::tracing_init::init_tracing("kvnotes_server=info,tower_http=info", args.log_json);

    let store: Arc<dyn KvStore> = if args.in_memory {
        Arc::new(MemoryKv::new())
    } else {
        Arc::new(SqliteKv::open(&args.database).await?)
    };

    info!(addr = %args.addr, in_memory = args.in_memory, "starting kvnotes-server");

    let app = build_router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
