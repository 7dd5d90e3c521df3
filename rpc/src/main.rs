use std::path::PathBuf;
use std::thread;

use clap::Parser;
use lws_core::{LwsConfig, Network};
use lws_node::NodeClient;
use lws_rpc::AppState;
use lws_scanner::StopSignal;
use lws_store::Storage;

/// Runs the light-wallet REST server and its background chain scanner in
/// one process, the way `dxid-rpc::start_servers` spawns its REST and
/// gRPC servers side by side.
///
/// Tuning (`scan_threads`, `bind`, ...) comes from [`LwsConfig::load`] — an
/// optional `--config` file overlaid with `LWS__`-prefixed environment
/// variables — and the flags below, when given, override whatever that
/// produced.
#[derive(Parser)]
#[command(name = "lws-rpc", about = "Light-wallet backend REST server", version)]
struct Args {
    /// Directory holding the KV store.
    #[arg(long)]
    db_path: PathBuf,

    /// `main`, `test` or `dev`.
    #[arg(long, default_value = "main")]
    network: String,

    /// Base URL of the full node's RPC endpoint.
    #[arg(long)]
    node_url: String,

    /// TOML config file, overlaid with `LWS__`-prefixed environment
    /// variables; see `lws_core::config::LwsConfig`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `host:port` to bind the REST server on.
    #[arg(long)]
    bind: Option<String>,

    /// Size of the tokio runtime backing the REST server.
    #[arg(long)]
    http_worker_threads: Option<usize>,

    /// Number of scanner worker threads.
    #[arg(long)]
    scan_threads: Option<usize>,

    /// Wall-clock timeout for node RPC calls, in seconds.
    #[arg(long)]
    node_timeout_secs: Option<u64>,

    /// Maximum number of pending Create requests.
    #[arg(long)]
    max_create_queue: Option<u32>,

    /// Flat fee (atomic units) quoted by `/import_request`.
    #[arg(long, default_value_t = 0)]
    import_fee: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let network = Network::parse(&args.network)
        .ok_or_else(|| anyhow::anyhow!("unknown --network {:?} (want main|test|dev)", args.network))?;

    let mut config = LwsConfig::load(args.config.as_deref())?;
    if let Some(v) = args.scan_threads {
        config.scan.thread_count = v.max(1);
    }
    if let Some(v) = args.node_timeout_secs {
        config.scan.block_rpc_timeout_secs = v;
    }
    if let Some(v) = args.max_create_queue {
        config.scan.max_create_queue = v;
    }
    if let Some(v) = &args.bind {
        config.http.bind_addrs = vec![v.clone()];
    }
    if let Some(v) = args.http_worker_threads {
        config.http.http_worker_threads = v;
    }

    let storage = Storage::open(&args.db_path, network, config.scan.max_create_queue)?;
    let node = NodeClient::new(args.node_url.clone(), config.scan.block_rpc_timeout())?;

    let scan_config = config.scan.clone();
    let stop = StopSignal::new();

    let scanner_storage = storage.clone();
    let scanner_node = node.clone();
    let scanner_stop = stop.clone();
    let scanner_handle = thread::Builder::new()
        .name("scanner-supervisor".into())
        .spawn(move || {
            if let Err(e) = lws_scanner::run(scanner_storage, scanner_node, scan_config, scanner_stop) {
                tracing::error!(error = %e, "scanner supervisor exited with an error");
            }
        })?;

    let http = config.http.clone();
    let bind_addr = http.bind_addrs.first().cloned().unwrap_or_else(|| "127.0.0.1:8443".to_string());
    let worker_threads = http.http_worker_threads.max(1);
    let state = AppState { storage, node, network, http, import_fee: args.import_fee };
    let app = lws_rpc::build_router(state);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?;

    let result = runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        tracing::info!(addr = %bind_addr, "REST server listening");
        axum::serve(listener, app).await
    });

    stop.set();
    let _ = scanner_handle.join();
    result.map_err(Into::into)
}
