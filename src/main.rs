use std::path::Path;

use raft_elect::Error;
use raft_elect::NetworkError;
use raft_elect::NodeBuilder;
use raft_elect::RaftNodeConfig;
use raft_elect::Result;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    // Optional first argument: path to this node's config file.
    let node_path = std::env::args().nth(1);
    let settings = RaftNodeConfig::load(node_path.as_deref())?;

    // Initializing Logs
    let _guard = init_observability(&settings.cluster.node_id, &settings.cluster.log_dir)?;

    // Initializing Shutdown Signal
    let (graceful_tx, graceful_rx) = watch::channel(());

    // Build Node
    let node = NodeBuilder::init(settings, graceful_rx.clone())
        .build()
        .start_rpc_server()
        .ready()
        .expect("start node failed.");

    info!("Application started. Waiting for CTRL+C signal...");
    // Listen on Shutdown Signal
    tokio::spawn(async {
        if let Err(e) = graceful_shutdown(graceful_tx).await {
            error!("Failed to shutdown: {:?}", e);
        }
    });

    // Start Node
    if let Err(e) = node.run().await {
        error!("node stops: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(graceful_tx: watch::Sender<()>) -> Result<()> {
    info!("Shutdown server..");
    let mut sigint = signal(SignalKind::interrupt()).expect("listen for SIGINT");
    let mut sigterm = signal(SignalKind::terminate()).expect("listen for SIGTERM");
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    graceful_tx.send(()).map_err(|e| {
        error!("Failed to send shutdown signal: {}", e);
        Error::from(NetworkError::SignalSendFailed(format!(
            "Failed to send shutdown signal: {}",
            e
        )))
    })?;

    info!("Shutdown completed");
    Ok(())
}

fn init_observability(
    node_id: &str,
    log_dir: &Path,
) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(log_dir, format!("{}.log", node_id));

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
