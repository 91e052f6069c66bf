//! Syncbox server - a personal S3-compatible sync endpoint.
//!
//! Serves the AWS S3 REST API over a plain directory tree and mirrors every
//! write into a remote git repository in the background. Designed for
//! applications (e.g. note vaults) that natively speak S3 but whose
//! canonical storage should be a version-controlled directory.
//!
//! # Usage
//!
//! ```text
//! SYNCBOX_DIR=/data/vault SYNCBOX_REPO=https://example.com/me/vault.git syncbox-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SYNCBOX_LISTEN` | `0.0.0.0:9000` | Bind address |
//! | `SYNCBOX_DIR` | `/var/lib/syncbox` | Object store root / git working tree |
//! | `SYNCBOX_BUCKET` | `vault` | Accepted bucket name |
//! | `SYNCBOX_ACCESS_KEY` | *(unset)* | SigV4 access key; empty disables auth |
//! | `SYNCBOX_SECRET_KEY` | *(unset)* | SigV4 secret key |
//! | `SYNCBOX_REGION` | `us-east-1` | Accepted SigV4 region |
//! | `SYNCBOX_REPO` | *(unset)* | Remote git URL; empty disables the remote |
//! | `SYNCBOX_BRANCH` | `main` | Tracked branch |
//! | `SYNCBOX_TOKEN` | *(unset)* | Basic-auth password for the remote |
//! | `SYNCBOX_DEBOUNCE_SECS` | `10` | Quiet interval before a commit |
//! | `SYNCBOX_PULL_INTERVAL_SECS` | `300` | Periodic pull interval; 0 disables |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use syncbox_core::{Config, SyncTrigger};
use syncbox_git::{Syncer, init_repo};
use syncbox_http::{S3Handler, S3Service};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config
/// value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal.
async fn serve(listener: TcpListener, service: S3Service) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Any in-flight commit or push is abandoned with the process;
    // at-most-once durability is the documented contract.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen,
        dir = %config.dir,
        bucket = %config.bucket,
        auth = config.auth_enabled(),
        remote = config.remote_enabled(),
        version = VERSION,
        "starting syncbox",
    );

    tokio::fs::create_dir_all(&config.dir)
        .await
        .with_context(|| format!("cannot create store directory {}", config.dir))?;

    let repo = init_repo(&config);
    let syncer = Syncer::new(&config, repo);
    if let Some(interval) = config.pull_interval() {
        syncer.start_puller(interval);
    }

    let trigger: Arc<dyn SyncTrigger> = Arc::new(syncer);
    let handler = S3Handler::new(&config, trigger);
    let service = S3Service::new(handler);

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
