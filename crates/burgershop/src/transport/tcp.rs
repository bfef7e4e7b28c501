//! TCP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::bridge::protocol::SessionId;
use crate::config::ServerConfig;
use crate::service::ShopService;
use crate::session::{SessionEnd, SessionError};

type SessionResult = (SessionId, Result<SessionEnd, SessionError>);

/// Bind the configured address and run the shop until it sells out or the
/// process is signalled.
pub async fn serve(config: ServerConfig, service: Arc<ShopService>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    run(listener, &config, service, shutdown_signal()).await
}

/// Accept customers on `listener` until the shop sells out (or, with
/// `keep_open_after_sellout`, until `shutdown` resolves).
///
/// Sold out: stop accepting, give connected sessions `drain_timeout` to end,
/// abort the rest. Shutdown: stop accepting and abort every session at once.
/// Either way the kitchen is closed before returning.
pub async fn run<F>(
    listener: TcpListener,
    config: &ServerConfig,
    service: Arc<ShopService>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    let keep_open = service.config().keep_open_after_sellout;
    let mut closed_rx = service.closed_rx();
    let mut sold_out = *closed_rx.borrow_and_update();
    let mut sessions: JoinSet<SessionResult> = JoinSet::new();
    let mut interrupted = false;

    tokio::pin!(shutdown);

    service.open().await;
    info!(
        "Server listening on {} with {} burgers and {} chefs",
        local_addr,
        service.config().quota,
        service.config().chefs
    );

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                interrupted = true;
                break;
            }
            changed = closed_rx.changed(), if !sold_out => {
                if changed.is_err() || *closed_rx.borrow_and_update() {
                    sold_out = true;
                    if keep_open {
                        info!("Sold out, still answering customers until shutdown");
                    } else {
                        break;
                    }
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let session = service.session();
                    let id = session.id();
                    info!(session = %id, %peer, "Customer connected");
                    let (reader, writer) = stream.into_split();
                    sessions.spawn(async move { (id, session.serve(reader, writer).await) });
                }
                Err(e) => warn!(error = %e, "Failed to accept connection"),
            },
            Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                log_session_end(finished);
            }
        }
    }

    drop(listener);

    if !interrupted {
        debug!(
            sessions = sessions.len(),
            "Waiting for connected customers to leave"
        );
        tokio::select! {
            _ = drain(&mut sessions) => {}
            _ = tokio::time::sleep(config.drain_timeout) => {
                warn!(
                    sessions = sessions.len(),
                    "Customers still connected after drain timeout, closing them"
                );
            }
            _ = &mut shutdown => {}
        }
    }
    sessions.shutdown().await;

    let prepared = service.shutdown().await;
    let status = service.status().await;
    info!(
        prepared,
        served = status.pool.consumed,
        "Customer denied. No more burgers. Server shutting down"
    );
    debug!("{}", status.summary());

    Ok(())
}

async fn drain(sessions: &mut JoinSet<SessionResult>) {
    while let Some(finished) = sessions.join_next().await {
        log_session_end(finished);
    }
}

fn log_session_end(finished: Result<SessionResult, JoinError>) {
    match finished {
        Ok((id, Ok(end))) => debug!(session = %id, ?end, "Session ended"),
        Ok((id, Err(e))) => warn!(session = %id, error = %e, "Session failed"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => error!(error = %e, "Session task panicked"),
    }
}

/// Wait for SIGINT or SIGTERM.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed, which only happens when the
/// tokio runtime is misconfigured. That is unrecoverable and should fail fast
/// at startup.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler - is tokio runtime configured correctly?");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler - is tokio runtime configured correctly?")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
