// server.rs - Listener loop shared by the worker and broker nodes
//
// Every accepted connection gets its own task, and every request on a
// connection is handled on its own task, so a long `RunGame` never blocks
// a `Pause` arriving on the same or another connection. Replies are
// funnelled through a single writer task per connection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{RpcError, RpcFault};
use crate::protocol::{Call, Reply, Request, Response};

/// Replies queued per connection before handlers wait on the writer.
const REPLY_QUEUE: usize = 64;

/// Something that answers calls.
#[async_trait]
pub trait RpcHandler: Send + Sync + 'static {
    async fn handle(&self, call: Call) -> Result<Reply, RpcFault>;
}

/// Resolves once `shutdown` turns true. A dropped sender means no shutdown will ever come.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|&stop| stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Accepts connections until `shutdown` turns true, then drains in-flight requests.
///
/// After shutdown no new connection is accepted and open connections stop
/// reading, but every request already being handled still gets its reply.
pub async fn serve<H: RpcHandler>(
    listener: TcpListener,
    handler: Arc<H>,
    shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    info!(%local, "listening");

    let mut stop = shutdown.clone();
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    connections.spawn(serve_connection(stream, Arc::clone(&handler), shutdown.clone()));
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(err) = joined {
                    warn!(error = %err, "connection task failed");
                }
            }
            _ = shutdown_requested(&mut stop) => break,
        }
    }

    drop(listener);
    info!(%local, open = connections.len(), "listener closed, draining connections");
    while let Some(joined) = connections.join_next().await {
        if let Err(err) = joined {
            warn!(error = %err, "connection task failed");
        }
    }
    Ok(())
}

async fn serve_connection<H: RpcHandler>(
    stream: TcpStream,
    handler: Arc<H>,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = stream.peer_addr().ok();
    let (read, write) = stream.into_split();
    let (tx, rx) = mpsc::channel(REPLY_QUEUE);
    let writer = tokio::spawn(write_responses(write, rx));

    let mut lines = BufReader::new(read).lines();
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let handler = Arc::clone(&handler);
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        let response = dispatch(handler.as_ref(), &line).await;
                        // The writer only goes away when the peer is gone.
                        let _ = tx.send(response).await;
                    });
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(?peer, error = %err, "connection read failed");
                    break;
                }
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            _ = shutdown_requested(&mut shutdown) => {
                debug!(?peer, "shutdown: no longer reading requests");
                break;
            }
        }
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => debug!(?peer, error = %err, "reply writer stopped"),
        Err(err) => warn!(?peer, error = %err, "reply writer task failed"),
    }
    debug!(?peer, "connection closed");
}

async fn write_responses(
    mut write: OwnedWriteHalf,
    mut rx: mpsc::Receiver<Response>,
) -> Result<(), RpcError> {
    while let Some(response) = rx.recv().await {
        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        write.write_all(&frame).await?;
    }
    write.shutdown().await?;
    Ok(())
}

async fn dispatch<H: RpcHandler + ?Sized>(handler: &H, line: &str) -> Response {
    match serde_json::from_str::<Request>(line) {
        Ok(Request { id, call }) => {
            let method = call.method();
            let result = handler.handle(call).await;
            if let Err(fault) = &result {
                debug!(id, method, %fault, "call faulted");
            }
            Response { id, result }
        }
        Err(err) => {
            // Answer with the id if the envelope itself was readable.
            let id = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(|v| v.get("id").and_then(|id| id.as_u64()))
                .unwrap_or(0);
            warn!(id, error = %err, "malformed request");
            Response {
                id,
                result: Err(RpcFault::Malformed(err.to_string())),
            }
        }
    }
}
