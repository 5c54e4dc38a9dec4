// client.rs - Multiplexed RPC client
//
// One TCP connection carries any number of concurrent calls. Each request
// gets a fresh id; a background reader task routes every response line to
// the caller waiting on that id through a oneshot channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use conway::RegionResult;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::{RpcError, RpcFault};
use crate::protocol::{
    AliveCellsCount, Call, CurrentWorld, FinalResponse, PauseState, QuitReport, Reply, Request,
    Response, RunGameRequest, UpdateRegionRequest,
};
use crate::retry::RetryPolicy;

type ReplySender = oneshot::Sender<Result<Reply, RpcFault>>;
type Pending = Arc<Mutex<HashMap<u64, ReplySender>>>;

pub struct RpcClient {
    addr: String,
    next_id: AtomicU64,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("addr", &self.addr)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    /// Dials `addr` once.
    pub async fn connect(addr: &str) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| RpcError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();

        let pending: Pending = Arc::default();
        let closed = Arc::new(AtomicBool::new(false));
        let reader = tokio::spawn(read_responses(
            read,
            Arc::clone(&pending),
            Arc::clone(&closed),
            addr.to_string(),
        ));
        debug!(addr, "connected");

        Ok(Self {
            addr: addr.to_string(),
            next_id: AtomicU64::new(1),
            writer: tokio::sync::Mutex::new(write),
            pending,
            closed,
            reader,
        })
    }

    /// Dials `addr`, retrying refused or failed connects according to `policy`.
    pub async fn connect_with_retry(addr: &str, policy: &RetryPolicy) -> Result<Self, RpcError> {
        policy.run(addr, |_| Self::connect(addr)).await
    }

    /// True once the peer hung up; every later call fails with `ConnectionClosed`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sends `call` and waits for its reply with no deadline.
    pub async fn call(&self, call: Call) -> Result<Reply, RpcError> {
        self.call_with_timeout(call, None).await
    }

    /// Sends `call` and waits at most `timeout` for its reply.
    pub async fn call_with_timeout(
        &self,
        call: Call,
        timeout: Option<Duration>,
    ) -> Result<Reply, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let method = call.method();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);
        if self.is_closed() {
            self.pending.lock().remove(&id);
            return Err(RpcError::ConnectionClosed);
        }

        if let Err(err) = self.send(Request { id, call }).await {
            self.pending.lock().remove(&id);
            return Err(err);
        }
        trace!(addr = %self.addr, id, method, "request sent");

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.pending.lock().remove(&id);
                    return Err(RpcError::Timeout(limit));
                }
            },
            None => rx.await,
        };

        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(fault)) => Err(RpcError::Remote(fault)),
            Err(_) => Err(RpcError::ConnectionClosed),
        }
    }

    async fn send(&self, request: Request) -> Result<(), RpcError> {
        let mut frame = serde_json::to_vec(&request)?;
        frame.push(b'\n');
        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        Ok(())
    }

    pub async fn run_game(&self, request: RunGameRequest) -> Result<FinalResponse, RpcError> {
        match self.call(Call::RunGame(request)).await? {
            Reply::Final(response) => Ok(response),
            _ => Err(RpcError::UnexpectedReply { method: "RunGame" }),
        }
    }

    pub async fn update_region(
        &self,
        request: UpdateRegionRequest,
        timeout: Option<Duration>,
    ) -> Result<RegionResult, RpcError> {
        match self.call_with_timeout(Call::UpdateRegion(request), timeout).await? {
            Reply::Region(result) => Ok(result),
            _ => Err(RpcError::UnexpectedReply { method: "UpdateRegion" }),
        }
    }

    pub async fn count_alive_cells(&self) -> Result<AliveCellsCount, RpcError> {
        match self.call(Call::CountAliveCells).await? {
            Reply::Count(count) => Ok(count),
            _ => Err(RpcError::UnexpectedReply { method: "CountAliveCells" }),
        }
    }

    pub async fn save_current_world(&self) -> Result<CurrentWorld, RpcError> {
        match self.call(Call::SaveCurrentWorld).await? {
            Reply::World(current) => Ok(current),
            _ => Err(RpcError::UnexpectedReply { method: "SaveCurrentWorld" }),
        }
    }

    pub async fn pause(&self) -> Result<PauseState, RpcError> {
        match self.call(Call::Pause).await? {
            Reply::Pause(state) => Ok(state),
            _ => Err(RpcError::UnexpectedReply { method: "Pause" }),
        }
    }

    pub async fn quit(&self) -> Result<QuitReport, RpcError> {
        match self.call(Call::Quit).await? {
            Reply::Quit(report) => Ok(report),
            _ => Err(RpcError::UnexpectedReply { method: "Quit" }),
        }
    }

    pub async fn close(&self) -> Result<(), RpcError> {
        match self.call(Call::Close).await? {
            Reply::Closed => Ok(()),
            _ => Err(RpcError::UnexpectedReply { method: "Close" }),
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_responses(read: OwnedReadHalf, pending: Pending, closed: Arc<AtomicBool>, addr: String) {
    let mut lines = BufReader::new(read).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match serde_json::from_str::<Response>(&line) {
                Ok(response) => {
                    let waiter = pending.lock().remove(&response.id);
                    match waiter {
                        // The caller may have timed out and gone away.
                        Some(tx) => {
                            let _ = tx.send(response.result);
                        }
                        None => trace!(addr = %addr, id = response.id, "reply for abandoned call"),
                    }
                }
                Err(err) => warn!(addr = %addr, error = %err, "dropping undecodable response"),
            },
            Ok(None) => {
                debug!(addr = %addr, "peer closed connection");
                break;
            }
            Err(err) => {
                warn!(addr = %addr, error = %err, "connection read failed");
                break;
            }
        }
    }

    // Mark closed before draining so a concurrent caller either sees the flag
    // or has its sender dropped here.
    closed.store(true, Ordering::SeqCst);
    pending.lock().clear();
}
