// transport.rs - Client/server behaviour over real loopback sockets

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conway_rpc::protocol::Response;
use conway_rpc::{
    AliveCellsCount, Call, PauseState, Reply, RpcClient, RpcError, RpcFault, RpcHandler, serve,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

/// Handler whose `Pause` blocks until the test releases it.
#[derive(Default)]
struct Probe {
    entered: Notify,
    gate: Notify,
}

#[async_trait]
impl RpcHandler for Probe {
    async fn handle(&self, call: Call) -> Result<Reply, RpcFault> {
        match call {
            Call::Pause => {
                self.entered.notify_one();
                self.gate.notified().await;
                Ok(Reply::Pause(PauseState { paused: true, turn: 1 }))
            }
            Call::CountAliveCells => Ok(Reply::Count(AliveCellsCount { turn: 5, count: 2 })),
            Call::Quit => Err(RpcFault::NoActiveRun),
            Call::Close => Ok(Reply::Closed),
            other => Err(RpcFault::Unsupported(other.method().to_string())),
        }
    }
}

struct Running {
    addr: String,
    probe: Arc<Probe>,
    stop: watch::Sender<bool>,
    server: JoinHandle<std::io::Result<()>>,
}

async fn start() -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let probe = Arc::new(Probe::default());
    let (stop, shutdown) = watch::channel(false);
    let server = tokio::spawn(serve(listener, Arc::clone(&probe), shutdown));
    Running { addr, probe, stop, server }
}

#[tokio::test]
async fn slow_call_does_not_block_others_on_the_same_connection() {
    let node = start().await;
    let client = Arc::new(RpcClient::connect(&node.addr).await.unwrap());

    let slow = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.pause().await })
    };

    let count = client.count_alive_cells().await.unwrap();
    assert_eq!(count, AliveCellsCount { turn: 5, count: 2 });
    assert!(!slow.is_finished());

    node.probe.gate.notify_one();
    let state = slow.await.unwrap().unwrap();
    assert_eq!(state, PauseState { paused: true, turn: 1 });
}

#[tokio::test]
async fn remote_faults_surface_as_remote_errors() {
    let node = start().await;
    let client = RpcClient::connect(&node.addr).await.unwrap();

    let err = client.quit().await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(RpcFault::NoActiveRun)));

    let err = client.save_current_world().await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(RpcFault::Unsupported(ref m)) if m == "SaveCurrentWorld"));
}

#[tokio::test]
async fn shutdown_drains_in_flight_calls_then_stops_listening() {
    let node = start().await;
    let client = Arc::new(RpcClient::connect(&node.addr).await.unwrap());

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.pause().await })
    };
    node.probe.entered.notified().await;

    node.stop.send(true).unwrap();
    node.probe.gate.notify_one();

    assert!(pending.await.unwrap().is_ok());
    tokio::time::timeout(Duration::from_secs(5), node.server)
        .await
        .expect("server drained")
        .unwrap()
        .unwrap();

    assert!(RpcClient::connect(&node.addr).await.is_err());
}

#[tokio::test]
async fn timed_out_call_is_retryable() {
    let node = start().await;
    let client = RpcClient::connect(&node.addr).await.unwrap();

    let err = client
        .call_with_timeout(Call::Pause, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Timeout(_)));
    assert!(err.is_retryable());

    // The connection stays usable after an abandoned call.
    node.probe.gate.notify_one();
    assert_eq!(client.count_alive_cells().await.unwrap().turn, 5);
}

#[tokio::test]
async fn malformed_lines_get_a_malformed_fault() {
    let node = start().await;
    let stream = TcpStream::connect(&node.addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    write.write_all(b"not json\n").await.unwrap();
    let response: Response = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response.id, 0);
    assert!(matches!(response.result, Err(RpcFault::Malformed(_))));

    write
        .write_all(b"{\"id\":9,\"call\":{\"method\":\"Explode\"}}\n")
        .await
        .unwrap();
    let response: Response = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(response.id, 9);
    assert!(matches!(response.result, Err(RpcFault::Malformed(_))));
}

#[tokio::test]
async fn connecting_to_nothing_fails_with_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = RpcClient::connect(&addr).await.unwrap_err();
    assert!(matches!(err, RpcError::Connect { .. }));
    assert!(err.is_retryable());
}
