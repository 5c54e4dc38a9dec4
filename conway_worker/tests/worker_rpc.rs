// worker_rpc.rs - UpdateRegion served over loopback

use std::sync::Arc;
use std::time::Duration;

use conway::{Band, Cell, Region, World, patterns, rule};
use conway_rpc::protocol::Response;
use conway_rpc::{RpcClient, RpcError, RpcFault, UpdateRegionRequest};
use conway_worker::WorkerConfig;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

async fn spawn_worker(local_tasks: usize) -> (String, watch::Sender<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let config = WorkerConfig {
        listen: addr.clone(),
        local_tasks,
    };
    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move { conway_worker::serve(listener, &config, shutdown).await });
    (addr, stop)
}

#[tokio::test]
async fn computes_band_of_a_blinker() {
    let (addr, _stop) = spawn_worker(2).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    let world = Arc::new(patterns::build("blinker", 5, 5).unwrap());
    let region = Region::band(Band { start_y: 0, end_y: 3 }, 5);
    let result = client
        .update_region(UpdateRegionRequest::new(region, Arc::clone(&world)), None)
        .await
        .unwrap();

    assert_eq!((result.start_y, result.end_y), (0, 3));
    assert_eq!(result.slice.height(), 3);
    assert_eq!(result.alive_cells, vec![Cell::new(2, 1), Cell::new(2, 2)]);
    assert_eq!(result.alive_count, 2);
}

#[tokio::test]
async fn bands_reassemble_into_the_reference_step() {
    let (addr, _stop) = spawn_worker(3).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    let world = Arc::new(patterns::random(17, 13, 42));
    let mut merged = World::new(17, 13);
    let mut alive = 0;
    for band in conway::partition(13, 4).unwrap() {
        let request = UpdateRegionRequest::new(Region::band(band, 17), Arc::clone(&world));
        let result = client.update_region(request, None).await.unwrap();
        alive += conway::merge(&mut merged, [&result]).unwrap();
    }

    assert_eq!(merged, rule::step(&world));
    assert_eq!(alive, merged.alive_count());
}

#[tokio::test]
async fn out_of_range_region_is_rejected() {
    let (addr, _stop) = spawn_worker(1).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    let world = Arc::new(World::new(4, 4));
    let mut request = UpdateRegionRequest::new(Region::band(Band { start_y: 2, end_y: 4 }, 4), world);
    request.end_y = 6;

    let err = client.update_region(request, None).await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(RpcFault::Rejected(_))));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn mismatched_dimensions_are_rejected() {
    let (addr, _stop) = spawn_worker(1).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    let world = Arc::new(World::new(4, 4));
    let mut request = UpdateRegionRequest::new(Region::band(Band { start_y: 0, end_y: 2 }, 4), world);
    request.height = 8;

    let err = client.update_region(request, None).await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(RpcFault::Rejected(_))));
}

#[tokio::test]
async fn control_calls_are_not_served_by_workers() {
    let (addr, _stop) = spawn_worker(1).await;
    let client = RpcClient::connect(&addr).await.unwrap();

    let err = client.pause().await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(RpcFault::Unsupported(_))));
}

#[tokio::test]
async fn oversized_world_header_gets_an_answer() {
    let (addr, _stop) = spawn_worker(1).await;
    let stream = TcpStream::connect(&addr).await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    let frame = serde_json::json!({
        "id": 3,
        "call": {
            "method": "UpdateRegion",
            "params": {
                "start_y": 0, "end_y": 1, "start_x": 0, "end_x": 1,
                "height": 2, "width": usize::MAX,
                "world": { "width": usize::MAX, "height": 2, "rows": ["#", "#"] }
            }
        }
    });
    write.write_all(format!("{frame}\n").as_bytes()).await.unwrap();

    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("worker never answered")
        .unwrap()
        .unwrap();
    let response: Response = serde_json::from_str(&line).unwrap();
    assert_eq!(response.id, 3);
    assert!(matches!(response.result, Err(RpcFault::Malformed(_))));

    // The node keeps serving afterwards.
    let client = RpcClient::connect(&addr).await.unwrap();
    let world = Arc::new(World::new(3, 3));
    let request = UpdateRegionRequest::new(Region::band(Band { start_y: 0, end_y: 3 }, 3), world);
    assert_eq!(client.update_region(request, None).await.unwrap().alive_count, 0);
}
