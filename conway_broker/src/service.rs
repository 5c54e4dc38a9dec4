// service.rs - RPC surface of the broker

use std::sync::Arc;

use async_trait::async_trait;
use conway_rpc::{Call, Reply, RpcFault, RpcHandler};
use tokio::net::TcpListener;

use crate::broker::Broker;

#[derive(Debug, Clone)]
pub struct BrokerService {
    broker: Arc<Broker>,
}

impl BrokerService {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl RpcHandler for BrokerService {
    async fn handle(&self, call: Call) -> Result<Reply, RpcFault> {
        let broker = &self.broker;
        let method = call.method();
        let reply = match call {
            Call::RunGame(request) => Reply::Final(broker.run_game(request).await?),
            Call::CountAliveCells => Reply::Count(broker.count_alive_cells()),
            Call::SaveCurrentWorld => Reply::World(broker.save_current_world()?),
            Call::Pause => Reply::Pause(broker.pause().await?),
            Call::Quit => Reply::Quit(broker.quit()?),
            Call::Close => {
                broker.close();
                Reply::Closed
            }
            Call::UpdateRegion(_) => return Err(RpcFault::Unsupported(method.to_string())),
        };
        Ok(reply)
    }
}

/// Serves `broker` on `listener` until `Close` is called, then drains in-flight calls.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>) -> std::io::Result<()> {
    let shutdown = broker.shutdown_signal();
    conway_rpc::serve(listener, Arc::new(BrokerService::new(broker)), shutdown).await
}
