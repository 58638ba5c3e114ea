//! Shared fixtures for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use service_gateway::http::context::RequestContext;
use service_gateway::{
    BoxedDto, DeserializerRegistry, FeatureSet, GatewayConfig, GatewayError, GatewayServer,
    OperationRegistry, OperationRestriction, RequestAttributes, RequestDispatcher, ServiceExecutor,
    ServiceResult, Shutdown,
};

#[derive(Debug, Deserialize, Default)]
pub struct GetUser {
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateUser {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct Empty {}

/// Executor with one behavior per registered operation.
pub struct TestExecutor;

impl ServiceExecutor for TestExecutor {
    fn execute(
        &self,
        operation: &str,
        request: BoxedDto,
        _ctx: &RequestContext,
    ) -> ServiceResult<Value> {
        match operation {
            "GetUser" => {
                let dto = request.downcast::<GetUser>().expect("registered as GetUser");
                ServiceResult::immediate(json!({ "id": dto.id }))
            }
            "CreateUser" => {
                let dto = request
                    .downcast::<CreateUser>()
                    .expect("registered as CreateUser");
                ServiceResult::immediate(json!({ "name": dto.name }))
            }
            "Slow" => ServiceResult::deferred(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(json!({ "done": true }))
            }),
            "Broken" => ServiceResult::deferred(async { Err(GatewayError::fault("boom")) }),
            "Cancelled" => {
                let handle = tokio::spawn(async {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(Value::Null)
                });
                handle.abort();
                ServiceResult::spawned(handle)
            }
            "Panic" => ServiceResult::deferred(async { panic!("kaboom") }),
            _ => ServiceResult::immediate(json!("pong")),
        }
    }
}

/// Dispatcher with the full set of test operations registered.
pub fn build_dispatcher() -> Arc<RequestDispatcher> {
    let mut operations = OperationRegistry::new();
    operations.register::<GetUser>("GetUser");
    operations.register::<CreateUser>("CreateUser");
    operations.register::<Empty>("Slow");
    operations.register::<Empty>("Broken");
    operations.register::<Empty>("Cancelled");
    operations.register::<Empty>("Panic");
    operations.register::<Empty>("Ping");
    operations.register_restricted::<Empty>("Reload", OperationRestriction::loopback_only());
    operations.register_restricted::<Empty>(
        "EdgeOnly",
        OperationRestriction {
            allowed_origins: RequestAttributes::EXTERNAL,
            allowed_formats: FeatureSet::all(),
        },
    );

    Arc::new(RequestDispatcher::new(
        Arc::new(operations),
        Arc::new(DeserializerRegistry::with_defaults()),
        Arc::new(TestExecutor),
        Arc::new(service_gateway::NetworkAddressTable::empty()),
    ))
}

/// Spawn a gateway server on the given address.
///
/// Returns the shutdown coordinator and the config-update sender.
#[allow(dead_code)]
pub async fn spawn_gateway(
    addr: SocketAddr,
    config: GatewayConfig,
) -> (Shutdown, mpsc::UnboundedSender<GatewayConfig>) {
    let dispatcher = build_dispatcher();
    let server = GatewayServer::new(config, dispatcher);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let (update_tx, update_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, update_rx, server_shutdown).await;
    });

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(200)).await;

    (shutdown, update_tx)
}
