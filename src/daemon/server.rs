//! Server: TCP listener that executes GraphQL requests.

use async_graphql::Variables;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{HolonetError, Result};
use crate::graphql::{build_schema, HolonetSchema};
use crate::service::UpdateService;
use crate::store::GraphStore;

use super::protocol::{Request, Response};

/// Start the server: bind, serve until shutdown, then close the store.
pub async fn start_server(config: &Config, store: Arc<dyn GraphStore>) -> Result<()> {
    let service = UpdateService::new(Arc::clone(&store), config.server.query_timeout());
    let schema = build_schema(Arc::new(service));

    let listener = TcpListener::bind(&config.server.listen).await?;
    info!(addr = %listener.local_addr()?, "server listening");

    let result = serve(listener, schema).await;

    info!("server shutting down");
    store.close().await;
    result
}

/// Accept connections until a `shutdown` request or Ctrl-C.
pub async fn serve(listener: TcpListener, schema: HolonetSchema) -> Result<()> {
    let shutdown = Arc::new(Notify::new());

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let schema = schema.clone();
                    let shutdown = Arc::clone(&shutdown);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, &schema, &shutdown).await {
                            debug!(peer = %peer, error = %e, "client handler error");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            },
            _ = shutdown.notified() => break,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }

    Ok(())
}

/// Handle a single client connection.
async fn handle_client(stream: TcpStream, schema: &HolonetSchema, shutdown: &Notify) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response = match serde_json::from_str::<Request>(&line) {
        Ok(request) => {
            debug!(?request, "received request");
            process_request(request, schema, shutdown).await
        }
        Err(e) => {
            warn!(error = %e, "malformed request");
            Response::error(format!("malformed request: {}", e))
        }
    };

    let mut response_json = serde_json::to_string(&response)?;
    response_json.push('\n');
    writer.write_all(response_json.as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

/// Process a request and return a response.
pub async fn process_request(request: Request, schema: &HolonetSchema, shutdown: &Notify) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Shutdown => {
            shutdown.notify_one();
            Response::Goodbye
        }

        Request::Graphql {
            query,
            variables,
            operation_name,
        } => {
            let mut gql = async_graphql::Request::new(query);
            if let Some(vars) = variables {
                gql = gql.variables(Variables::from_json(vars));
            }
            if let Some(name) = operation_name {
                gql = gql.operation_name(name);
            }
            Response::ok(schema.execute(gql).await)
        }
    }
}

/// Send a request to a running server and wait for its response.
pub async fn send_request(addr: &str, request: &Request) -> Result<Response> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut writer) = stream.into_split();

    let mut request_json = serde_json::to_string(request)?;
    request_json.push('\n');
    writer.write_all(request_json.as_bytes()).await?;
    writer.flush().await?;

    let mut reader = BufReader::new(read_half);
    let mut response_line = String::new();
    let read = reader.read_line(&mut response_line).await?;
    if read == 0 {
        return Err(HolonetError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "server closed the connection without responding",
        )));
    }

    let response: Response = serde_json::from_str(&response_line)?;
    Ok(response)
}
