//! JSON-RPC over a websocket, the transport every controller facade uses.
//!
//! Requests are strictly sequential: one request is written and responses
//! are read until the matching `request-id` arrives.

use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{JujuError, Result};
use crate::types::{ConnectParams, LoginRequest, RpcRequest, RpcResponse, CLIENT_VERSION};

const ADMIN_FACADE: &str = "Admin";
const ADMIN_FACADE_VERSION: u32 = 3;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) struct RpcConnection {
    url: String,
    socket: Socket,
    next_request_id: u64,
}

impl RpcConnection {
    /// Open the websocket at `url` and authenticate with `params`.
    pub async fn open(url: String, params: &ConnectParams) -> Result<Self> {
        let connector = tls_connector(params.cacert.as_deref())?;
        let (socket, _response) = tokio_tungstenite::connect_async_tls_with_config(
            url.as_str(),
            None,
            false,
            Some(connector),
        )
        .await
        .map_err(|e| JujuError::Connection(format!("{}: {}", url, e)))?;

        debug!(url = %url, "Controller websocket connected");

        let mut connection = Self {
            url,
            socket,
            next_request_id: 0,
        };
        connection.login(params).await?;
        Ok(connection)
    }

    async fn login(&mut self, params: &ConnectParams) -> Result<()> {
        let request = LoginRequest {
            auth_tag: params.user_tag(),
            credentials: params.password.clone(),
            nonce: String::new(),
            macaroons: Vec::new(),
            client_version: CLIENT_VERSION.to_string(),
        };

        let _: Value = self
            .call(ADMIN_FACADE, ADMIN_FACADE_VERSION, "Login", &request)
            .await?;

        debug!(url = %self.url, user = %params.username, "Logged in");
        Ok(())
    }

    /// Issue one facade request and decode its response.
    pub async fn call<P, T>(
        &mut self,
        facade: &str,
        version: u32,
        request: &str,
        params: &P,
    ) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.next_request_id += 1;
        let request_id = self.next_request_id;

        let envelope = RpcRequest {
            request_id,
            facade,
            version,
            request,
            params: serde_json::to_value(params)?,
        };
        self.socket
            .send(Message::Text(serde_json::to_string(&envelope)?))
            .await?;

        loop {
            let message = self.socket.next().await.ok_or(JujuError::Closed)??;
            let text = match message {
                Message::Text(text) => text,
                Message::Binary(bytes) => String::from_utf8(bytes)
                    .map_err(|e| JujuError::InvalidResponse(e.to_string()))?,
                Message::Close(_) => return Err(JujuError::Closed),
                _ => continue,
            };

            let response: RpcResponse = serde_json::from_str(&text)?;
            if response.request_id != request_id {
                warn!(
                    expected = request_id,
                    received = response.request_id,
                    "Discarding response for another request"
                );
                continue;
            }

            if let Some(message) = response.error {
                return Err(JujuError::Rpc {
                    facade: facade.to_string(),
                    request: request.to_string(),
                    code: response.error_code.unwrap_or_default(),
                    message,
                });
            }

            let body = response.response.unwrap_or(Value::Null);
            return Ok(serde_json::from_value(body)?);
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        match self.socket.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => {
                debug!(url = %self.url, "Controller websocket closed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Controllers present a self-signed certificate issued for `juju-apiserver`.
/// A supplied CA is trusted without host name checks; without one the
/// certificate is not verified at all.
fn tls_connector(cacert: Option<&str>) -> Result<Connector> {
    let mut builder = native_tls::TlsConnector::builder();
    match cacert {
        Some(pem) => {
            let certificate = native_tls::Certificate::from_pem(pem.as_bytes())?;
            builder.add_root_certificate(certificate);
            builder.danger_accept_invalid_hostnames(true);
        }
        None => {
            builder.danger_accept_invalid_certs(true);
        }
    }
    Ok(Connector::NativeTls(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{fail, reply, with_login, ScriptedController};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_then_call() {
        let server = ScriptedController::spawn(with_login(|request| {
            vec![reply(request, json!({"applications": {}}))]
        }))
        .await;

        let mut rpc = RpcConnection::open(server.url.clone(), &server.params())
            .await
            .unwrap();
        let status: Value = rpc
            .call("Client", 2, "FullStatus", &json!({"patterns": []}))
            .await
            .unwrap();
        assert_eq!(status, json!({"applications": {}}));
        rpc.close().await.unwrap();

        let requests = server.requests().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["type"], "Admin");
        assert_eq!(requests[0]["request"], "Login");
        assert_eq!(requests[0]["params"]["auth-tag"], "user-admin");
        assert_eq!(requests[1]["type"], "Client");
        assert_eq!(requests[1]["version"], 2);
        assert_eq!(requests[1]["request-id"], 2);
    }

    #[tokio::test]
    async fn test_call_skips_responses_for_other_requests() {
        let server = ScriptedController::spawn(with_login(|request| {
            vec![
                json!({"request-id": 999, "response": {"stale": true}}),
                reply(request, json!({"fresh": true})),
            ]
        }))
        .await;

        let mut rpc = RpcConnection::open(server.url.clone(), &server.params())
            .await
            .unwrap();
        let response: Value = rpc
            .call("Client", 2, "FullStatus", &json!({}))
            .await
            .unwrap();

        assert_eq!(response, json!({"fresh": true}));
    }

    #[tokio::test]
    async fn test_error_response_maps_to_rpc_error() {
        let server = ScriptedController::spawn(with_login(|request| {
            vec![fail(request, "not found", "action 7 not found")]
        }))
        .await;

        let mut rpc = RpcConnection::open(server.url.clone(), &server.params())
            .await
            .unwrap();
        let err = rpc
            .call::<_, Value>("Action", 6, "Actions", &json!({}))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        match err {
            JujuError::Rpc {
                facade,
                request,
                message,
                ..
            } => {
                assert_eq!(facade, "Action");
                assert_eq!(request, "Actions");
                assert_eq!(message, "action 7 not found");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_login_fails_open() {
        let server = ScriptedController::spawn(|request: &Value| {
            vec![fail(request, "unauthorized access", "invalid entity name or password")]
        })
        .await;

        let result = RpcConnection::open(server.url.clone(), &server.params()).await;
        assert!(matches!(
            result,
            Err(JujuError::Rpc { code, .. }) if code == "unauthorized access"
        ));
    }

    #[test]
    fn test_tls_connector_rejects_malformed_ca() {
        assert!(matches!(
            tls_connector(Some("not a certificate")),
            Err(JujuError::Tls(_))
        ));
        assert!(tls_connector(None).is_ok());
    }
}
