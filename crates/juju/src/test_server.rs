//! Loopback controller for transport tests.
//!
//! Accepts one websocket connection and answers every request with the
//! frames returned by a script. Requests are recorded and handed back once
//! the client closes the socket.

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::types::ConnectParams;

pub(crate) struct ScriptedController {
    pub url: String,
    requests: JoinHandle<Vec<Value>>,
}

impl ScriptedController {
    /// Serve one connection; `script` maps each request to the frames sent back.
    pub async fn spawn<F>(script: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let requests = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = accept_async(stream).await.unwrap();
            let mut seen = Vec::new();

            while let Some(Ok(message)) = socket.next().await {
                let Message::Text(text) = message else {
                    break;
                };
                let request: Value = serde_json::from_str(&text).unwrap();
                for frame in script(&request) {
                    socket.send(Message::Text(frame.to_string())).await.unwrap();
                }
                seen.push(request);
            }
            seen
        });

        Self {
            url: format!("ws://{}/api", address),
            requests,
        }
    }

    pub fn params(&self) -> ConnectParams {
        ConnectParams::new("127.0.0.1", "admin", "secret")
    }

    /// Requests received, available after the client closed the connection.
    pub async fn requests(self) -> Vec<Value> {
        self.requests.await.unwrap()
    }
}

pub(crate) fn reply(request: &Value, response: Value) -> Value {
    json!({"request-id": request["request-id"], "response": response})
}

pub(crate) fn fail(request: &Value, code: &str, message: &str) -> Value {
    json!({"request-id": request["request-id"], "error": message, "error-code": code})
}

/// Answer `Admin.Login`; anything else is left to `rest`.
pub(crate) fn with_login<F>(rest: F) -> impl Fn(&Value) -> Vec<Value> + Send + 'static
where
    F: Fn(&Value) -> Vec<Value> + Send + 'static,
{
    move |request: &Value| match request["request"].as_str() {
        Some("Login") => vec![reply(request, json!({}))],
        _ => rest(request),
    }
}
