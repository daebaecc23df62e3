use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Controller API port used when an endpoint carries none.
pub const DEFAULT_PORT: u16 = 17070;

/// Reported to the controller during login.
pub const CLIENT_VERSION: &str = "2.9.0";

/// Everything needed to open a session to a controller.
#[derive(Clone)]
pub struct ConnectParams {
    pub endpoint: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// PEM encoded CA certificate of the controller.
    pub cacert: Option<String>,
}

impl ConnectParams {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            password: password.into(),
            cacert: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cacert(mut self, cacert: Option<String>) -> Self {
        self.cacert = cacert;
        self
    }

    /// `host:port` of the API server. Endpoints that already carry a port
    /// (as `JUJU_API_ADDRESSES` entries do) are used unchanged.
    pub fn address(&self) -> String {
        let has_port = self
            .endpoint
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());

        if has_port {
            self.endpoint.clone()
        } else {
            format!("{}:{}", self.endpoint, self.port)
        }
    }

    pub fn user_tag(&self) -> String {
        format!("user-{}", self.username)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("cacert", &self.cacert.as_ref().map(|_| "<pem>"))
            .finish()
    }
}

/// A deployed application and its units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    /// Workload status reported for the application, if any.
    pub status: Option<String>,
    /// Unit names (`app/N`) ordered by ordinal.
    pub units: Vec<String>,
}

impl Application {
    pub fn first_unit(&self) -> Option<&str> {
        self.units.first().map(String::as_str)
    }
}

/// An action as acknowledged by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: String,
    pub status: String,
}

pub fn unit_tag(unit: &str) -> String {
    format!("unit-{}", unit.replace('/', "-"))
}

pub fn action_tag(id: &str) -> String {
    format!("action-{}", id)
}

pub fn action_id(tag: &str) -> &str {
    tag.strip_prefix("action-").unwrap_or(tag)
}

pub(crate) fn unit_ordinal(unit: &str) -> u64 {
    unit.rsplit_once('/')
        .and_then(|(_, ordinal)| ordinal.parse().ok())
        .unwrap_or(u64::MAX)
}

// Wire format of the controller's JSON-RPC protocol.

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    #[serde(rename = "request-id")]
    pub request_id: u64,
    #[serde(rename = "type")]
    pub facade: &'a str,
    pub version: u32,
    pub request: &'a str,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(rename = "request-id")]
    pub request_id: u64,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(rename = "error-code", default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest {
    #[serde(rename = "auth-tag")]
    pub auth_tag: String,
    pub credentials: String,
    pub nonce: String,
    pub macaroons: Vec<Value>,
    #[serde(rename = "client-version")]
    pub client_version: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserModelList {
    #[serde(rename = "user-models", default)]
    pub user_models: Vec<UserModel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserModel {
    pub model: ModelInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelInfo {
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FullStatus {
    #[serde(default)]
    pub applications: HashMap<String, ApplicationStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationStatus {
    #[serde(default)]
    pub status: Option<DetailedStatus>,
    #[serde(default)]
    pub units: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailedStatus {
    #[serde(default)]
    pub status: String,
}

impl FullStatus {
    pub fn into_applications(self) -> HashMap<String, Application> {
        self.applications
            .into_iter()
            .map(|(name, entry)| {
                let mut units: Vec<String> = entry
                    .units
                    .map(|units| units.into_keys().collect())
                    .unwrap_or_default();
                units.sort_by(|a, b| unit_ordinal(a).cmp(&unit_ordinal(b)).then(a.cmp(b)));

                let status = entry
                    .status
                    .map(|s| s.status)
                    .filter(|s| !s.is_empty());

                let application = Application {
                    name: name.clone(),
                    status,
                    units,
                };
                (name, application)
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionSpecs {
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionSpec {
    pub receiver: String,
    pub name: String,
    pub parameters: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Entities {
    pub entities: Vec<Entity>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Entity {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResults {
    #[serde(default)]
    pub results: Vec<ActionResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResult {
    #[serde(default)]
    pub action: Option<ActionInfo>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionInfo {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}
