use juju::{ConnectParams, DEFAULT_PORT};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::error::{NsError, Result};

pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const AGENTS_DIR: &str = "/var/lib/juju/agents";
const AGENT_CONF: &str = "agent.conf";

const ENV_API_ADDRESSES: &str = "JUJU_API_ADDRESSES";
const ENV_MODEL_NAME: &str = "JUJU_MODEL_NAME";
const ENV_UNIT_NAME: &str = "JUJU_UNIT_NAME";
const ENV_CHARM_DIR: &str = "JUJU_CHARM_DIR";

/// Connection and polling settings for one [`NetworkService`](crate::NetworkService).
#[derive(Clone)]
pub struct ServiceConfig {
    /// Controller API address, with or without a port.
    pub endpoint: String,
    /// Port used when `endpoint` carries none.
    pub port: u16,
    pub username: String,
    pub secret: String,
    /// PEM encoded controller CA certificate.
    pub cacert: Option<String>,
    pub model_name: String,
    /// Name of the unit this service runs as, used to derive application names.
    pub unit_name: Option<String>,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(
        endpoint: impl Into<String>,
        model_name: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            secret: secret.into(),
            cacert: None,
            model_name: model_name.into(),
            unit_name: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_cacert(mut self, cacert: impl Into<String>) -> Self {
        self.cacert = Some(cacert.into());
        self
    }

    pub fn with_unit_name(mut self, unit_name: impl Into<String>) -> Self {
        self.unit_name = Some(unit_name.into());
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_params(&self) -> ConnectParams {
        ConnectParams::new(&self.endpoint, &self.username, &self.secret)
            .with_port(self.port)
            .with_cacert(self.cacert.clone())
    }

    /// Build the configuration of a charm running inside the model.
    ///
    /// Reads the controller addresses, model and unit names from the hook
    /// environment and the controller CA certificate from the unit's agent
    /// configuration.
    pub async fn from_env(username: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::from_vars(username, secret, |key| std::env::var(key).ok()).await
    }

    /// Same as [`ServiceConfig::from_env`] with variables resolved through `var`.
    pub async fn from_vars<F>(
        username: impl Into<String>,
        secret: impl Into<String>,
        var: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            var(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| NsError::configuration(format!("{} is not set", key)))
        };

        let addresses = require(ENV_API_ADDRESSES)?;
        // The last advertised address wins.
        let endpoint = addresses
            .split_whitespace()
            .last()
            .ok_or_else(|| NsError::configuration(format!("{} is empty", ENV_API_ADDRESSES)))?
            .to_string();
        let model_name = require(ENV_MODEL_NAME)?;
        let unit_name = require(ENV_UNIT_NAME)?;

        let agent_conf = AgentConfig::path_for(&unit_name, var(ENV_CHARM_DIR).as_deref());
        let agent = AgentConfig::read(&agent_conf).await?;

        Ok(Self::new(endpoint, model_name, username, secret)
            .with_unit_name(unit_name)
            .with_cacert(agent.cacert))
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &crate::connection::mask_secret(&self.secret))
            .field("model_name", &self.model_name)
            .field("unit_name", &self.unit_name)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The parts of a unit agent's `agent.conf` this crate needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub cacert: String,
}

impl AgentConfig {
    /// `agent.conf` sits next to the charm directory; without one the
    /// standard agents directory is assumed.
    pub fn path_for(unit_name: &str, charm_dir: Option<&str>) -> PathBuf {
        if let Some(parent) = charm_dir.and_then(|dir| Path::new(dir).parent()) {
            return parent.join(AGENT_CONF);
        }
        Path::new(AGENTS_DIR)
            .join(format!("unit-{}", unit_name.replace('/', "-")))
            .join(AGENT_CONF)
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            NsError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            NsError::configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Agent config loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const CACERT: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    fn write_agent_conf(dir: &Path, body: &str) -> PathBuf {
        let unit_dir = dir.join("unit-pingpong-ns-aa-0");
        std::fs::create_dir_all(unit_dir.join("charm")).unwrap();
        std::fs::write(unit_dir.join(AGENT_CONF), body).unwrap();
        unit_dir.join("charm")
    }

    fn vars(charm_dir: &Path) -> HashMap<&'static str, String> {
        HashMap::from([
            (ENV_API_ADDRESSES, "10.0.0.1:17070 10.0.0.2:17070".to_string()),
            (ENV_MODEL_NAME, "pingpong".to_string()),
            (ENV_UNIT_NAME, "pingpong-ns-aa/0".to_string()),
            (ENV_CHARM_DIR, charm_dir.display().to_string()),
        ])
    }

    #[test]
    fn test_builder_defaults() {
        let config = ServiceConfig::new("10.0.0.1", "pingpong", DEFAULT_USER, "secret");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.cacert.is_none());

        let params = config.connect_params();
        assert_eq!(params.address(), "10.0.0.1:17070");
        assert_eq!(params.username, "admin");
    }

    #[test]
    fn test_debug_masks_secret() {
        let config = ServiceConfig::new("10.0.0.1", "pingpong", "admin", "supersecretpw");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("supersecretpw"));
        assert!(rendered.contains("tpw"));
    }

    #[test]
    fn test_agent_conf_path() {
        assert_eq!(
            AgentConfig::path_for("ns/0", Some("/var/lib/juju/agents/unit-ns-0/charm")),
            PathBuf::from("/var/lib/juju/agents/unit-ns-0/agent.conf")
        );
        assert_eq!(
            AgentConfig::path_for("ns/0", None),
            PathBuf::from("/var/lib/juju/agents/unit-ns-0/agent.conf")
        );
    }

    #[tokio::test]
    async fn test_from_vars_reads_environment_and_agent_conf() {
        let temp_dir = TempDir::new().unwrap();
        let body = format!("tag: unit-pingpong-ns-aa-0\ncacert: |\n{}", indent(CACERT));
        let charm_dir = write_agent_conf(temp_dir.path(), &body);
        let env = vars(&charm_dir);

        let config = ServiceConfig::from_vars("admin", "secret", |key| env.get(key).cloned())
            .await
            .unwrap();

        assert_eq!(config.endpoint, "10.0.0.2:17070");
        assert_eq!(config.model_name, "pingpong");
        assert_eq!(config.unit_name.as_deref(), Some("pingpong-ns-aa/0"));
        assert_eq!(config.cacert.as_deref(), Some(CACERT));
    }

    #[tokio::test]
    async fn test_from_vars_missing_variable() {
        let temp_dir = TempDir::new().unwrap();
        let charm_dir = write_agent_conf(temp_dir.path(), "cacert: x\n");
        let mut env = vars(&charm_dir);
        env.remove(ENV_MODEL_NAME);

        let err = ServiceConfig::from_vars("admin", "secret", |key| env.get(key).cloned())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NsError::Configuration(reason) if reason.contains(ENV_MODEL_NAME)
        ));
    }

    #[tokio::test]
    async fn test_from_vars_unparseable_agent_conf() {
        let temp_dir = TempDir::new().unwrap();
        let charm_dir = write_agent_conf(temp_dir.path(), "tag: [unterminated\n");
        let env = vars(&charm_dir);

        let err = ServiceConfig::from_vars("admin", "secret", |key| env.get(key).cloned())
            .await
            .unwrap_err();
        assert!(matches!(err, NsError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_agent_conf_without_cacert() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(AGENT_CONF);
        std::fs::write(&path, "tag: unit-ns-0\n").unwrap();

        assert!(matches!(
            AgentConfig::read(&path).await,
            Err(NsError::Configuration(_))
        ));
    }

    fn indent(text: &str) -> String {
        text.lines().map(|line| format!("  {}\n", line)).collect()
    }
}
