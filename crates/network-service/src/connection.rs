//! Controller session ownership.

use juju::{Controller, ControllerConnector};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{NsError, Result};

const VISIBLE_SECRET_CHARS: usize = 4;

/// Render a secret for logs: only the last four characters stay visible,
/// the rest is replaced by `*`. Secrets too short to hide anything are fully
/// masked.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= VISIBLE_SECRET_CHARS {
        return "*".repeat(len);
    }

    let visible: String = secret.chars().skip(len - VISIBLE_SECRET_CHARS).collect();
    format!("{}{}", "*".repeat(len - VISIBLE_SECRET_CHARS), visible)
}

/// Owns the single controller session of a service instance.
///
/// The session is opened on first use and reused afterwards.
pub struct ConnectionManager {
    config: ServiceConfig,
    connector: Arc<dyn ControllerConnector>,
    session: Option<Box<dyn Controller>>,
}

impl ConnectionManager {
    pub fn new(config: ServiceConfig, connector: Arc<dyn ControllerConnector>) -> Self {
        Self {
            config,
            connector,
            session: None,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Return the live session, connecting first if there is none.
    pub async fn login(&mut self) -> Result<&dyn Controller> {
        if self.session.is_none() {
            let params = self.config.connect_params();
            info!(
                address = %params.address(),
                user = %params.username,
                secret = %mask_secret(&params.password),
                "Connecting to controller"
            );

            let controller = self
                .connector
                .connect(&params)
                .await
                .map_err(|e| NsError::Connection(e.to_string()))?;
            self.session = Some(controller);
        }

        match self.session.as_deref() {
            Some(controller) => Ok(controller),
            None => Err(NsError::Connection("session unavailable".to_string())),
        }
    }

    /// Close the session if one is open.
    pub async fn logout(&mut self) -> Result<()> {
        let Some(controller) = self.session.take() else {
            return Ok(());
        };

        info!(address = %self.config.endpoint, "Disconnecting from controller");
        controller.disconnect().await?;
        Ok(())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let Some(controller) = self.session.take() else {
            return;
        };

        // Cannot await in Drop; hand the disconnect to the runtime if there is one.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Spawning controller disconnect on drop");
                handle.spawn(async move {
                    if let Err(e) = controller.disconnect().await {
                        warn!(error = %e, "Controller disconnect failed in Drop");
                    }
                });
            }
            Err(_) => {
                warn!("No runtime available, dropping controller session without disconnect");
            }
        }
    }
}
