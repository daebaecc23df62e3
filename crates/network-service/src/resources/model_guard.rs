//! RAII guard for per-call model connections.
//!
//! Every status query, output fetch and dispatch opens its own model
//! connection. The guard makes sure that connection is closed whether the
//! call succeeds, fails or is cancelled.

use juju::{Controller, Model};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;

/// RAII guard for a model connection.
///
/// Call [`ModelGuard::release`] when done. A guard dropped without release
/// (an early return through `?`, a cancelled future) spawns the disconnect
/// on the current runtime instead.
///
/// # Example
///
/// ```ignore
/// let guard = ModelGuard::acquire(controller, "pingpong").await?;
/// let result = guard.model().applications().await;
/// guard.release().await;
/// let applications = result?;
/// ```
pub struct ModelGuard {
    model: Arc<dyn Model>,
    released: bool,
}

impl ModelGuard {
    /// Open the model called `name` on `controller`.
    pub async fn acquire(controller: &dyn Controller, name: &str) -> Result<Self> {
        let model = controller.get_model(name).await?;
        debug!(model = %name, "Model acquired");

        Ok(Self::new(Arc::from(model)))
    }

    fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            released: false,
        }
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// Disconnect from the model. Failures are logged, not returned, so they
    /// never mask the outcome of the call the guard was protecting.
    pub async fn release(mut self) {
        self.released = true;

        if let Err(e) = self.model.disconnect().await {
            warn!(model = %self.model.name(), error = %e, "Failed to release model");
        } else {
            debug!(model = %self.model.name(), "Model released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ModelGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let model = Arc::clone(&self.model);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!(model = %model.name(), "Spawning model release in Drop");
                handle.spawn(async move {
                    if let Err(e) = model.disconnect().await {
                        warn!(model = %model.name(), error = %e, "Model release failed in Drop");
                    }
                });
            }
            Err(_) => {
                warn!(model = %model.name(), "No runtime available, model connection leaked");
            }
        }
    }
}
