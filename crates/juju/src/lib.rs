//! Client for the Juju controller API.
//!
//! [`ControllerConnector`], [`Controller`] and [`Model`] describe the part of
//! the controller API the network service relies on; [`JujuConnector`]
//! implements them over the controller's websocket JSON-RPC protocol.

pub mod client;
pub mod error;
mod rpc;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_server;

pub use client::{JujuConnector, JujuController, JujuModel};
pub use error::{JujuError, Result};
pub use traits::{Controller, ControllerConnector, Model};
pub use types::{
    action_id, action_tag, unit_tag, Action, Application, ConnectParams, DEFAULT_PORT,
};
