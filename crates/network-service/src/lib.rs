//! Run primitives on the VNF applications of a network service.
//!
//! A network service charm uses [`NetworkService`] to dispatch primitives
//! (Juju actions) to the applications deployed next to it, follow their
//! status and collect their output. [`BlockingNetworkService`] offers the
//! same operations to synchronous callers.

pub mod blocking;
pub mod config;
pub mod connection;
pub mod error;
pub mod resources;
pub mod runner;
pub mod service;
pub mod state_machine;

pub use blocking::BlockingNetworkService;
pub use config::{
    AgentConfig, ServiceConfig, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT, DEFAULT_USER,
};
pub use connection::{mask_secret, ConnectionManager};
pub use error::{NsError, Result};
pub use ns_core::{OperationHandle, PrimitiveParams, PrimitiveStatus};
pub use runner::PrimitiveRun;
pub use service::NetworkService;
pub use state_machine::{PollState, PollStateMachine};
