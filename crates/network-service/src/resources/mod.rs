//! RAII resource guards for automatic cleanup.
//!
//! - [`ModelGuard`] - per-call model connection, released on every exit path

mod model_guard;

pub use model_guard::ModelGuard;
