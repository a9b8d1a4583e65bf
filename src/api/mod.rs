//! HTTP surface for the intake service.
//!
//! `intake_router()` returns a composable `Router`; `start_intake_server_on()`
//! binds it and runs it in the background until shut down.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::intake_router;
pub use server::{start_intake_server_on, IntakeServer};
pub use types::ApiContext;
