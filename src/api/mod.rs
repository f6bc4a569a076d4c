//! REST API surface
//!
//! - [`auth`]: authorization gate in front of every handler
//! - [`rest`]: route table and handlers
//! - [`server`]: listener lifecycle

pub mod auth;
pub mod rest;
pub mod server;

pub use auth::Claims;
pub use rest::{ApiState, router};
pub use server::{ApiServer, ApiServerConfig};
