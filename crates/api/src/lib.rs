//! kbase API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! provisioner, operator commands) so the `kbase` binary and the integration
//! tests share them.

pub mod auth;
pub mod background;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod ops;
pub mod provisioner;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod server;
pub mod state;
