//! Chapter site library.
//!
//! The entity store facade and the session/authorization cache, plus the
//! HTTP API and the `PostgreSQL` implementations behind them. The `chapter`
//! CLI and the integration tests link against this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod testing;
