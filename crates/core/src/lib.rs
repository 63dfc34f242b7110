//! Chapter Core - Shared types library.
//!
//! This crate provides the types shared by every chapter site component:
//! - `site` - Content API server, entity store facade, session cache
//! - `cli` - Operator commands (migrations, accounts, content edits)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Entity records, string IDs, sort specs, emails, and signed-in users

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
