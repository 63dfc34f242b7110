//! Core types for the chapter site.
//!
//! This module provides type-safe wrappers for the content domain.

pub mod email;
pub mod entity;
pub mod id;
pub mod sort;
pub mod user;

pub use email::{Email, EmailError};
pub use entity::{Entity, Fields};
pub use id::*;
pub use sort::{SortDirection, SortSpec, SortSpecError};
pub use user::AuthUser;
