//! Server module for building HTTP servers serving the registered cruds
//!
//! This module provides a `ServerBuilder` that registers:
//! - Crud routes (list, new, edit, drop) under the route prefix
//! - Health check routes

pub mod builder;
pub mod router;

pub use builder::ServerBuilder;
pub use router::{build_crud_routes, health_routes};
