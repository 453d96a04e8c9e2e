//! The crud system: registry, controller and HTTP handlers

pub mod controller;
pub mod handlers;
pub mod registry;

pub use controller::{CrudController, CrudRequest};
pub use registry::{CrudConfig, CrudDefinition, CrudRegistry, CrudRoutes};
