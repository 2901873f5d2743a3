//! Environment domain models
//!
//! This module contains the documents persisted and exchanged by envport.
//! It is split into submodules:
//! - `model`: the environment record (top-level document)
//! - `route`: routes, route responses and HTTP methods (sub-documents)
//! - `renew`: identifier renewal for whole document trees
//! - `builder`: construction of freshly-shaped default documents

mod builder;
mod model;
mod renew;
mod route;

pub use builder::{DefaultEnvironmentBuilder, EnvironmentBuilder};
pub use model::{Environment, Header};
pub use renew::{generate_uuid, renew_environment_uuids, renew_route_uuids};
pub use route::{Method, ResponseRule, Route, RouteResponse, RulesOperator};
