use super::model::{Environment, Header};
use super::renew::generate_uuid;
use crate::migration::HIGHEST_MIGRATION_ID;

/// Builds freshly-shaped default documents
///
/// Used when a route is imported while no environment is active: the route is
/// wrapped in a new environment produced by the builder.
pub trait EnvironmentBuilder: Send + Sync {
    fn build_environment(&self) -> Environment;
}

/// Builder producing the stock "New environment" document
#[derive(Debug, Clone, Default)]
pub struct DefaultEnvironmentBuilder;

impl EnvironmentBuilder for DefaultEnvironmentBuilder {
    fn build_environment(&self) -> Environment {
        Environment {
            uuid: generate_uuid(),
            last_migration: HIGHEST_MIGRATION_ID,
            name: "New environment".to_string(),
            port: 3000,
            headers: vec![Header::new("Content-Type", "application/json")],
            ..Default::default()
        }
    }
}
