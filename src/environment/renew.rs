//! Identifier renewal
//!
//! Exported documents never carry identifiers from the exporting installation
//! and imported documents never collide with live ones: both paths replace
//! every uuid in the document tree with a fresh one.

use super::model::Environment;
use super::route::Route;
use uuid::Uuid;

/// Generate a fresh random identifier
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Replace the uuid of an environment and of every route and route response it owns
pub fn renew_environment_uuids(mut environment: Environment) -> Environment {
    environment.uuid = generate_uuid();
    environment.routes = environment
        .routes
        .into_iter()
        .map(renew_route_uuids)
        .collect();
    environment
}

/// Replace the uuid of a route and of every response it owns
pub fn renew_route_uuids(mut route: Route) -> Route {
    route.uuid = generate_uuid();
    for response in &mut route.responses {
        response.uuid = generate_uuid();
    }
    route
}
