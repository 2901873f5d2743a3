//! Duplicate detection
//!
//! Environments conflict when they listen on the same port; routes conflict
//! when they share method and endpoint inside one environment. Only later
//! occurrences are reported: the item at position `i` is a duplicate when an
//! item at some position `j < i` has the same key. The first occurrence of a
//! key is never flagged, which decides which of two colliding items is shown
//! as "the duplicate".
//!
//! The scans are pairwise (O(n²)) and run after every store mutation; the
//! collections are editor-sized.

use crate::environment::{Environment, Route};
use std::collections::{HashMap, HashSet};

/// Uuids of duplicated routes, per environment uuid
pub type DuplicatedRoutes = HashMap<String, HashSet<String>>;

/// Collect the ids of items colliding with an earlier item of `items`
fn later_duplicates<T, F, I>(items: &[T], collide: F, id: I) -> HashSet<String>
where
    F: Fn(&T, &T) -> bool,
    I: Fn(&T) -> &str,
{
    let mut duplicates = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        if items[..index].iter().any(|earlier| collide(earlier, item)) {
            duplicates.insert(id(item).to_string());
        }
    }

    duplicates
}

/// Uuids of environments sharing a port with an earlier environment
pub fn list_duplicated_environments(environments: &[Environment]) -> HashSet<String> {
    later_duplicates(
        environments,
        |a, b| a.port == b.port,
        |environment| environment.uuid.as_str(),
    )
}

/// Uuids of routes sharing method and endpoint with an earlier route of the same environment
pub fn list_duplicated_route_uuids(environment: &Environment) -> HashSet<String> {
    later_duplicates(
        &environment.routes,
        |a: &Route, b: &Route| a.method == b.method && a.endpoint == b.endpoint,
        |route| route.uuid.as_str(),
    )
}

/// Duplicated routes for every environment, keyed by environment uuid
///
/// Every environment gets an entry, empty when it has no duplicates.
pub fn list_duplicated_routes(environments: &[Environment]) -> DuplicatedRoutes {
    environments
        .iter()
        .map(|environment| {
            (
                environment.uuid.clone(),
                list_duplicated_route_uuids(environment),
            )
        })
        .collect()
}
