//! In-memory document store
//!
//! All mutations of the environment collection go through
//! [`EnvironmentStore::update`]. Applying an action, recomputing duplicates
//! and publishing the new collection happen under one lock, so readers and
//! subscribers never observe a half-applied change.

use crate::duplicates::{DuplicatedRoutes, list_duplicated_environments, list_duplicated_routes};
use crate::environment::{Environment, Route};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// A mutation of the environment collection
#[derive(Debug, Clone)]
pub enum StoreAction {
    /// Append an environment; it becomes active when none is
    AddEnvironment(Environment),
    /// Remove an environment by uuid
    RemoveEnvironment(String),
    /// Replace the environment with the same uuid
    UpdateEnvironment(Environment),
    /// Append a route to the active environment
    AddRoute(Route),
    /// Remove a route by uuid from whichever environment owns it
    RemoveRoute(String),
    /// Select the active environment by uuid
    SetActiveEnvironment(String),
}

/// Snapshot of the store contents
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub environments: Vec<Environment>,
    pub active_environment_uuid: Option<String>,
    /// Environments sharing a port with an earlier one
    pub duplicated_environments: HashSet<String>,
    /// Routes sharing method and endpoint with an earlier one, per environment
    pub duplicated_routes: DuplicatedRoutes,
}

impl StoreState {
    fn recompute_duplicates(&mut self) {
        self.duplicated_environments = list_duplicated_environments(&self.environments);
        self.duplicated_routes = list_duplicated_routes(&self.environments);
    }

    fn find_environment_mut(&mut self, uuid: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|e| e.uuid == uuid)
    }

    /// Apply an action, returning whether anything changed
    fn apply(&mut self, action: StoreAction) -> bool {
        match action {
            StoreAction::AddEnvironment(environment) => {
                if self.active_environment_uuid.is_none() {
                    self.active_environment_uuid = Some(environment.uuid.clone());
                }
                self.environments.push(environment);
                true
            }
            StoreAction::RemoveEnvironment(uuid) => {
                let before = self.environments.len();
                self.environments.retain(|e| e.uuid != uuid);
                if self.environments.len() == before {
                    return false;
                }
                if self.active_environment_uuid.as_deref() == Some(uuid.as_str()) {
                    self.active_environment_uuid =
                        self.environments.first().map(|e| e.uuid.clone());
                }
                true
            }
            StoreAction::UpdateEnvironment(environment) => {
                match self.find_environment_mut(&environment.uuid) {
                    Some(existing) => {
                        *existing = environment;
                        true
                    }
                    None => false,
                }
            }
            StoreAction::AddRoute(route) => {
                let Some(active) = self.active_environment_uuid.clone() else {
                    return false;
                };
                match self.find_environment_mut(&active) {
                    Some(environment) => {
                        environment.routes.push(route);
                        true
                    }
                    None => false,
                }
            }
            StoreAction::RemoveRoute(uuid) => self
                .environments
                .iter_mut()
                .any(|environment| environment.remove_route(&uuid).is_some()),
            StoreAction::SetActiveEnvironment(uuid) => {
                if self.environments.iter().any(|e| e.uuid == uuid) {
                    self.active_environment_uuid = Some(uuid);
                    true
                } else {
                    false
                }
            }
        }
    }
}

/// The live environment collection
pub struct EnvironmentStore {
    state: Mutex<StoreState>,
    environments_tx: watch::Sender<Vec<Environment>>,
}

impl Default for EnvironmentStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl EnvironmentStore {
    /// Create a store seeded with `environments`; the first one is active
    pub fn new(environments: Vec<Environment>) -> Self {
        let mut state = StoreState {
            active_environment_uuid: environments.first().map(|e| e.uuid.clone()),
            environments,
            ..Default::default()
        };
        state.recompute_duplicates();

        let (environments_tx, _) = watch::channel(state.environments.clone());
        Self {
            state: Mutex::new(state),
            environments_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a mutation
    ///
    /// # Returns
    /// `true` if the action changed the collection. Actions referring to an
    /// unknown uuid (or adding a route with no active environment) are
    /// ignored and return `false`.
    pub fn update(&self, action: StoreAction) -> bool {
        let mut state = self.lock();
        debug!("Store update: {:?}", ActionName(&action));

        if !state.apply(action) {
            warn!("Store update had no effect");
            return false;
        }

        state.recompute_duplicates();
        self.environments_tx
            .send_replace(state.environments.clone());
        true
    }

    /// Subscribe to the environment collection; every update publishes a new value
    pub fn subscribe(&self) -> watch::Receiver<Vec<Environment>> {
        self.environments_tx.subscribe()
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.lock().environments.clone()
    }

    pub fn environment_by_uuid(&self, uuid: &str) -> Option<Environment> {
        self.lock()
            .environments
            .iter()
            .find(|e| e.uuid == uuid)
            .cloned()
    }

    pub fn active_environment_uuid(&self) -> Option<String> {
        self.lock().active_environment_uuid.clone()
    }

    pub fn active_environment(&self) -> Option<Environment> {
        let state = self.lock();
        let uuid = state.active_environment_uuid.as_deref()?;
        state.environments.iter().find(|e| e.uuid == uuid).cloned()
    }

    pub fn duplicated_environments(&self) -> HashSet<String> {
        self.lock().duplicated_environments.clone()
    }

    pub fn duplicated_routes(&self) -> DuplicatedRoutes {
        self.lock().duplicated_routes.clone()
    }
}

/// Short description of an action for logs (environments can be large)
struct ActionName<'a>(&'a StoreAction);

impl std::fmt::Debug for ActionName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            StoreAction::AddEnvironment(e) => write!(f, "AddEnvironment({})", e.uuid),
            StoreAction::RemoveEnvironment(uuid) => write!(f, "RemoveEnvironment({})", uuid),
            StoreAction::UpdateEnvironment(e) => write!(f, "UpdateEnvironment({})", e.uuid),
            StoreAction::AddRoute(r) => write!(f, "AddRoute({})", r.uuid),
            StoreAction::RemoveRoute(uuid) => write!(f, "RemoveRoute({})", uuid),
            StoreAction::SetActiveEnvironment(uuid) => {
                write!(f, "SetActiveEnvironment({})", uuid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Method;

    fn environment(uuid: &str, port: u16) -> Environment {
        Environment {
            uuid: uuid.to_string(),
            port,
            ..Default::default()
        }
    }

    fn route(uuid: &str, endpoint: &str) -> Route {
        Route {
            uuid: uuid.to_string(),
            method: Method::get,
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_added_environment_becomes_active() {
        let store = EnvironmentStore::default();
        assert!(store.active_environment().is_none());

        store.update(StoreAction::AddEnvironment(environment("a", 3000)));
        store.update(StoreAction::AddEnvironment(environment("b", 3001)));

        assert_eq!(store.active_environment_uuid().as_deref(), Some("a"));
        assert_eq!(store.environments().len(), 2);
    }

    #[test]
    fn test_duplicates_recomputed_on_every_update() {
        let store = EnvironmentStore::new(vec![environment("a", 3000)]);
        assert!(store.duplicated_environments().is_empty());

        store.update(StoreAction::AddEnvironment(environment("b", 3000)));
        assert!(store.duplicated_environments().contains("b"));

        let mut moved = environment("b", 3005);
        moved.routes = vec![route("r1", "x"), route("r2", "x")];
        store.update(StoreAction::UpdateEnvironment(moved));
        assert!(store.duplicated_environments().is_empty());
        assert!(store.duplicated_routes()["b"].contains("r2"));

        store.update(StoreAction::RemoveRoute("r1".to_string()));
        assert!(store.duplicated_routes()["b"].is_empty());
    }

    #[test]
    fn test_add_route_needs_active_environment() {
        let store = EnvironmentStore::default();
        assert!(!store.update(StoreAction::AddRoute(route("r", "x"))));

        store.update(StoreAction::AddEnvironment(environment("a", 3000)));
        assert!(store.update(StoreAction::AddRoute(route("r", "x"))));
        assert_eq!(store.active_environment().unwrap().routes.len(), 1);
    }

    #[test]
    fn test_removing_active_environment_selects_next() {
        let store = EnvironmentStore::new(vec![environment("a", 1), environment("b", 2)]);
        assert!(store.update(StoreAction::SetActiveEnvironment("b".to_string())));
        assert!(!store.update(StoreAction::SetActiveEnvironment("zzz".to_string())));

        store.update(StoreAction::RemoveEnvironment("b".to_string()));
        assert_eq!(store.active_environment_uuid().as_deref(), Some("a"));

        store.update(StoreAction::RemoveEnvironment("a".to_string()));
        assert!(store.active_environment_uuid().is_none());
    }

    #[test]
    fn test_subscribers_see_each_update() {
        let store = EnvironmentStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.update(StoreAction::AddEnvironment(environment("a", 3000)));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        // no-op actions are not published
        store.update(StoreAction::RemoveEnvironment("missing".to_string()));
        assert!(!rx.has_changed().unwrap());
    }
}
