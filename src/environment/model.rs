use super::route::Route;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A key/value HTTP header
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A mock API environment
///
/// The environment is the top-level editable document. It listens on `port`
/// and owns an ordered list of routes. `last_migration` records the id of the
/// last migration step applied to this document; see the `migration` module.
///
/// Fields unknown to this version are kept in `extra` and written back
/// untouched, so documents survive a round trip through an older or newer
/// installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Environment {
    /// Unique identifier
    pub uuid: String,
    /// Id of the last migration step applied
    pub last_migration: u32,
    /// Display name
    pub name: String,
    /// Prefix prepended to every route endpoint
    pub endpoint_prefix: String,
    /// Global latency added to every response, in milliseconds
    pub latency: u64,
    /// Listening port
    pub port: u16,
    /// Listening address
    pub hostname: String,
    /// Routes in display order
    pub routes: Vec<Route>,
    /// Forward unmatched requests to `proxy_host`
    pub proxy_mode: bool,
    pub proxy_host: String,
    pub proxy_req_headers: Vec<Header>,
    pub proxy_res_headers: Vec<Header>,
    /// Headers added to every response
    pub headers: Vec<Header>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            last_migration: 0,
            name: String::new(),
            endpoint_prefix: String::new(),
            latency: 0,
            port: 3000,
            hostname: "0.0.0.0".to_string(),
            routes: Vec::new(),
            proxy_mode: false,
            proxy_host: String::new(),
            proxy_req_headers: Vec::new(),
            proxy_res_headers: Vec::new(),
            headers: Vec::new(),
            extra: Map::new(),
        }
    }
}

impl Environment {
    /// Find a route by its uuid
    pub fn find_route(&self, uuid: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.uuid == uuid)
    }

    /// Remove a route by its uuid and return it
    pub fn remove_route(&mut self, uuid: &str) -> Option<Route> {
        let pos = self.routes.iter().position(|route| route.uuid == uuid)?;
        Some(self.routes.remove(pos))
    }
}
