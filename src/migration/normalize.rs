//! Field defaulting helpers shared by the migration steps
//!
//! All helpers tolerate malformed input: a `routes` value that is not an
//! array, or an entry that is not an object, is skipped rather than rejected.
//! Typing the migrated document reports the real problem afterwards.

use serde_json::{Map, Value};

pub(crate) type Object = Map<String, Value>;

/// Insert `default` under `key` unless the key is already present
pub(crate) fn set_default(object: &mut Object, key: &str, default: Value) {
    object.entry(key).or_insert(default);
}

/// Iterate the route objects of an environment
pub(crate) fn routes_mut(environment: &mut Object) -> impl Iterator<Item = &mut Object> {
    environment
        .get_mut("routes")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

/// Iterate the response objects of a route
pub(crate) fn responses_mut(route: &mut Object) -> impl Iterator<Item = &mut Object> {
    route
        .get_mut("responses")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

/// Apply `f` to every route response of an environment
pub(crate) fn for_each_response(environment: &mut Object, mut f: impl FnMut(&mut Object)) {
    for route in routes_mut(environment) {
        for response in responses_mut(route) {
            f(response);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_default_keeps_existing_value() {
        let mut object = json!({ "a": 1 }).as_object().cloned().unwrap();
        set_default(&mut object, "a", json!(2));
        set_default(&mut object, "b", json!(3));
        assert_eq!(Value::Object(object), json!({ "a": 1, "b": 3 }));
    }

    #[test]
    fn test_for_each_response_skips_malformed_entries() {
        let mut environment = json!({
            "routes": [
                { "responses": [ {}, "oops" ] },
                "not a route",
                { "responses": 12 },
                { "responses": [ {} ] }
            ]
        })
        .as_object()
        .cloned()
        .unwrap();

        let mut count = 0;
        for_each_response(&mut environment, |_| count += 1);
        assert_eq!(count, 2);
    }
}
