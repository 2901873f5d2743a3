use super::model::Header;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// HTTP method of a route
///
/// Uses lowercase naming to match the JSON export format.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Method {
    #[default]
    get,
    post,
    put,
    patch,
    delete,
    head,
    options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::get => "get",
            Method::post => "post",
            Method::put => "put",
            Method::patch => "patch",
            Method::delete => "delete",
            Method::head => "head",
            Method::options => "options",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::get),
            "post" => Ok(Method::post),
            "put" => Ok(Method::put),
            "patch" => Ok(Method::patch),
            "delete" => Ok(Method::delete),
            "head" => Ok(Method::head),
            "options" => Ok(Method::options),
            _ => Err(format!(
                "Invalid method '{}'. Valid options are: get, post, put, patch, delete, head, options",
                s
            )),
        }
    }
}

/// How the rules of a route response are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RulesOperator {
    #[default]
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "AND")]
    And,
}

/// A condition selecting a route response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseRule {
    /// Request part inspected (body, query, header, params)
    pub target: String,
    /// Path or name inside the target
    pub modifier: String,
    pub value: String,
    pub is_regex: bool,
}

/// One of the responses a route can serve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteResponse {
    pub uuid: String,
    pub label: String,
    pub status_code: u16,
    pub body: String,
    /// Latency in milliseconds
    pub latency: u64,
    pub headers: Vec<Header>,
    pub file_path: String,
    pub send_file_as_body: bool,
    pub rules: Vec<ResponseRule>,
    pub rules_operator: RulesOperator,
    pub disable_templating: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RouteResponse {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            label: String::new(),
            status_code: 200,
            body: String::new(),
            latency: 0,
            headers: Vec::new(),
            file_path: String::new(),
            send_file_as_body: false,
            rules: Vec::new(),
            rules_operator: RulesOperator::Or,
            disable_templating: false,
            extra: Map::new(),
        }
    }
}

/// A route of an environment
///
/// A route is identified within its environment by `method` + `endpoint`;
/// two routes sharing both are reported as duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Route {
    pub uuid: String,
    pub documentation: String,
    pub method: Method,
    pub endpoint: String,
    pub responses: Vec<RouteResponse>,
    pub enabled: bool,
    pub random_response: bool,
    pub sequential_response: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Route {
    fn default() -> Self {
        Self {
            uuid: String::new(),
            documentation: String::new(),
            method: Method::get,
            endpoint: String::new(),
            responses: Vec::new(),
            enabled: true,
            random_response: false,
            sequential_response: false,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_from_str() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::get);
        assert_eq!("delete".parse::<Method>().unwrap(), Method::delete);
        assert!("fetch".parse::<Method>().is_err());
    }

    #[test]
    fn test_route_wire_format() {
        let route = Route {
            uuid: "r".to_string(),
            method: Method::post,
            endpoint: "orders".to_string(),
            responses: vec![RouteResponse {
                uuid: "resp".to_string(),
                status_code: 201,
                ..Default::default()
            }],
            ..Default::default()
        };

        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["method"], json!("post"));
        assert_eq!(value["randomResponse"], json!(false));
        assert_eq!(value["responses"][0]["statusCode"], json!(201));
        assert_eq!(value["responses"][0]["rulesOperator"], json!("OR"));
    }
}
