use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods the remote API is exercised with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single call against the remote API, relative to the client's base URL.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(endpoint: &str) -> Self {
        Self {
            method: Method::Get,
            endpoint: endpoint.to_string(),
            ..Default::default()
        }
    }
}

/// Response payload. The server is free to send anything, so the body is kept
/// as a tagged union instead of a typed schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Malformed(String),
}

impl ResponseBody {
    pub fn parse(text: &str) -> Self {
        if text.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Malformed(text.to_string()),
        }
    }

    /// Top-level field of a JSON object body, if present.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            ResponseBody::Json(Value::Object(map)) => map.get(key),
            _ => None,
        }
    }

    /// Top-level string field of a JSON object body, if present.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    /// JSON rendering used as diagnostic detail in reports.
    pub fn to_detail(&self) -> Value {
        match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Malformed(raw) => Value::String(raw.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self { status, body }
    }

    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status, ResponseBody::Json(body))
    }
}

/// The only capability checks need from the remote service.
pub trait Transport: Send + Sync {
    fn call(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Credentials and addressing for the remote API session.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

/// Blocking HTTP session shared by every check of a run.
///
/// Must be built and dropped outside of an async context (the CLI does all
/// its HTTP work inside `spawn_blocking`).
pub struct HttpClient {
    client: Client,
    settings: ClientSettings,
}

impl HttpClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("oracle-smoke/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, settings })
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), endpoint)
    }
}

impl Transport for HttpClient {
    fn call(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.endpoint);

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(user) = &self.settings.username {
            builder = builder.basic_auth(user, self.settings.password.as_deref());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send() {
            Ok(r) => r,
            Err(e) if e.is_timeout() => anyhow::bail!(
                "{} {} timed out after {}s",
                request.method,
                url,
                self.settings.timeout.as_secs()
            ),
            Err(e) if e.is_connect() => {
                return Err(e).with_context(|| format!("Connection to {url} failed"));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("{} {} failed", request.method, url));
            }
        };

        let status = response.status().as_u16();
        let text = response
            .text()
            .with_context(|| format!("Failed to read response body from {url}"))?;

        Ok(ApiResponse::new(status, ResponseBody::parse(&text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::net::TcpListener;

    fn client_for(server: &Server) -> HttpClient {
        HttpClient::new(ClientSettings {
            base_url: server.url(),
            username: Some("admin".to_string()),
            password: Some("admin".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_parse_body_variants() {
        assert_eq!(ResponseBody::parse(""), ResponseBody::Empty);
        assert_eq!(ResponseBody::parse("  \n"), ResponseBody::Empty);
        assert_eq!(
            ResponseBody::parse(r#"{"status":"success"}"#),
            ResponseBody::Json(json!({"status": "success"}))
        );
        assert_eq!(
            ResponseBody::parse("<html>oops</html>"),
            ResponseBody::Malformed("<html>oops</html>".to_string())
        );
    }

    #[test]
    fn test_field_access_on_unexpected_shapes() {
        let body = ResponseBody::Json(json!(["a", "b"]));
        assert!(body.field("status").is_none());

        let body = ResponseBody::Json(json!({"status": 3}));
        assert!(body.field("status").is_some());
        assert!(body.str_field("status").is_none());

        assert!(ResponseBody::Empty.str_field("status").is_none());
    }

    #[test]
    fn test_get_sends_basic_auth_and_query() {
        let mut server = Server::new();
        // admin:admin
        let mock = server
            .mock("GET", "/api/oracle/core/tables")
            .match_header("authorization", "Basic YWRtaW46YWRtaW4=")
            .match_query(Matcher::UrlEncoded("schemaName".into(), "C##DEEPAI".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","tables":[]}"#)
            .create();

        let client = client_for(&server);
        let mut request = ApiRequest::get("/api/oracle/core/tables");
        request.query.push(("schemaName".to_string(), "C##DEEPAI".to_string()));

        let response = client.call(&request).unwrap();
        mock.assert();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.str_field("status"), Some("success"));
    }

    #[test]
    fn test_post_sends_json_body() {
        let mut server = Server::new();
        let mock = server
            .mock("POST", "/api/oracle/ai/analyze-data")
            .match_body(Matcher::Json(json!({"tableName": "CUSTOMERS"})))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create();

        let client = client_for(&server);
        let request = ApiRequest {
            method: Method::Post,
            endpoint: "/api/oracle/ai/analyze-data".to_string(),
            body: Some(json!({"tableName": "CUSTOMERS"})),
            query: Vec::new(),
        };

        let response = client.call(&request).unwrap();
        mock.assert();
        assert_eq!(response.status, 200);
    }

    #[test]
    fn test_not_found_and_empty_body() {
        let mut server = Server::new();
        let _mock = server.mock("GET", "/api/missing").with_status(404).create();

        let client = client_for(&server);
        let response = client.call(&ApiRequest::get("/api/missing")).unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, ResponseBody::Empty);
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let mut server = Server::new();
        let mock = server.mock("GET", "/api/csrf/info").with_status(200).create();

        let client = HttpClient::new(ClientSettings {
            base_url: format!("{}/", server.url()),
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        client.call(&ApiRequest::get("/api/csrf/info")).unwrap();
        mock.assert();
    }

    #[test]
    fn test_connection_refused_is_error() {
        let client = HttpClient::new(ClientSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = client.call(&ApiRequest::get("/actuator/health")).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("Connection to http://127.0.0.1:1/actuator/health failed"));
        assert!(!msg.contains("timed out"));
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut held = Vec::new();
            for stream in listener.incoming().flatten() {
                held.push(stream);
            }
        });

        let client = HttpClient::new(ClientSettings {
            base_url: format!("http://{addr}"),
            username: None,
            password: None,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let err = client.call(&ApiRequest::get("/api/oracle/core/health")).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("GET"));
        assert!(msg.contains("timed out after 1s"));
    }
}
