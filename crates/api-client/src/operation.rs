//! Request and response model shared by the client and its [`Agent`](crate::agent::Agent)
//!
//! An [`Operation`] names one ESI endpoint by its Swagger operation id and
//! path template. A [`Request`] fills in the parameters for one call.

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// Method name as sent on the wire
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
        }
    }
}

/// One ESI endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    /// Swagger operation id, e.g. `get_alliances_alliance_id`
    pub id: &'static str,
    /// HTTP method
    pub method: HttpMethod,
    /// Path template relative to the base URL, e.g. `/alliances/{alliance_id}/`
    pub path: &'static str,
}

impl Operation {
    /// Declare a `GET` operation
    #[must_use]
    pub const fn get(id: &'static str, path: &'static str) -> Self {
        Self {
            id,
            method: HttpMethod::Get,
            path,
        }
    }

    /// Declare a `POST` operation
    #[must_use]
    pub const fn post(id: &'static str, path: &'static str) -> Self {
        Self {
            id,
            method: HttpMethod::Post,
            path,
        }
    }
}

/// SSO access token for authenticated operations
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// One call to an [`Operation`]
#[derive(Debug, Clone)]
pub struct Request {
    operation: Operation,
    path_params: Vec<(&'static str, String)>,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    token: Option<AccessToken>,
}

impl Request {
    /// Start a request for `operation`
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            path_params: Vec::new(),
            query: Vec::new(),
            body: None,
            token: None,
        }
    }

    /// Fill a `{name}` placeholder of the path template
    #[must_use]
    pub fn path_param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.path_params.push((name, value.to_string()));
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    /// Attach a JSON body
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Authenticate the request
    #[must_use]
    pub fn token(mut self, token: Option<AccessToken>) -> Self {
        self.token = token;
        self
    }

    /// The operation being called
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Query parameters in insertion order
    #[must_use]
    pub fn query_pairs(&self) -> &[(&'static str, String)] {
        &self.query
    }

    /// Value of a query parameter, if set
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a path parameter, if set
    #[must_use]
    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// JSON body, if any
    #[must_use]
    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Access token, if any
    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Substitute path parameters into the operation's path template
    pub fn render_path(&self) -> ApiResult<String> {
        let template = self.operation.path;
        let mut rendered = String::with_capacity(template.len() + 16);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|offset| open + offset) else {
                break;
            };
            let name = &rest[open + 1..close];
            let value = self.path_value(name).ok_or_else(|| ApiError::MissingParameter {
                operation: self.operation.id,
                parameter: name.to_string(),
            })?;

            rendered.push_str(&rest[..open]);
            rendered.push_str(value);
            rest = &rest[close + 1..];
        }

        rendered.push_str(rest);
        Ok(rendered)
    }
}

/// Parsed response to a [`Request`]
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Parsed JSON body
    pub body: Value,
    /// Page count from the `X-Pages` header, for paginated operations
    pub pages: Option<u32>,
}

impl Response {
    /// Wrap a body without page information
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self { body, pages: None }
    }

    /// Attach the page count
    #[must_use]
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(self) -> ApiResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}
