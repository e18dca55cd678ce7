//! In-memory [`Agent`] for driving the entity families in tests

use crate::agent::Agent;
use crate::client::EsiClient;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::operation::{Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Handler = Arc<dyn Fn(&Request) -> ApiResult<Response> + Send + Sync>;

/// Routes requests by operation id and records every call
#[derive(Clone, Default)]
pub(crate) struct FakeAgent {
    routes: HashMap<&'static str, Handler>,
    calls: Arc<Mutex<Vec<Request>>>,
}

impl FakeAgent {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `operation` with the body built by `handler`
    pub(crate) fn on<H>(self, operation: &'static str, handler: H) -> Self
    where
        H: Fn(&Request) -> Value + Send + Sync + 'static,
    {
        self.on_result(operation, move |request| Ok(Response::new(handler(request))))
    }

    /// Answer `operation` with an `X-Pages` count
    pub(crate) fn with_pages<H>(self, operation: &'static str, pages: u32, handler: H) -> Self
    where
        H: Fn(&Request) -> Value + Send + Sync + 'static,
    {
        self.on_result(operation, move |request| {
            Ok(Response::new(handler(request)).with_pages(pages))
        })
    }

    /// Answer `operation` with full control over the result
    pub(crate) fn on_result<H>(mut self, operation: &'static str, handler: H) -> Self
    where
        H: Fn(&Request) -> ApiResult<Response> + Send + Sync + 'static,
    {
        self.routes.insert(operation, Arc::new(handler));
        self
    }

    /// A client whose every request lands here
    pub(crate) fn client(&self) -> EsiClient {
        EsiClient::with_agent(Arc::new(self.clone()), ClientConfig::default())
    }

    /// Requests made so far to `operation`, in call order
    pub(crate) fn calls(&self, operation: &str) -> Vec<Request> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.operation().id == operation)
            .cloned()
            .collect()
    }

    pub(crate) fn call_count(&self, operation: &str) -> usize {
        self.calls(operation).len()
    }
}

#[async_trait]
impl Agent for FakeAgent {
    async fn request(&self, request: Request) -> ApiResult<Response> {
        self.calls.lock().unwrap().push(request.clone());
        let operation = request.operation().id;
        match self.routes.get(operation) {
            Some(handler) => handler(&request),
            None => Err(ApiError::api_response(404, format!("no route for {operation}"))),
        }
    }
}

/// Path parameter parsed as an id
pub(crate) fn path_id(request: &Request, name: &str) -> i64 {
    request
        .path_value(name)
        .and_then(|value| value.parse().ok())
        .unwrap_or_else(|| panic!("missing path parameter {name}"))
}

/// JSON body parsed as a list of ids
pub(crate) fn body_ids(request: &Request) -> Vec<i64> {
    request
        .json_body()
        .and_then(|body| serde_json::from_value(body.clone()).ok())
        .unwrap_or_default()
}
