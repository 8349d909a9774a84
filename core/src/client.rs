//! The request dispatcher every endpoint method funnels through.
//!
//! # Design
//! `Trello` holds the credentials, the base URL and a shared transport, and
//! carries no mutable state between calls. A call goes through three steps:
//! `build_request` merges the credentials with the caller's options into an
//! owned `HttpRequest`, the request is spawned on the current tokio runtime,
//! and `parse_response` turns the transport's answer into a payload or an
//! error.
//! The first and last steps are public so callers can drive the I/O
//! themselves.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::TrelloError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::options::{Params, RequestOptions};
use crate::transport::{Transport, UreqTransport};

pub const DEFAULT_BASE_URL: &str = "https://api.trello.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Application key and user token. Both are sent on every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    token: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            token: token.into(),
        }
    }

    /// Read `TRELLO_KEY` and `TRELLO_TOKEN`.
    pub fn from_env() -> Result<Self, TrelloError> {
        Ok(Self::new(env_var("TRELLO_KEY")?, env_var("TRELLO_TOKEN")?))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn to_params(&self) -> Params {
        let mut params = Params::new();
        params.insert("key", self.key.as_str());
        params.insert("token", self.token.as_str());
        params
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("token", &"<secret>")
            .finish()
    }
}

fn env_var(name: &'static str) -> Result<String, TrelloError> {
    std::env::var(name).map_err(|e| TrelloError::Config(format!("{name}: {e}")))
}

/// Client settings other than the credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Applied by the default transport to the whole exchange.
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: Some(concat!("trello-core/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

/// Trello API client.
///
/// Cheap to clone; clones share the transport. Every method returning a
/// future spawns its request immediately, so it must be called from within a
/// tokio runtime.
#[derive(Clone)]
pub struct Trello {
    credentials: Credentials,
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Trello {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trello")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Trello {
    /// Client for the public Trello API with the default configuration.
    pub fn new(key: impl Into<String>, token: impl Into<String>) -> Self {
        Self::builder(Credentials::new(key, token)).build()
    }

    pub fn builder(credentials: Credentials) -> TrelloBuilder {
        TrelloBuilder {
            credentials,
            config: ClientConfig::default(),
            transport: None,
        }
    }

    /// Credentials from the environment, plus `TRELLO_BASE_URL` when set.
    pub fn from_env() -> Result<Self, TrelloError> {
        let mut builder = Self::builder(Credentials::from_env()?);
        if let Ok(base_url) = std::env::var("TRELLO_BASE_URL") {
            builder = builder.base_url(base_url);
        }
        Ok(builder.build())
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Dispatch a request and return a future for its result.
    ///
    /// `method` is matched case-insensitively against GET, POST, PUT and
    /// DELETE; anything else fails here, before any I/O. `path` is appended
    /// to the base URL verbatim. `options` is only read: the merged query is
    /// built on an owned copy. The request is already in flight when this
    /// returns.
    pub fn request(
        &self,
        method: &str,
        path: &str,
        options: Option<&RequestOptions>,
    ) -> Result<PendingRequest, TrelloError> {
        let method: HttpMethod = method.parse()?;
        self.dispatch(method, path, options)
    }

    /// Like [`request`](Self::request), but delivers the result to
    /// `callback` instead of returning a future. The callback runs exactly
    /// once, on the runtime, unless this call itself returns an error.
    pub fn request_with<F>(
        &self,
        method: &str,
        path: &str,
        options: Option<&RequestOptions>,
        callback: F,
    ) -> Result<(), TrelloError>
    where
        F: FnOnce(Result<Value, TrelloError>) + Send + 'static,
    {
        let method: HttpMethod = method.parse()?;
        self.dispatch_with(method, path, options, callback)
    }

    pub(crate) fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        options: Option<&RequestOptions>,
    ) -> Result<PendingRequest, TrelloError> {
        let runtime = current_runtime()?;
        let request = self.build_request(method, path, options)?;
        let transport = Arc::clone(&self.transport);
        let handle = runtime.spawn(exchange(transport, request));
        Ok(PendingRequest { handle })
    }

    pub(crate) fn dispatch_with<F>(
        &self,
        method: HttpMethod,
        path: &str,
        options: Option<&RequestOptions>,
        callback: F,
    ) -> Result<(), TrelloError>
    where
        F: FnOnce(Result<Value, TrelloError>) + Send + 'static,
    {
        let runtime = current_runtime()?;
        let request = self.build_request(method, path, options)?;
        let transport = Arc::clone(&self.transport);
        runtime.spawn(async move {
            callback(exchange(transport, request).await);
        });
        Ok(())
    }

    /// Build the outbound request without sending it.
    ///
    /// The query holds `key` and `token` followed by the caller's query
    /// parameters, a caller key replacing a credential of the same name.
    /// `options.data` becomes a JSON body for POST and PUT and is dropped for
    /// GET and DELETE. NaN or infinite values are rejected.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: Option<&RequestOptions>,
    ) -> Result<HttpRequest, TrelloError> {
        let empty = RequestOptions::default();
        let options = options.unwrap_or(&empty);

        options.query.check_finite("query")?;
        let mut query = self.credentials.to_params();
        query.extend_from(&options.query);

        let mut headers = Vec::new();
        let body = if options.data.is_empty() {
            None
        } else if method.carries_body() {
            let body = Value::Object(options.data.to_json("data")?);
            headers.push(("content-type".to_string(), "application/json".to_string()));
            Some(body.to_string())
        } else {
            warn!(%method, path, "ignoring request data, {method} requests carry no body");
            None
        };

        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            query: query.rendered(),
            headers,
            body,
        })
    }

    /// Interpret a transport response.
    ///
    /// 404 maps to `NotFound` and any other non-2xx status to `HttpStatus`.
    /// A 2xx body is decoded as JSON (empty decodes to `null`); a decoded
    /// object whose `error` field is a string is reported as `Service`.
    pub fn parse_response(response: HttpResponse) -> Result<Value, TrelloError> {
        check_status(&response)?;
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&response.body).map_err(|e| TrelloError::Decode(e.to_string()))?;
        if let Some(message) = service_error(&value) {
            return Err(TrelloError::Service(message));
        }
        Ok(value)
    }
}

/// Builder returned by [`Trello::builder`].
pub struct TrelloBuilder {
    credentials: Credentials,
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl TrelloBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default ureq transport. Timeout and user agent settings
    /// are then up to the supplied transport.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Trello {
        let ClientConfig {
            base_url,
            timeout,
            user_agent,
        } = self.config;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(UreqTransport::new(timeout, user_agent)));
        Trello {
            credentials: self.credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }
}

/// Result of a dispatched request.
///
/// The request runs on its own task whether or not this future is polled;
/// dropping it discards the result but does not cancel the exchange.
#[derive(Debug)]
pub struct PendingRequest {
    handle: JoinHandle<Result<Value, TrelloError>>,
}

impl PendingRequest {
    /// Await the payload and decode it into `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, TrelloError> {
        let value = self.await?;
        serde_json::from_value(value).map_err(|e| TrelloError::Decode(e.to_string()))
    }
}

impl Future for PendingRequest {
    type Output = Result<Value, TrelloError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(TrelloError::Task(e.to_string())),
        })
    }
}

fn current_runtime() -> Result<Handle, TrelloError> {
    Handle::try_current().map_err(|e| TrelloError::Runtime(e.to_string()))
}

/// One transport round-trip, parsed.
async fn exchange(transport: Arc<dyn Transport>, request: HttpRequest) -> Result<Value, TrelloError> {
    let method = request.method;
    let url = request.url.clone();
    let query_keys: Vec<&str> = request.query.iter().map(|(k, _)| k.as_str()).collect();
    debug!(%method, %url, query = ?query_keys, "dispatching request");

    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(%method, %url, error = %e, "transport failed");
            return Err(TrelloError::Transport(e));
        }
    };

    debug!(%method, %url, status = response.status, "response received");
    Trello::parse_response(response)
}

fn check_status(response: &HttpResponse) -> Result<(), TrelloError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(TrelloError::NotFound);
    }
    Err(TrelloError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

fn service_error(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    let error = obj.get("error")?.as_str()?;
    match obj.get("message").and_then(Value::as_str) {
        Some(message) => Some(format!("{error}: {message}")),
        None => Some(error.to_string()),
    }
}
