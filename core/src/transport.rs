//! Injectable transport layer.
//!
//! Contract: `send` performs exactly one HTTP exchange for the given request
//! and reports it exactly once, either as an `HttpResponse` (any status) or
//! as a `TransportError` when no response was obtained. Transports must not
//! retry and must not interpret status codes.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Boxed future returned by [`Transport::send`].
pub type TransportFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send>>;

pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: HttpRequest) -> TransportFuture;
}

/// Transport backed by a blocking `ureq` agent.
///
/// Each exchange runs on tokio's blocking pool so the async caller is never
/// parked on socket I/O. Non-2xx statuses come back as data, leaving status
/// interpretation to the dispatcher.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
}

impl UreqTransport {
    pub fn new(timeout: Option<Duration>, user_agent: Option<String>) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self { agent, user_agent }
    }

    /// Wrap an agent configured by the caller. The agent should have
    /// `http_status_as_error(false)` so 4xx/5xx responses reach the client.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self {
            agent,
            user_agent: None,
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture {
        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || execute(&agent, user_agent.as_deref(), request))
                .await
                .map_err(TransportError::new)?
        })
    }
}

/// Run one request on `agent`, dispatching on the verb.
fn execute(
    agent: &ureq::Agent,
    user_agent: Option<&str>,
    req: HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let mut response = match (req.method, req.body.as_deref()) {
        (HttpMethod::Get, _) => decorate(agent.get(&req.url), &req, user_agent).call(),
        (HttpMethod::Delete, _) => decorate(agent.delete(&req.url), &req, user_agent).call(),
        (HttpMethod::Post, Some(body)) => decorate(agent.post(&req.url), &req, user_agent)
            .content_type("application/json")
            .send(body.as_bytes()),
        (HttpMethod::Post, None) => decorate(agent.post(&req.url), &req, user_agent).send_empty(),
        (HttpMethod::Put, Some(body)) => decorate(agent.put(&req.url), &req, user_agent)
            .content_type("application/json")
            .send(body.as_bytes()),
        (HttpMethod::Put, None) => decorate(agent.put(&req.url), &req, user_agent).send_empty(),
    }?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Attach query parameters and headers. `content-type` is left to the
/// body-sending arms.
fn decorate<B>(
    mut builder: ureq::RequestBuilder<B>,
    req: &HttpRequest,
    user_agent: Option<&str>,
) -> ureq::RequestBuilder<B> {
    for (k, v) in &req.query {
        builder = builder.query(k, v);
    }
    for (k, v) in &req.headers {
        if !k.eq_ignore_ascii_case("content-type") {
            builder = builder.header(k, v);
        }
    }
    if let Some(ua) = user_agent {
        builder = builder.header("user-agent", ua);
    }
    builder
}
