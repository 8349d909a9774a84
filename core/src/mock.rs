//! Recording transport for tests.
//!
//! `MockTransport` records every request it is asked to send and answers
//! from a queue of scripted replies. When the queue is empty it answers
//! `200` with an empty body, which the dispatcher decodes as `null`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportFuture};

/// A scripted answer to one request.
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    /// Fail at the transport level with this message.
    Fail(String),
}

impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        MockReply::Response(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        MockReply::Response(HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: body.to_string(),
        })
    }

    pub fn fail(msg: &str) -> Self {
        MockReply::Fail(msg.to_string())
    }
}

#[derive(Debug, Default)]
struct MockState {
    recorded: Mutex<Vec<HttpRequest>>,
    replies: Mutex<VecDeque<MockReply>>,
}

/// Transport that never touches the network. Clones share state, so keep
/// one clone to inspect after handing the other to the client.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    st: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: MockReply) -> Self {
        lock(&self.st.replies).push_back(reply);
        self
    }

    pub fn replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        lock(&self.st.replies).extend(replies);
        self
    }

    pub fn recorded(&self) -> Vec<HttpRequest> {
        lock(&self.st.recorded).clone()
    }

    pub fn recorded_len(&self) -> usize {
        lock(&self.st.recorded).len()
    }

    /// The only recorded request. Panics unless exactly one was sent.
    pub fn single(&self) -> HttpRequest {
        let mut recorded = self.recorded();
        assert_eq!(
            recorded.len(),
            1,
            "expected exactly one request, got {}:\n{recorded:#?}",
            recorded.len()
        );
        recorded.swap_remove(0)
    }

    pub fn remaining_replies(&self) -> usize {
        lock(&self.st.replies).len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> TransportFuture {
        let st = self.st.clone();
        Box::pin(async move {
            lock(&st.recorded).push(request);
            let reply = lock(&st.replies).pop_front();
            match reply {
                Some(MockReply::Response(resp)) => Ok(resp),
                Some(MockReply::Fail(msg)) => Err(TransportError::message(msg)),
                None => Ok(HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: String::new(),
                }),
            }
        })
    }
}

/// Lock, recovering the guard from a poisoned mutex.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
