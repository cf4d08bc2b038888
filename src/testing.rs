//! Shared test doubles.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::api::{Transport, TransportRequest, TransportResponse};
use crate::error::AuthError;

/// Wrap a payload in the server's success envelope.
pub(crate) fn ok_envelope(data: Value) -> String {
    json!({ "status": "ok", "data": data }).to_string()
}

/// Scripted transport: responses are queued per path and handed out in
/// order; every request is recorded for assertions. An unscripted request
/// fails with a network error so tests catch unexpected calls.
#[derive(Default)]
pub(crate) struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<TransportResponse, AuthError>>>>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enqueue(&self, path: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(TransportResponse {
                status,
                body: body.to_string(),
            }));
    }

    pub fn enqueue_error(&self, path: &str, error: AuthError) {
        self.responses
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.url.ends_with(path))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn perform(&self, request: TransportRequest) -> Result<TransportResponse, AuthError> {
        self.calls.lock().push(request.clone());

        let mut responses = self.responses.lock();
        let queue = responses
            .iter_mut()
            .find(|(path, _)| request.url.ends_with(path.as_str()))
            .map(|(_, queue)| queue);

        match queue.and_then(VecDeque::pop_front) {
            Some(response) => response,
            None => Err(AuthError::Network(format!(
                "unscripted request to {}",
                request.url
            ))),
        }
    }
}
