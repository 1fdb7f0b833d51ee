//! Scripted transport for unit tests

use crate::core::error::{ClientError, ClientResult};
use crate::core::transport::{ApiRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct Scripted {
    gate: Option<Arc<Notify>>,
    result: ClientResult<HttpResponse>,
}

/// Replays queued responses in order and records every request it receives
#[derive(Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: HttpResponse) {
        self.push(None, Ok(response));
    }

    pub fn respond_json(&self, status: u16, body: Value) {
        self.respond(HttpResponse::json(status, &body));
    }

    /// Queue a response that is only released once `gate` is notified
    pub fn respond_json_after(&self, gate: Arc<Notify>, status: u16, body: Value) {
        self.push(Some(gate), Ok(HttpResponse::json(status, &body)));
    }

    /// Queue a transport failure (no response at all)
    pub fn fail(&self, reason: &str) {
        self.push(None, Err(ClientError::Transport(reason.to_string())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> ApiRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    fn push(&self, gate: Option<Arc<Notify>>, result: ClientResult<HttpResponse>) {
        self.queue.lock().unwrap().push_back(Scripted { gate, result });
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ClientResult<HttpResponse> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        let next = self.queue.lock().unwrap().pop_front();
        let Some(scripted) = next else {
            return Err(ClientError::Transport(format!(
                "no scripted response for {path}"
            )));
        };

        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        scripted.result
    }
}
