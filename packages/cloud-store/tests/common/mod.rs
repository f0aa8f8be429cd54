//! Shared helpers for backend tests.
//!
//! `RecordingTransport` answers from a queue of canned results and keeps
//! every request it saw, so tests can assert on URLs, bodies and call counts.

#![allow(dead_code)]

use async_trait::async_trait;
use cloud_store::{
    BackendOptions, CloudStoreBackend, Credentials, HttpRequest, HttpResponse, ResourceType,
    Transport, TransportError,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://cloud.example.com/";
pub const ORG_ID: &str = "0ff5c3a5-org";

#[derive(Default)]
pub struct RecordingTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: Value) -> &Self {
        self.push(Ok(HttpResponse::new(status, body.to_string())))
    }

    pub fn reply_raw(&self, response: HttpResponse) -> &Self {
        self.push(Ok(response))
    }

    pub fn fail(&self, err: TransportError) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, reply: Result<HttpResponse, TransportError>) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no canned reply left".into())))
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        access_token: "token-abc".into(),
        organization_id: ORG_ID.into(),
    }
}

pub fn backend(resource_type: ResourceType, transport: Arc<RecordingTransport>) -> CloudStoreBackend {
    CloudStoreBackend::new(
        BackendOptions::new(BASE_URL).resource_type(resource_type),
        credentials(),
        transport,
    )
    .expect("backend should build")
}

pub fn collection_url(plural: &str) -> String {
    format!("{}organizations/{}/{}", BASE_URL, ORG_ID, plural)
}
