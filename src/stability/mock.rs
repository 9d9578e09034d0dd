use super::GenerationTransport;
use crate::models::{GenerationRequest, ServiceResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
enum MockReply {
    Response(ServiceResponse),
    TransportFailure(String),
}

/// Scripted transport. Replies cycle in the order they were added; with none
/// configured every call succeeds with a tiny PNG.
#[derive(Clone)]
pub struct MockTransport {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: ServiceResponse) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Response(response));
        self
    }

    pub fn with_transport_failure(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::TransportFailure(message.to_string()));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, oldest first.
    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1 pixel
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49,
        0x44, 0x41, // IDAT chunk
        0x54, 0x08, 0x99, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0xE2,
        0x25, 0x00, 0xBC, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, // IEND chunk
        0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

#[async_trait]
impl GenerationTransport for MockTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<ServiceResponse> {
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(ServiceResponse::new(200, tiny_png()).with_finish_reason("SUCCESS"));
        }

        match &replies[(count - 1) % replies.len()] {
            MockReply::Response(response) => Ok(response.clone()),
            MockReply::TransportFailure(message) => Err(Error::Transport(message.clone())),
        }
    }
}
