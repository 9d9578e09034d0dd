//! Stability AI image generation integration
//!
//! The [`GenerationTransport`] trait is the single seam where a generation
//! request leaves the process. [`StabilityClient`] performs the real multipart
//! POST; [`MockTransport`] scripts responses for tests and local harnesses.

pub mod client;
pub mod mock;

pub use client::StabilityClient;
pub use mock::MockTransport;

use crate::models::{GenerationRequest, ServiceResponse};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Issue exactly one request. Any HTTP status is an `Ok`; only failures to
    /// obtain a response at all are errors.
    async fn send(&self, request: &GenerationRequest) -> Result<ServiceResponse>;
}
