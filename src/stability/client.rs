use super::GenerationTransport;
use crate::models::{
    Config, FinishReason, GenerationRequest, ServiceResponse, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::Duration;

// The service documents `finish-reason`; older responses used an underscore.
const FINISH_REASON_HEADERS: [&str; 2] = ["finish-reason", "finish_reason"];
const SEED_HEADER: &str = "seed";

/// HTTP client for the Stable Image `generate` endpoints.
pub struct StabilityClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl StabilityClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new_with_client(api_key, client))
    }

    pub fn new_with_client(api_key: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.api_key.clone(), config.timeout)?
            .with_base_url(config.base_url.clone())
            .with_model(config.model.clone()))
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Full URL of the generation endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/generate/{}", self.base_url, self.model)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

#[async_trait]
impl GenerationTransport for StabilityClient {
    async fn send(&self, request: &GenerationRequest) -> Result<ServiceResponse> {
        let url = self.endpoint();
        tracing::debug!(
            "Sending image generation request to {} (aspect ratio {})",
            url,
            request.aspect_ratio
        );

        let form = request
            .form_fields()
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "image/*")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to Stability: {}", e);
                e
            })?;

        let status = response.status().as_u16();
        let finish_reason =
            header_value(response.headers(), &FINISH_REASON_HEADERS).map(FinishReason::from);
        let seed = header_value(response.headers(), &[SEED_HEADER])
            .and_then(|raw| raw.trim().parse::<u64>().ok());
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            "Stability responded with status {} ({} bytes)",
            status,
            body.len()
        );

        Ok(ServiceResponse {
            status,
            finish_reason,
            seed,
            body,
        })
    }
}
