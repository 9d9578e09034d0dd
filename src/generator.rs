//! Image generation client and per-request results
//!
//! [`Generator`] sends one request per call through a [`GenerationTransport`],
//! turns the reply into a [`GenerationResult`] and keeps every result in an
//! in-memory history for the life of the process.

use crate::image::ImageStore;
use crate::models::{AspectRatio, Config, FinishReason, GenerationRequest, ServiceResponse};
use crate::stability::{GenerationTransport, StabilityClient};
use crate::Result;
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const SUCCESS_STATUS: u16 = 200;

/// Outcome of one generation request.
///
/// `image_path` is set exactly when `status` is 200, and then points at a
/// fully written file holding the response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    status: u16,
    finish_reason: Option<FinishReason>,
    seed: Option<u64>,
    image_path: Option<PathBuf>,
}

impl GenerationResult {
    /// Interpret a raw response, persisting the body on success.
    pub async fn from_response(
        response: ServiceResponse,
        store: &ImageStore,
        timestamp: NaiveDateTime,
    ) -> Result<Self> {
        let ServiceResponse {
            status,
            finish_reason,
            seed,
            body,
        } = response;

        if status != SUCCESS_STATUS {
            tracing::error!(
                "Image generation failed (status {}): {}",
                status,
                String::from_utf8_lossy(&body)
            );
            return Ok(Self {
                status,
                finish_reason,
                seed,
                image_path: None,
            });
        }

        if finish_reason == Some(FinishReason::ContentFiltered) {
            tracing::warn!("Image was returned with finish reason CONTENT_FILTERED");
        }

        let image_path = store.save(body, timestamp).await?;

        Ok(Self {
            status,
            finish_reason,
            seed,
            image_path: Some(image_path),
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    /// The saved image path as a display string, if an image was saved.
    pub fn image(&self) -> Option<String> {
        self.image_path
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    }

    /// Pretty-printed JSON form, as printed by the one-shot CLI.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub struct Generator {
    transport: Box<dyn GenerationTransport>,
    store: ImageStore,
    clock: Clock,
    history: Vec<GenerationResult>,
}

impl Generator {
    pub fn new(transport: Box<dyn GenerationTransport>, store: ImageStore) -> Self {
        Self {
            transport,
            store,
            clock: Box::new(|| Local::now().naive_local()),
            history: Vec::new(),
        }
    }

    /// Build a generator backed by the real Stability client.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = StabilityClient::from_config(config)?;
        let store = ImageStore::new(&config.output_dir, config.image_prefix.clone())?;
        tracing::info!(
            "Image provider: Stability (model: {}, base url: {})",
            config.model,
            config.base_url
        );
        Ok(Self::new(Box::new(transport), store))
    }

    /// Replace the wall clock used to name saved images.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Generate one image.
    ///
    /// A non-200 reply is an `Ok` result without an image. `Err` means the
    /// request never got a reply or the image could not be written; nothing
    /// is added to the history in that case.
    pub async fn generate(
        &mut self,
        prompt: &str,
        aspect_ratio: impl Into<AspectRatio>,
    ) -> Result<GenerationResult> {
        let request = GenerationRequest::new(prompt, aspect_ratio);
        let response = self.transport.send(&request).await?;

        let result = GenerationResult::from_response(response, &self.store, (self.clock)()).await?;
        self.history.push(result.clone());
        Ok(result)
    }

    /// Every result produced so far, oldest first.
    pub fn history(&self) -> &[GenerationResult] {
        &self.history
    }

    /// Saved image paths in history order.
    pub fn gallery(&self) -> Vec<&Path> {
        self.history
            .iter()
            .filter_map(GenerationResult::image_path)
            .collect()
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stability::MockTransport;
    use crate::Error;
    use chrono::NaiveDate;
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 58)
            .unwrap()
    }

    fn setup(transport: MockTransport) -> (TempDir, Generator) {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("out"), "stability").unwrap();
        let generator = Generator::new(Box::new(transport), store).with_clock(fixed_time);
        (dir, generator)
    }

    #[tokio::test]
    async fn test_success_saves_body_and_records_status() {
        let body = vec![9u8, 8, 7, 6, 5, 4, 3, 2, 1, 0];
        let transport = MockTransport::new().with_response(
            ServiceResponse::new(200, body.clone())
                .with_finish_reason("SUCCESS")
                .with_seed(1234),
        );
        let (_dir, mut generator) = setup(transport);

        let result = generator.generate("a red cube", "1:1").await.unwrap();

        assert_eq!(result.status(), 200);
        assert!(result.is_success());
        assert_eq!(result.finish_reason(), Some(&FinishReason::Success));
        assert_eq!(result.seed(), Some(1234));
        let path = result.image_path().unwrap();
        assert_eq!(fs::read(path).unwrap(), body);
        assert!(result
            .image()
            .unwrap()
            .ends_with("stability_20250131_235958.png"));
    }

    #[tokio::test]
    async fn test_error_status_leaves_image_unset_and_writes_nothing() {
        let transport = MockTransport::new().with_response(ServiceResponse::new(
            401,
            br#"{"name":"unauthorized"}"#.to_vec(),
        ));
        let (_dir, mut generator) = setup(transport);

        let result = generator.generate("a red cube", "1:1").await.unwrap();

        assert_eq!(result.status(), 401);
        assert!(!result.is_success());
        assert!(result.image_path().is_none());
        assert!(result.image().is_none());
        assert_eq!(
            fs::read_dir(generator.store().output_dir()).unwrap().count(),
            0
        );
        assert_eq!(generator.history().len(), 1);
    }

    #[tokio::test]
    async fn test_error_body_is_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer({
                let logs = logs.clone();
                move || logs.clone()
            })
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = MockTransport::new().with_response(ServiceResponse::new(
            401,
            br#"{"errors":["invalid api key"]}"#.to_vec(),
        ));
        let (_dir, mut generator) = setup(transport);

        generator.generate("a red cube", "1:1").await.unwrap();

        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("status 401"));
        assert!(output.contains(r#"{"errors":["invalid api key"]}"#));
    }

    #[tokio::test]
    async fn test_non_200_success_codes_are_not_saved() {
        let transport = MockTransport::new().with_response(ServiceResponse::new(202, vec![1, 2]));
        let (_dir, mut generator) = setup(transport);

        let result = generator.generate("a red cube", "1:1").await.unwrap();

        assert!(result.image_path().is_none());
    }

    #[tokio::test]
    async fn test_history_grows_in_order() {
        let transport = MockTransport::new()
            .with_response(ServiceResponse::new(200, b"one".to_vec()))
            .with_response(ServiceResponse::new(500, b"oops".to_vec()))
            .with_response(ServiceResponse::new(200, b"three".to_vec()));
        let (_dir, mut generator) = setup(transport);

        for prompt in ["one", "two", "three"] {
            generator.generate(prompt, "1:1").await.unwrap();
        }

        let statuses: Vec<u16> = generator.history().iter().map(|r| r.status()).collect();
        assert_eq!(statuses, vec![200, 500, 200]);

        let gallery = generator.gallery();
        assert_eq!(gallery.len(), 2);
        assert_eq!(fs::read(gallery[0]).unwrap(), b"one");
        assert_eq!(fs::read(gallery[1]).unwrap(), b"three");
    }

    #[tokio::test]
    async fn test_transport_failure_is_returned_and_not_recorded() {
        let transport = MockTransport::new().with_transport_failure("dns lookup failed");
        let (_dir, mut generator) = setup(transport);

        let err = generator.generate("a red cube", "1:1").await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(generator.history().is_empty());
    }

    #[tokio::test]
    async fn test_request_fields_are_forwarded_verbatim() {
        let transport = MockTransport::new();
        let requests_seen = transport.clone();
        let (_dir, mut generator) = setup(transport);

        generator.generate("a red cube", "21:9").await.unwrap();
        generator.generate("a blue cone", "13:7").await.unwrap();

        let requests = requests_seen.get_requests();
        assert_eq!(requests[0], GenerationRequest::new("a red cube", "21:9"));
        assert_eq!(requests[1].aspect_ratio, AspectRatio::Other("13:7".to_string()));
    }

    #[tokio::test]
    async fn test_content_filtered_image_is_still_saved() {
        let transport = MockTransport::new().with_response(
            ServiceResponse::new(200, vec![1, 2, 3]).with_finish_reason("CONTENT_FILTERED"),
        );
        let (_dir, mut generator) = setup(transport);

        let result = generator.generate("a red cube", "1:1").await.unwrap();

        assert_eq!(result.finish_reason(), Some(&FinishReason::ContentFiltered));
        assert!(result.image_path().is_some());
    }

    #[tokio::test]
    async fn test_same_second_results_keep_both_images() {
        let transport = MockTransport::new()
            .with_response(ServiceResponse::new(200, b"first".to_vec()))
            .with_response(ServiceResponse::new(200, b"second".to_vec()));
        let (_dir, mut generator) = setup(transport);

        let first = generator.generate("a", "1:1").await.unwrap();
        let second = generator.generate("b", "1:1").await.unwrap();

        assert_ne!(first.image_path(), second.image_path());
        assert_eq!(fs::read(first.image_path().unwrap()).unwrap(), b"first");
        assert_eq!(fs::read(second.image_path().unwrap()).unwrap(), b"second");
    }

    #[test]
    fn test_to_json_is_pretty_printed() {
        let result = GenerationResult {
            status: 401,
            finish_reason: None,
            seed: None,
            image_path: None,
        };

        let json = result.to_json().unwrap();
        assert!(json.contains("\n  \"status\": 401"));
        assert!(json.contains("\"image_path\": null"));
    }

    #[test]
    fn test_result_serializes_to_json() {
        let result = GenerationResult {
            status: 200,
            finish_reason: Some(FinishReason::Success),
            seed: Some(7),
            image_path: Some(PathBuf::from("out/stability_20250131_235958.png")),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": 200,
                "finish_reason": "SUCCESS",
                "seed": 7,
                "image_path": "out/stability_20250131_235958.png"
            })
        );
    }
}
