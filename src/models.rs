//! Data models and structures
//!
//! Defines the request and response shapes exchanged with the Stability
//! image API, plus the environment-driven configuration.

use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Output aspect ratio requested from the service.
///
/// The nine named variants are the tokens offered to users. Anything else is
/// kept in [`AspectRatio::Other`] and forwarded untouched; the remote service
/// is the only validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape16x9,
    Portrait9x16,
    Portrait4x5,
    Landscape5x4,
    Landscape3x2,
    Portrait2x3,
    Portrait9x21,
    Landscape21x9,
    Other(String),
}

impl AspectRatio {
    /// The selectable tokens, in the order they are presented.
    pub const SUPPORTED: [AspectRatio; 9] = [
        AspectRatio::Square,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait2x3,
        AspectRatio::Portrait9x21,
        AspectRatio::Landscape21x9,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Square => "1:1",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Portrait4x5 => "4:5",
            Self::Landscape5x4 => "5:4",
            Self::Landscape3x2 => "3:2",
            Self::Portrait2x3 => "2:3",
            Self::Portrait9x21 => "9:21",
            Self::Landscape21x9 => "21:9",
            Self::Other(token) => token,
        }
    }

    /// Whether this is one of the nine known tokens.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for AspectRatio {
    fn from(token: &str) -> Self {
        Self::SUPPORTED
            .iter()
            .find(|ratio| ratio.as_str() == token)
            .cloned()
            .unwrap_or_else(|| Self::Other(token.to_string()))
    }
}

impl From<String> for AspectRatio {
    fn from(token: String) -> Self {
        Self::from(token.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image encoding requested from the service. Only PNG is ever asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Png,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
        }
    }
}

/// One generation request, sent as multipart form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub output_format: OutputFormat,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, aspect_ratio: impl Into<AspectRatio>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: aspect_ratio.into(),
            output_format: OutputFormat::Png,
        }
    }

    /// Form fields in the order they are sent.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("prompt", self.prompt.clone()),
            ("aspect_ratio", self.aspect_ratio.as_str().to_string()),
            ("output_format", self.output_format.as_str().to_string()),
        ]
    }
}

/// Provider-supplied explanation of why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Success,
    ContentFiltered,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "SUCCESS",
            Self::ContentFiltered => "CONTENT_FILTERED",
            Self::Other(reason) => reason,
        }
    }
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value.trim() {
            "SUCCESS" => Self::Success,
            "CONTENT_FILTERED" => Self::ContentFiltered,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Raw outcome of one HTTP exchange, before any file is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub finish_reason: Option<FinishReason>,
    pub seed: Option<u64>,
    pub body: Vec<u8>,
}

impl ServiceResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            finish_reason: None,
            seed: None,
            body,
        }
    }

    pub fn with_finish_reason(mut self, reason: impl Into<FinishReason>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// Configuration
pub const DEFAULT_BASE_URL: &str = "https://api.stability.ai/v2beta/stable-image";
pub const DEFAULT_MODEL: &str = "core";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_images";
pub const DEFAULT_IMAGE_PREFIX: &str = "stability";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub image_prefix: String,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first
    /// when one exists.
    pub fn from_env() -> crate::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("STABILITY_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| crate::Error::Config("STABILITY_API_KEY not set".to_string()))?;

        let timeout_secs = match lookup("STABILITY_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(crate::Error::Config(format!(
                        "STABILITY_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            base_url: lookup("STABILITY_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: lookup("STABILITY_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            output_dir: lookup("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            image_prefix: lookup("IMAGE_PREFIX")
                .unwrap_or_else(|| DEFAULT_IMAGE_PREFIX.to_string()),
        })
    }
}
