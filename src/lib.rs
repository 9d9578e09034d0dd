//! Terminal client for the Stability AI Stable Image API
//!
//! Sends text prompts to the image generation endpoint, saves every
//! successful reply as a timestamped PNG and keeps an in-memory history of
//! the session's results.

pub mod app;
pub mod error;
pub mod generator;
pub mod image;
pub mod models;
pub mod stability;

pub use error::{Error, Result};
