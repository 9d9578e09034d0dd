//! Local persistence of generated images
//!
//! Derives timestamped filenames and writes response bodies into the output
//! directory without ever exposing a partially written file.

pub mod store;

pub use store::ImageStore;
