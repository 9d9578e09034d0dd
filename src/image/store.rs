use crate::models::OutputFormat;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone)]
pub struct ImageStore {
    output_dir: PathBuf,
    prefix: String,
    format: OutputFormat,
}

impl ImageStore {
    /// Open a store rooted at `output_dir`, creating the directory if needed.
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        tracing::info!("Using output directory: {}", output_dir.display());

        Ok(Self {
            output_dir,
            prefix: prefix.into(),
            format: OutputFormat::Png,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<prefix>_YYYYMMDD_HHMMSS.png`. Two calls within the same second yield
    /// the same name.
    pub fn file_name(&self, timestamp: NaiveDateTime) -> String {
        self.candidate_name(timestamp, 0)
    }

    fn candidate_name(&self, timestamp: NaiveDateTime, sequence: u32) -> String {
        let stem = format!("{}_{}", self.prefix, timestamp.format(TIMESTAMP_FORMAT));
        if sequence == 0 {
            format!("{}.{}", stem, self.format.extension())
        } else {
            format!("{}_{}.{}", stem, sequence, self.format.extension())
        }
    }

    /// Write `data` under the name derived from `timestamp` and return the
    /// final path. Existing files are never replaced.
    pub async fn save(&self, data: Vec<u8>, timestamp: NaiveDateTime) -> Result<PathBuf> {
        tokio::task::spawn_blocking({
            let store = self.clone();
            move || store.save_sync(&data, timestamp)
        })
        .await
        .map_err(|e| Error::Invariant(format!("Image write task join error: {}", e)))?
    }

    fn save_sync(&self, data: &[u8], timestamp: NaiveDateTime) -> Result<PathBuf> {
        // Staged in the same directory so the final move is a rename.
        let mut staged = NamedTempFile::new_in(&self.output_dir)?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;

        let mut sequence = 0;
        loop {
            let path = self
                .output_dir
                .join(self.candidate_name(timestamp, sequence));

            match staged.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::info!("Saved image ({} bytes) to {}", data.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::warn!(
                        "{} already exists, adding sequence suffix {}",
                        path.display(),
                        sequence + 1
                    );
                    staged = e.file;
                    sequence += 1;
                }
                Err(e) => return Err(e.error.into()),
            }
        }
    }
}
