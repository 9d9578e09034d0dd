//! Interactive front-end that drives a [`Generator`] from user input.

use crate::generator::{GenerationResult, Generator};
use crate::models::{AspectRatio, Config};
use crate::Result;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

/// What the user sees after one action: the newest image, if any, and every
/// image saved so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub latest: Option<PathBuf>,
    pub gallery: Vec<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Empty,
    Prompt(&'a str),
    Ratio(&'a str),
    ListRatios,
    History,
    Quit,
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Prompt(line);
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        match (name, arg) {
            ("ratio", arg) if !arg.is_empty() => Command::Ratio(arg),
            ("ratios", "") => Command::ListRatios,
            ("history", "") => Command::History,
            ("quit", "") | ("exit", "") => Command::Quit,
            _ => Command::Unknown(line),
        }
    }
}

/// Owns the generator for one session; it is passed in rather than shared.
pub struct App {
    generator: Generator,
}

impl App {
    pub fn with_generator(generator: Generator) -> Self {
        Self { generator }
    }

    /// Construct an app backed by the real Stability client.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_generator(Generator::from_config(config)?))
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Run one generation and return the updated view.
    pub async fn submit(
        &mut self,
        prompt: &str,
        aspect_ratio: impl Into<AspectRatio>,
    ) -> Result<Preview> {
        let result = self.generator.generate(prompt, aspect_ratio).await?;

        Ok(Preview {
            latest: result.image_path().map(PathBuf::from),
            gallery: self
                .generator
                .gallery()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        })
    }

    /// Read prompts and commands line by line until `/quit` or end of input.
    /// Lines that are not valid UTF-8 are decoded lossily.
    ///
    /// Transport and filesystem failures end the session with an error.
    pub async fn run_interactive<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
        aspect_ratio: AspectRatio,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut aspect_ratio = aspect_ratio;
        let mut reader = reader;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            // Bytes that are not UTF-8 are replaced rather than ending the session.
            let line = String::from_utf8_lossy(&buf);
            let output = match Command::parse(&line) {
                Command::Empty => continue,
                Command::Quit => break,
                Command::Prompt(prompt) => {
                    info!("Generating image ({}): {}", aspect_ratio, prompt);
                    let preview = self.submit(prompt, aspect_ratio.clone()).await?;
                    match preview.latest {
                        Some(path) => format!("saved {}\n", path.display()),
                        None => {
                            let status = self
                                .generator
                                .history()
                                .last()
                                .map(GenerationResult::status)
                                .unwrap_or_default();
                            format!("no image (status {})\n", status)
                        }
                    }
                }
                Command::Ratio(token) => {
                    aspect_ratio = AspectRatio::from(token);
                    if aspect_ratio.is_supported() {
                        format!("aspect ratio set to {}\n", aspect_ratio)
                    } else {
                        format!(
                            "aspect ratio set to {} (not a known token, sending as-is)\n",
                            aspect_ratio
                        )
                    }
                }
                Command::ListRatios => {
                    let supported = AspectRatio::SUPPORTED;
                    let tokens: Vec<&str> = supported.iter().map(AspectRatio::as_str).collect();
                    format!("{}\n", tokens.join(" "))
                }
                Command::History => self.render_history(),
                Command::Unknown(input) => format!("unknown command: {}\n", input),
            };

            writer.write_all(output.as_bytes()).await?;
            writer.flush().await?;
        }

        Ok(())
    }

    fn render_history(&self) -> String {
        let history = self.generator.history();
        if history.is_empty() {
            return "no generations yet\n".to_string();
        }

        history
            .iter()
            .enumerate()
            .map(|(index, result)| {
                format!(
                    "{}. {} {} {}\n",
                    index + 1,
                    result.status(),
                    result
                        .finish_reason()
                        .map(|reason| reason.as_str())
                        .unwrap_or("-"),
                    result.image().unwrap_or_else(|| "-".to_string())
                )
            })
            .collect()
    }
}
