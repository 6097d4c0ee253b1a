//! Sources of text deltas.
//!
//! A [`Generator`] yields deltas in order and signals end-of-stream with `None`.
//! Any `Err` is fatal to the session consuming it.

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::errors::GeneratorError;

#[async_trait]
pub trait Generator: Send {
    /// The next delta, or `None` at end-of-stream.
    async fn next_delta(&mut self) -> Result<Option<String>, GeneratorError>;
}

/// Replays an in-memory list of deltas.
#[derive(Debug, Clone)]
pub struct IterGenerator {
    deltas: std::vec::IntoIter<String>,
}

impl IterGenerator {
    pub fn new<I, S>(deltas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let deltas: Vec<String> = deltas.into_iter().map(Into::into).collect();
        Self { deltas: deltas.into_iter() }
    }
}

#[async_trait]
impl Generator for IterGenerator {
    async fn next_delta(&mut self) -> Result<Option<String>, GeneratorError> {
        Ok(self.deltas.next())
    }
}

/// Deltas pushed by another task. End-of-stream is the sender being dropped.
#[derive(Debug)]
pub struct ReceiverGenerator {
    receiver: mpsc::Receiver<Result<String, GeneratorError>>,
}

impl ReceiverGenerator {
    pub fn new(receiver: mpsc::Receiver<Result<String, GeneratorError>>) -> Self {
        Self { receiver }
    }

    /// Creates a connected sender/generator pair.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Result<String, GeneratorError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl Generator for ReceiverGenerator {
    async fn next_delta(&mut self) -> Result<Option<String>, GeneratorError> {
        match self.receiver.recv().await {
            Some(Ok(delta)) => Ok(Some(delta)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// How a [`ReaderGenerator`] slices its input into deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Up to this many bytes per delta, cut on UTF-8 boundaries.
    Chunked(usize),
    /// One line per delta, newline included.
    Lines,
}

/// Deltas read from an async byte source such as stdin or a file.
///
/// With `strip_ansi`, terminal escape sequences are removed per delta; in chunked
/// mode a sequence cut across two reads is not recognised.
pub struct ReaderGenerator<R> {
    reader: BufReader<R>,
    mode: ReadMode,
    strip_ansi: bool,
    remainder: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> ReaderGenerator<R> {
    pub fn new(reader: R, mode: ReadMode) -> Self {
        Self {
            reader: BufReader::new(reader),
            mode,
            strip_ansi: false,
            remainder: Vec::new(),
        }
    }

    pub fn strip_ansi(mut self, enabled: bool) -> Self {
        self.strip_ansi = enabled;
        self
    }

    fn finish_delta(&self, text: String) -> String {
        if self.strip_ansi {
            let stripped = strip_ansi_escapes::strip(text.as_bytes());
            String::from_utf8_lossy(&stripped).into_owned()
        } else {
            text
        }
    }

    /// Splits off the longest valid UTF-8 prefix of the remainder.
    fn take_decoded(&mut self, at_eof: bool) -> String {
        let bytes = std::mem::take(&mut self.remainder);
        match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(e) if e.error_len().is_none() && !at_eof => {
                let valid = e.valid_up_to();
                self.remainder = bytes[valid..].to_vec();
                String::from_utf8_lossy(&bytes[..valid]).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> Generator for ReaderGenerator<R> {
    async fn next_delta(&mut self) -> Result<Option<String>, GeneratorError> {
        loop {
            let text = match self.mode {
                ReadMode::Lines => {
                    let mut line = Vec::new();
                    let n = self.reader.read_until(b'\n', &mut line).await?;
                    if n == 0 {
                        return Ok(None);
                    }
                    String::from_utf8_lossy(&line).into_owned()
                }
                ReadMode::Chunked(chunk_size) => {
                    let mut buf = vec![0u8; chunk_size.max(1)];
                    let n = self.reader.read(&mut buf).await?;
                    if n == 0 {
                        if self.remainder.is_empty() {
                            return Ok(None);
                        }
                        self.take_decoded(true)
                    } else {
                        self.remainder.extend_from_slice(&buf[..n]);
                        self.take_decoded(false)
                    }
                }
            };

            let delta = self.finish_delta(text);
            if !delta.is_empty() {
                debug!("Read delta of {} chars.", delta.chars().count());
                return Ok(Some(delta));
            }
        }
    }
}
