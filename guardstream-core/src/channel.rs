//! Append-only output channels.
//!
//! A session owns two channels: `main` for sanitized content and the audit
//! channel for status lines. Each is written zero or more times and closed once;
//! closing again is a no-op. The reading half is handed to the caller before any
//! content exists, so output can be consumed while the session is still running.
//!
//! License: MIT OR APACHE 2.0

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::errors::{ChannelError, GuardError};

pub const CONTENT_TYPE_PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Name, content type and free-form metadata of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelDescriptor {
    pub name: String,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

impl ChannelDescriptor {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The write side of a channel, as seen by the driver.
#[async_trait]
pub trait OutputChannel: Send {
    fn descriptor(&self) -> &ChannelDescriptor;

    /// Appends `chunk`. Fails once the channel is closed or its reader is gone.
    async fn write(&mut self, chunk: &str) -> Result<(), ChannelError>;

    /// Closes the channel. A second call must succeed without effect.
    async fn close(&mut self) -> Result<(), ChannelError>;

    fn is_closed(&self) -> bool;
}

/// A bounded in-process queue channel.
#[derive(Debug)]
pub struct QueueChannel {
    descriptor: ChannelDescriptor,
    sender: Option<mpsc::Sender<String>>,
    chars_written: usize,
}

impl QueueChannel {
    /// Creates the channel and its reader. `capacity` must be non-zero.
    pub fn create(descriptor: ChannelDescriptor, capacity: usize) -> Result<(Self, ChannelReader), GuardError> {
        if capacity == 0 {
            return Err(GuardError::Setup(format!(
                "channel '{}' needs a non-zero capacity",
                descriptor.name
            )));
        }
        let (sender, receiver) = mpsc::channel(capacity);
        debug!("Created channel '{}' ({}).", descriptor.name, descriptor.content_type);
        let reader = ChannelReader { descriptor: descriptor.clone(), receiver };
        Ok((Self { descriptor, sender: Some(sender), chars_written: 0 }, reader))
    }

    pub fn chars_written(&self) -> usize {
        self.chars_written
    }
}

#[async_trait]
impl OutputChannel for QueueChannel {
    fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    async fn write(&mut self, chunk: &str) -> Result<(), ChannelError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| ChannelError::Closed(self.descriptor.name.clone()))?;
        sender
            .send(chunk.to_string())
            .await
            .map_err(|_| ChannelError::Disconnected(self.descriptor.name.clone()))?;
        self.chars_written += chunk.chars().count();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        if self.sender.take().is_some() {
            debug!("Closed channel '{}' after {} chars.", self.descriptor.name, self.chars_written);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.sender.is_none()
    }
}

/// The read side of a [`QueueChannel`].
#[derive(Debug)]
pub struct ChannelReader {
    descriptor: ChannelDescriptor,
    receiver: mpsc::Receiver<String>,
}

impl ChannelReader {
    pub fn descriptor(&self) -> &ChannelDescriptor {
        &self.descriptor
    }

    /// Next written chunk, or `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    /// Reads until the channel is closed.
    pub async fn read_to_string(mut self) -> String {
        let mut out = String::new();
        while let Some(chunk) = self.receiver.recv().await {
            out.push_str(&chunk);
        }
        out
    }

    /// Reads and discards until the channel is closed. Returns the number of chunks dropped.
    pub async fn drain(mut self) -> usize {
        let mut dropped = 0;
        while self.receiver.recv().await.is_some() {
            dropped += 1;
        }
        dropped
    }
}
