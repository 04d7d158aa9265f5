//! Incremental server-sent events decoding.
//!
//! # Purpose
//! Reassembles `text/event-stream` frames from arbitrary byte chunks and
//! classifies them into relay messages.
//!
//! # Key invariants
//! - A frame is complete only at a blank line; partial lines stay buffered.
//! - Lines are split on `\n`, with a trailing `\r` stripped, so `\r\n` input
//!   decodes the same as `\n`.
//! - Comment lines (leading `:`) are keep-alives and never produce a frame.
use crate::error::ClientError;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use storyboard_core::ChangeEvent;

const CONNECTED_SENTINEL: &str = "connected";

/// One dispatched event: optional `event:` name plus joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.take_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn take_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            if self.data.is_empty() {
                self.event = None;
                return None;
            }
            return Some(SseFrame {
                event: self.event.take(),
                data: std::mem::take(&mut self.data).join("\n"),
            });
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // `id` and `retry` are not used by the relay.
            _ => {}
        }
        None
    }
}

/// A relay message as seen by the list controller.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    Connected,
    Change(ChangeEvent),
    /// The relay reported a subscription failure and is closing.
    Error(String),
}

impl StreamMessage {
    pub fn from_frame(frame: SseFrame) -> Result<Self, ClientError> {
        if frame.event.as_deref() == Some("error") {
            let message = serde_json::from_str::<serde_json::Value>(&frame.data)
                .ok()
                .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(frame.data);
            return Ok(Self::Error(message));
        }
        if frame.data == CONNECTED_SENTINEL {
            return Ok(Self::Connected);
        }
        Ok(Self::Change(serde_json::from_str(&frame.data)?))
    }
}

/// Decode a byte stream into relay messages.
pub fn decode_messages<S, B, E>(bytes: S) -> impl Stream<Item = Result<StreamMessage, ClientError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
{
    let state = (Box::pin(bytes), SseDecoder::new(), VecDeque::<SseFrame>::new());
    stream::unfold(state, |(mut bytes, mut decoder, mut ready)| async move {
        loop {
            if let Some(frame) = ready.pop_front() {
                let message = StreamMessage::from_frame(frame);
                return Some((message, (bytes, decoder, ready)));
            }
            match bytes.next().await {
                Some(Ok(chunk)) => ready.extend(decoder.push(chunk.as_ref())),
                Some(Err(err)) => return Some((Err(err.into()), (bytes, decoder, ready))),
                None => return None,
            }
        }
    })
}
