// ABOUTME: Line-buffering SSE parser for the vendor's streaming Responses endpoint
// ABOUTME: Reassembles events split across network chunks and maps them to stream events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Blueprint Server Contributors

//! # SSE Stream Parser
//!
//! Network chunks and SSE event boundaries do not line up. A single chunk can
//! carry several `data:` lines, and one JSON payload can be split across two
//! chunks. [`SseLineBuffer`] accumulates bytes until a full line is available;
//! [`create_sse_stream`] drives it over a `reqwest` byte stream and hands each
//! payload to a caller-supplied decoder.
//!
//! The Responses API names the event inside the JSON `type` field, so the
//! `event:` line is skipped and only `data:` payloads are surfaced.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};

use super::{ResponseStream, ResponseStreamEvent};
use crate::errors::{AppError, AppResult};

/// A parsed SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` sentinel some compatible vendors append
    Done,
}

/// Buffers partial lines across chunk boundaries
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buffer: String,
}

impl SseLineBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every event completed by it
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the byte stream ends
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.buffer);
        parse_line(&remaining).into_iter().collect()
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let trimmed = line.trim();
    let data = trimmed.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(data.to_owned()))
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct SseStreamState<F> {
    bytes: ByteStream,
    parser: SseLineBuffer,
    pending: VecDeque<AppResult<ResponseStreamEvent>>,
    parse_data: F,
    vendor: &'static str,
    finished: bool,
}

impl<F> SseStreamState<F>
where
    F: Fn(&str) -> Option<AppResult<ResponseStreamEvent>>,
{
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Data(json) => {
                    if let Some(item) = (self.parse_data)(&json) {
                        // A decoded error ends the stream after it is delivered
                        if item.is_err() {
                            self.finished = true;
                        }
                        self.pending.push_back(item);
                    }
                }
                SseEvent::Done => self.finished = true,
            }
            if self.finished {
                break;
            }
        }
    }
}

/// Wrap a raw byte stream into a stream of decoded vendor events
///
/// `parse_data` returns `None` for payloads that carry nothing the
/// orchestrator needs (item bookkeeping, annotations, reasoning summaries).
pub fn create_sse_stream<S, F>(byte_stream: S, parse_data: F, vendor: &'static str) -> ResponseStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<AppResult<ResponseStreamEvent>> + Send + 'static,
{
    let state = SseStreamState {
        bytes: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        parse_data,
        vendor,
        finished: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.parser.feed(&chunk);
                    state.enqueue(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let error =
                        AppError::external_service(state.vendor, format!("Stream read error: {e}"));
                    return Some((Err(error), state));
                }
                None => {
                    let events = state.parser.flush();
                    state.enqueue(events);
                    state.finished = true;
                }
            }
        }
    });

    Box::pin(stream)
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Retry policy for the initial vendor request
///
/// Only the request is retried. Once bytes flow to the client a stream is
/// never replayed.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,
    /// Backoff cap (milliseconds)
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// 3 retries, 500ms initial, 5s max
    #[must_use]
    pub const fn default_config() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }

    /// No retries; used by tests against local mock servers
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// `min(initial_ms * 2^attempt, max_ms) + jitter(0..100ms)`
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self
            .initial_delay_ms
            .saturating_mul(1_u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let capped_delay = base_delay.min(self.max_delay_ms);
        let jitter = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::from(d.subsec_millis()))
            % 100;
        Duration::from_millis(capped_delay + jitter)
    }
}

/// 429, 502 and 503 are worth retrying
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 502 | 503)
}

/// Connection and timeout failures are worth retrying
#[must_use]
pub fn is_retryable_request_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[test]
    fn test_partial_line_is_held_until_newline() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.feed(b"event: response.output_text.delta\ndata: {\"del").is_empty());
        let events = buffer.feed(b"ta\":\"Hi\"}\n\n");
        assert_eq!(events, vec![SseEvent::Data("{\"delta\":\"Hi\"}".to_owned())]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut buffer = SseLineBuffer::new();
        let events = buffer.feed(b"data: {\"a\":1}\r\n\r\ndata: {\"b\":2}\n\ndata: [DONE]\n");
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"a\":1}".to_owned()),
                SseEvent::Data("{\"b\":2}".to_owned()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn test_flush_emits_unterminated_line() {
        let mut buffer = SseLineBuffer::new();
        assert!(buffer.feed(b"data: {\"x\":true}").is_empty());
        assert_eq!(buffer.flush(), vec![SseEvent::Data("{\"x\":true}".to_owned())]);
        assert!(buffer.flush().is_empty());
    }

    #[tokio::test]
    async fn test_stream_decodes_across_chunks_and_stops_at_done() {
        let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from_static(b"data: one\n\ndata: tw")),
            Ok(Bytes::from_static(b"o\n\ndata: [DONE]\n\ndata: three\n")),
        ];
        let decoded = create_sse_stream(
            stream::iter(chunks),
            |data| Some(Ok(ResponseStreamEvent::TextDelta(data.to_owned()))),
            "test",
        )
        .collect::<Vec<_>>()
        .await;

        let deltas: Vec<_> = decoded.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            deltas,
            vec![
                ResponseStreamEvent::TextDelta("one".to_owned()),
                ResponseStreamEvent::TextDelta("two".to_owned()),
            ]
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig::default_config();
        assert!(config.delay_for_attempt(10) < Duration::from_millis(5100));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(400));
    }
}
