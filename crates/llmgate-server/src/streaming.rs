//! Wire adapters for generation output.
//!
//! Two streaming protocols are supported:
//! - chunked text: each frame as `data: {json}\n\n`, finished by
//!   `event: done\ndata: {}\n\n`
//! - server-sent events: each frame (or, in the legacy shape, its JSON-encoded
//!   text) as an SSE `data` record, finished by `data: [DONE]`
//!
//! Every stream ends with exactly one terminal record. A failure after the
//! first byte cannot change the status code, so it is written in-band as an
//! `event: error` record and the sentinel is withheld: a missing sentinel
//! always means the output was truncated.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};

use crate::models::ResponseFrame;
use crate::offload::ItemResult;
use crate::pipeline::StreamItem;

/// Terminal record of the chunked-text protocol.
pub const CHUNKED_DONE: &str = "event: done\ndata: {}\n\n";

/// Terminal record payload of the SSE protocol.
pub const SSE_DONE: &str = "[DONE]";

/// Payload of the in-band error record. Deliberately generic.
pub const ERROR_DATA: &str = r#"{"error":{"message":"generation failed","type":"server_error"}}"#;

/// Which payload an SSE record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseShape {
    /// The full response frame as JSON.
    Frame,
    /// Only the frame's text, JSON-encoded as a string (`/v0`).
    Text,
}

/// Transport-independent view of what goes on the wire next.
#[derive(Debug, Clone, PartialEq)]
pub enum WireEvent {
    Frame(ResponseFrame),
    Done,
    Error,
}

/// Forward frames until the sentinel, turning failures (and a source that
/// ends without a sentinel) into a single terminal [`WireEvent::Error`].
/// Nothing is pulled from `items` after the terminal event.
pub fn terminated<S>(items: S) -> impl Stream<Item = WireEvent> + Send + 'static
where
    S: Stream<Item = ItemResult> + Send + 'static,
{
    async_stream::stream! {
        futures::pin_mut!(items);
        loop {
            match items.next().await {
                Some(Ok(StreamItem::Frame(frame))) => yield WireEvent::Frame(frame),
                Some(Ok(StreamItem::Done)) => {
                    yield WireEvent::Done;
                    break;
                }
                Some(Err(err)) => {
                    tracing::error!(error = %err, "generation failed mid-stream");
                    yield WireEvent::Error;
                    break;
                }
                None => {
                    tracing::warn!("generation ended without a sentinel");
                    yield WireEvent::Error;
                    break;
                }
            }
        }
    }
}

fn frame_json(frame: &ResponseFrame) -> String {
    serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_owned())
}

/// Encode one event in the chunked-text protocol.
pub fn encode_chunked(event: &WireEvent) -> String {
    match event {
        WireEvent::Frame(frame) => format!("data: {}\n\n", frame_json(frame)),
        WireEvent::Done => CHUNKED_DONE.to_string(),
        WireEvent::Error => format!("event: error\ndata: {}\n\n", ERROR_DATA),
    }
}

/// Build one SSE record.
pub fn sse_event(event: &WireEvent, shape: SseShape) -> Event {
    match event {
        WireEvent::Frame(frame) => {
            let data = match shape {
                SseShape::Frame => frame_json(frame),
                SseShape::Text => {
                    serde_json::to_string(frame.content()).unwrap_or_else(|_| "\"\"".to_owned())
                }
            };
            Event::default().data(data)
        }
        WireEvent::Done => Event::default().data(SSE_DONE),
        WireEvent::Error => Event::default().event("error").data(ERROR_DATA),
    }
}

/// Chunked-text response (`/v1/chat/completions`).
pub fn chunked_response<S>(items: S) -> Response
where
    S: Stream<Item = ItemResult> + Send + 'static,
{
    let body = terminated(items)
        .map(|event| Ok::<_, Infallible>(Bytes::from(encode_chunked(&event))));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

/// Server-sent-event response (`/v2` and `/v0` chat routes).
pub fn event_stream<S>(
    items: S,
    shape: SseShape,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static>
where
    S: Stream<Item = ItemResult> + Send + 'static,
{
    let events = terminated(items).map(move |event| Ok(sse_event(&event, shape)));
    Sse::new(events).keep_alive(KeepAlive::default())
}
