use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
};
use reqwest::{Client, Response};

use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::models::{Chunk, CompletionRequest, Message};

const DATA_PREFIX: &[u8] = b"data: ";
const DONE: &[u8] = b"[DONE]";

/// What a single `data:` line of the stream decodes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    Delta(String),
    /// `finish_reason == "stop"`, carries no text.
    Stop,
    Done,
}

/// Items produced by [`decode_stream`], in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    /// The server sent `[DONE]`.
    Done,
    /// The body ended without `[DONE]`.
    EndOfStream,
}

/// POST the conversation with streaming enabled and hand back the open response.
pub async fn send_request(
    client: &Client,
    config: &Config,
    messages: Vec<Message>,
) -> Result<Response> {
    let url = config.chat_url();
    let request = CompletionRequest::new(config.model.clone(), messages);
    let body = serde_json::to_vec(&request)?;

    tracing::debug!(
        url = %url,
        model = %request.model,
        messages = request.messages.len(),
        "sending streaming completion request"
    );

    let response = client
        .post(&url)
        .headers(headers(&config.api_key)?)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ChatError::Api { status, body });
    }

    Ok(response)
}

fn headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key))?,
    );
    Ok(headers)
}

/// Turn a response body into text deltas.
///
/// The body is read one `\n`-terminated line at a time. Malformed frames come
/// out as [`ChatError::FrameDecode`] items and the stream keeps going; a read
/// failure comes out as [`ChatError::Transport`] and ends it. A clean finish is
/// always signalled by a final [`StreamEvent::Done`] or
/// [`StreamEvent::EndOfStream`]. A partial line left at end of body is dropped.
pub fn decode_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut byte_stream = std::pin::pin!(byte_stream);
        let mut buf: Vec<u8> = Vec::new();

        loop {
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                match decode_line(&line) {
                    None | Some(Ok(StreamFrame::Stop)) => {}
                    Some(Ok(StreamFrame::Delta(text))) => {
                        yield Ok(StreamEvent::Delta(text));
                    }
                    Some(Ok(StreamFrame::Done)) => {
                        yield Ok(StreamEvent::Done);
                        return;
                    }
                    Some(Err(e)) => {
                        yield Err(e);
                    }
                }
            }

            match byte_stream.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    yield Err(ChatError::Transport(e.to_string()));
                    return;
                }
                None => {
                    if !buf.is_empty() {
                        tracing::debug!(bytes = buf.len(), "discarding unterminated final line");
                    }
                    yield Ok(StreamEvent::EndOfStream);
                    return;
                }
            }
        }
    }
}

/// Decode one raw line. `None` means the line carries no data frame.
pub fn decode_line(line: &[u8]) -> Option<Result<StreamFrame>> {
    let payload = line.trim_ascii().strip_prefix(DATA_PREFIX)?;
    if payload == DONE {
        return Some(Ok(StreamFrame::Done));
    }
    Some(decode_chunk(payload))
}

fn decode_chunk(payload: &[u8]) -> Result<StreamFrame> {
    let chunk: Chunk = serde_json::from_slice(payload).map_err(|e| {
        ChatError::FrameDecode(format!("{}: {}", e, String::from_utf8_lossy(payload)))
    })?;

    tracing::trace!(id = ?chunk.id, model = ?chunk.model, "frame");

    let choice = chunk
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::FrameDecode("frame has no choices".to_string()))?;

    if choice.finish_reason.as_deref() == Some("stop") {
        return Ok(StreamFrame::Stop);
    }
    Ok(StreamFrame::Delta(choice.delta.content.unwrap_or_default()))
}
