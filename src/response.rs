use std::io::Write;

use tokio_stream::{Stream, StreamExt};

use crate::error::Result;
use crate::openai::StreamEvent;
use crate::transcript::END_RESPONSE;

pub const END_OF_STREAM: &str = "End of stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `[DONE]` arrived; the end sentinel was written.
    Completed,
    /// The body closed early; `End of stream` was written instead.
    EndOfStream,
}

#[derive(Debug)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
}

/// Write deltas to `out` as they arrive and close the assistant turn.
///
/// Malformed frames are logged and skipped. Any other error is returned after
/// whatever text already reached `out`.
pub async fn process_response<S, W>(stream: S, out: &mut W) -> Result<Reply>
where
    S: Stream<Item = Result<StreamEvent>>,
    W: Write,
{
    let mut full_response = String::new();
    let mut frames = 0usize;

    tokio::pin!(stream);

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::Delta(content)) => {
                frames += 1;
                out.write_all(content.as_bytes())?;
                out.flush()?;
                full_response.push_str(&content);
            }
            Ok(StreamEvent::Done) => {
                write!(out, "\n{}\n", END_RESPONSE)?;
                out.flush()?;
                tracing::info!(frames, chars = full_response.len(), "response complete");
                return Ok(Reply {
                    text: full_response,
                    outcome: Outcome::Completed,
                });
            }
            Ok(StreamEvent::EndOfStream) => break,
            Err(err) if err.is_recoverable() => {
                tracing::warn!(error = %err, "skipping frame");
            }
            Err(err) => return Err(err),
        }
    }

    writeln!(out, "{}", END_OF_STREAM)?;
    out.flush()?;
    tracing::warn!(frames, "stream closed before [DONE]");
    Ok(Reply {
        text: full_response,
        outcome: Outcome::EndOfStream,
    })
}
