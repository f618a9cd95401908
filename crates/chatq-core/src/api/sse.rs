use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use tokio_util::bytes::Bytes;
use tracing::debug;

use crate::api::error::ApiError;

const FRAME_DELIMITER: &str = "\n\n";
const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// One delimited unit of the event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event_type: String,
    pub data: String,
}

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, ApiError>> + Send>>;

/// Incremental decoder from raw byte chunks to frames.
///
/// Frames are separated by a blank line. Within a frame, `event:` sets the
/// (trimmed) event type and `data:` contributes the untrimmed payload;
/// several `data:` lines are joined with `\n`. A frame is produced only when
/// it carries both a non-empty event type and at least one `data:` line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    text: Utf8Decoder,
    buffer: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every frame it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.text.decode(chunk, &mut self.buffer);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].find(FRAME_DELIMITER) {
            let frame_text = &self.buffer[consumed..consumed + pos];
            if let Some(frame) = parse_frame(frame_text) {
                frames.push(frame);
            }
            consumed += pos + FRAME_DELIMITER.len();
        }
        self.buffer.drain(..consumed);

        frames
    }

    /// Number of buffered bytes that do not yet form a complete frame.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.text.pending.len()
    }

    /// End of input. A partially received frame is never a frame, so any
    /// residue is dropped; the dropped byte count is returned.
    pub fn finish(&mut self) -> usize {
        let dropped = self.pending_len();
        self.buffer.clear();
        self.text.pending.clear();
        dropped
    }
}

fn parse_frame(text: &str) -> Option<Frame> {
    let mut event_type: Option<&str> = None;
    let mut data: Option<String> = None;

    for line in text.split('\n') {
        if let Some(rest) = line.strip_prefix(EVENT_PREFIX) {
            event_type = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
            match data.as_mut() {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(rest);
                }
                None => data = Some(rest.to_string()),
            }
        }
    }

    let event_type = event_type.filter(|t| !t.is_empty())?;
    Some(Frame {
        event_type: event_type.to_string(),
        data: data?,
    })
}

/// UTF-8 decoding that tolerates chunk boundaries inside a character.
/// Invalid sequences decode to U+FFFD; an incomplete trailing sequence waits
/// for the next chunk.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);
        let complete = complete_prefix_len(&self.pending);
        out.push_str(&String::from_utf8_lossy(&self.pending[..complete]));
        self.pending.drain(..complete);
    }
}

/// Length of the longest prefix that does not end in an incomplete sequence.
fn complete_prefix_len(bytes: &[u8]) -> usize {
    let mut offset = 0;
    loop {
        match std::str::from_utf8(&bytes[offset..]) {
            Ok(_) => return bytes.len(),
            Err(err) => match err.error_len() {
                Some(invalid) => offset += err.valid_up_to() + invalid,
                None => return offset + err.valid_up_to(),
            },
        }
    }
}

/// Turn a byte stream into a frame stream. Each chunk is fully decoded, and
/// its frames yielded, before the next chunk is polled. A transport error is
/// yielded once and ends the stream.
pub fn decode_frame_stream<S, E>(byte_stream: S) -> FrameStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + 'static,
{
    let frames = async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        tokio::pin!(byte_stream);

        while let Some(chunk) = byte_stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for frame in decoder.push(&bytes) {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(ApiError::Stream {
                        details: e.to_string(),
                    });
                    break;
                }
            }
        }

        let dropped = decoder.finish();
        if dropped > 0 {
            debug!(target: "sse", dropped, "Discarding incomplete trailing frame");
        }
    };

    Box::pin(frames)
}
