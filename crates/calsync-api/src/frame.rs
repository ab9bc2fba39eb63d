//! Incremental frame parser for the live event stream.
//!
//! The server writes one frame per message: a few `field: value` lines
//! followed by a blank line. The transport delivers the response body in
//! arbitrary chunks, so a frame (or a UTF-8 sequence, or the terminator
//! itself) may be split across any number of them.
//!
//! [`FrameParser`] keeps the bytes received so far plus a scan cursor.
//! Each call to [`next_frame`](FrameParser::next_frame) resumes scanning
//! where the previous call stopped, and complete frames are split off the
//! front of the buffer as they are surfaced. Total work over a connection
//! is linear in the bytes received.

use bytes::BytesMut;

use crate::error::Error;
use crate::message::StreamMessage;

/// One complete frame. Only `data` carries application meaning; `event`
/// and `id` are kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Value of the first `data:` line, trimmed.
    pub data: Option<String>,
    pub event: Option<String>,
    pub id: Option<String>,
}

impl Frame {
    /// The raw payload, if the frame carries a non-empty `data:` line.
    pub fn payload(&self) -> Option<&str> {
        self.data.as_deref().filter(|d| !d.is_empty())
    }

    fn parse(body: &str) -> Self {
        let mut frame = Self::default();

        for line in body.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            let value = value.trim();
            let slot = match field {
                "data" => &mut frame.data,
                "event" => &mut frame.event,
                "id" => &mut frame.id,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_owned());
            }
        }

        frame
    }
}

/// Accumulates transport chunks and yields complete frames in arrival order.
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: BytesMut,
    /// Offset into `buf` below which no frame boundary can start.
    scanned: usize,
}

enum Scan {
    /// Frame body ends at `body_end`; `consumed` bytes include the terminator.
    Boundary { body_end: usize, consumed: usize },
    /// No complete frame yet; resume scanning at this offset.
    Incomplete(usize),
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk received from the transport.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes held that do not yet form a complete frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Return the oldest complete frame not yet surfaced.
    ///
    /// `None` means no complete frame is buffered. A frame whose bytes are
    /// not valid UTF-8 is returned as [`Error::Decode`]; the parser moves
    /// past it and keeps going.
    pub fn next_frame(&mut self) -> Option<Result<Frame, Error>> {
        let (body_end, consumed) = match self.scan() {
            Scan::Boundary { body_end, consumed } => (body_end, consumed),
            Scan::Incomplete(resume_at) => {
                self.scanned = resume_at;
                return None;
            }
        };

        let raw = self.buf.split_to(consumed);
        self.scanned = 0;

        let body = raw.get(..body_end).unwrap_or_default();
        Some(match std::str::from_utf8(body) {
            Ok(text) => Ok(Frame::parse(text)),
            Err(e) => Err(Error::Decode {
                message: format!("frame is not valid UTF-8: {e}"),
                payload: String::from_utf8_lossy(body).into_owned(),
            }),
        })
    }

    /// Drain every complete frame currently buffered.
    pub fn frames(&mut self) -> impl Iterator<Item = Result<Frame, Error>> + '_ {
        std::iter::from_fn(move || self.next_frame())
    }

    /// Find the first blank line at or after the cursor.
    ///
    /// A boundary is a `\n` followed by either `\n` or `\r\n`, which covers
    /// both LF and CRLF streams.
    fn scan(&self) -> Scan {
        let buf = &self.buf[..];
        let mut from = self.scanned;

        while let Some(offset) = buf
            .get(from..)
            .and_then(|rest| rest.iter().position(|&b| b == b'\n'))
        {
            let nl = from + offset;
            match (buf.get(nl + 1), buf.get(nl + 2)) {
                (Some(b'\n'), _) => {
                    return Scan::Boundary {
                        body_end: nl,
                        consumed: nl + 2,
                    };
                }
                (Some(b'\r'), Some(b'\n')) => {
                    return Scan::Boundary {
                        body_end: nl,
                        consumed: nl + 3,
                    };
                }
                // Not enough lookahead to decide yet.
                (None, _) | (Some(b'\r'), None) => return Scan::Incomplete(nl),
                _ => from = nl + 1,
            }
        }

        Scan::Incomplete(buf.len())
    }
}

/// Decode a frame's payload into a message.
///
/// Frames without a payload (keep-alives, empty `data:` lines) yield
/// `Ok(None)`. Malformed JSON yields [`Error::Decode`].
pub fn decode_frame(frame: &Frame) -> Result<Option<StreamMessage>, Error> {
    frame.payload().map(StreamMessage::from_json).transpose()
}
