//! Newline-delimited JSON framing.
//!
//! Every message is one JSON object followed by `\n`. The decoder keeps
//! partial reads buffered and yields each complete line separately, so a frame
//! split across reads or several frames coalesced into one read are handled
//! the same way.

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Largest accepted frame, excluding the terminating newline.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

const DELIMITER: u8 = b'\n';
const READ_CHUNK: usize = 4096;

/// Serialises `message` into a single newline-terminated frame.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = serde_json::to_vec(message)?;
    if frame.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge {
            len: frame.len(),
            limit: MAX_FRAME_LEN,
        });
    }
    frame.push(DELIMITER);
    Ok(frame)
}

/// Writes `message` as one frame and flushes the writer.
pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
) -> Result<(), ProtocolError> {
    let frame = encode(message)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Incremental frame splitter fed with raw bytes.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes received from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet returned as a frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Removes and returns the next complete frame, skipping blank lines.
    ///
    /// Returns `Ok(None)` while the buffered bytes do not yet contain a full
    /// frame. An unterminated frame growing past [`MAX_FRAME_LEN`] is an error.
    pub fn next_frame(&mut self) -> Result<Option<String>, ProtocolError> {
        loop {
            let Some(end) = self.buffer.iter().position(|&byte| byte == DELIMITER) else {
                if self.buffer.len() > MAX_FRAME_LEN {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Err(ProtocolError::FrameTooLarge {
                        len,
                        limit: MAX_FRAME_LEN,
                    });
                }
                return Ok(None);
            };

            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            let _ = line.pop();
            if line.last() == Some(&b'\r') {
                let _ = line.pop();
            }
            if line.len() > MAX_FRAME_LEN {
                return Err(ProtocolError::FrameTooLarge {
                    len: line.len(),
                    limit: MAX_FRAME_LEN,
                });
            }
            let line = String::from_utf8(line)?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
    }
}

/// Reads whole frames from a byte stream.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    decoder: FrameDecoder,
}

impl<R: Read> FrameReader<R> {
    /// Wraps a byte stream.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
        }
    }

    /// Blocks until the next frame arrives and decodes it.
    ///
    /// Returns `Ok(None)` once the stream is closed. Bytes left over from an
    /// unterminated final frame are discarded.
    pub fn read_message<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(Some(serde_json::from_str(&frame)?));
            }
            let read = self.inner.read(&mut chunk)?;
            if read == 0 {
                return Ok(None);
            }
            self.decoder.push(&chunk[..read]);
        }
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_frame_is_reassembled() {
        let mut decoder = FrameDecoder::new();
        decoder.push(br#"{"skip":"#);
        assert_eq!(decoder.next_frame().expect("no error"), None);
        decoder.push(b"true}\n");
        assert_eq!(
            decoder.next_frame().expect("no error").as_deref(),
            Some(r#"{"skip":true}"#)
        );
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn coalesced_frames_are_split() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"{\"a\":1}\r\n\n{\"b\":2}\n{\"c\"");
        assert_eq!(
            decoder.next_frame().expect("no error").as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert_eq!(
            decoder.next_frame().expect("no error").as_deref(),
            Some(r#"{"b":2}"#)
        );
        assert_eq!(decoder.next_frame().expect("no error"), None);
        assert_eq!(decoder.pending(), 4);
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&vec![b'x'; MAX_FRAME_LEN + 1]);
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::FrameTooLarge { .. })
        ));
        assert_eq!(decoder.pending(), 0, "the oversized bytes are dropped");
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0xff, 0xfe, b'\n']);
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::InvalidUtf8(_))
        ));
    }
}
