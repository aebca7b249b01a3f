#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wire protocol spoken between the match server and its clients.

pub mod framing;
pub mod message;

use std::{io, string::FromUtf8Error};

use thiserror::Error;

pub use framing::{encode, write_message, FrameDecoder, FrameReader, MAX_FRAME_LEN};
pub use message::{
    ElementEntry, IntentMessage, LobbyMessage, MatchOverMessage, RejectedMessage, ServerMessage,
    SpawnEntry, StateMessage, WireCell,
};

/// Failure while encoding, decoding or transporting a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The underlying stream failed.
    #[error("transport failure: {0}")]
    Io(#[from] io::Error),
    /// A frame was not valid JSON for the expected message.
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    /// A frame exceeded the size limit.
    #[error("frame of {len} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Size of the offending frame.
        len: usize,
        /// Maximum accepted size.
        limit: usize,
    },
    /// A frame was not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),
}

impl ProtocolError {
    /// Reports whether the connection can no longer be used.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::FrameTooLarge { .. })
    }
}
