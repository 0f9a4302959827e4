//! Outbound message encoding
//!
//! # Wire Format
//!
//! Two framings are supported, selected by `bridge.framing`:
//!
//! ```text
//! raw:              IMG|<raw pixel bytes>
//!                   LARM|x,y,z,wx,wy,wz\n
//!
//! length_prefixed:  ┌──────────────────┬──────────────────────────┐
//!                   │ Length (4 bytes) │ Tag + payload            │
//!                   │ Big-endian u32   │ (as in raw framing)      │
//!                   └──────────────────┴──────────────────────────┘
//! ```
//!
//! Raw framing is what existing clients expect. Pixel data is not escaped,
//! so it may contain `|` or `\n` bytes; a client that shares one stream for
//! text and images should use length-prefixed framing instead.

use crate::core::types::{ImageFrame, Pose6};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Tag prepended to every image message
pub const IMAGE_TAG: &str = "IMG|";

/// Largest message accepted by length-prefixed framing (16 MiB)
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Message framing on the outbound stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Tag and payload only
    #[default]
    Raw,
    /// 4-byte big-endian length before tag and payload
    LengthPrefixed,
}

/// Concatenate `tag` and the frame's raw bytes
pub fn encode_image(tag: &str, frame: &ImageFrame) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.len() + frame.len());
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(&frame.data);
    out
}

/// `<tag>|x,y,z,wx,wy,wz\n`
pub fn encode_pose(tag: &str, pose: &Pose6) -> Vec<u8> {
    let mut line = String::with_capacity(tag.len() + 64);
    line.push_str(tag);
    line.push('|');
    for (i, value) in pose.to_array().iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        let _ = write!(line, "{}", value);
    }
    line.push('\n');
    line.into_bytes()
}

/// Encoder applying the configured framing, reusing one buffer
pub struct FrameEncoder {
    framing: Framing,
    buffer: Vec<u8>,
}

impl FrameEncoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            // QVGA RGB frame plus tag and prefix
            buffer: Vec::with_capacity(320 * 240 * 3 + 16),
        }
    }

    /// Encode an image message
    pub fn image(&mut self, frame: &ImageFrame) -> Result<&[u8]> {
        self.frame_parts(IMAGE_TAG.as_bytes(), &frame.data)
    }

    /// Encode a pose telemetry line
    pub fn pose(&mut self, tag: &str, pose: &Pose6) -> Result<&[u8]> {
        let line = encode_pose(tag, pose);
        self.frame_parts(&[], &line)
    }

    fn frame_parts(&mut self, head: &[u8], body: &[u8]) -> Result<&[u8]> {
        let message_len = head.len() + body.len();
        self.buffer.clear();

        if self.framing == Framing::LengthPrefixed {
            if message_len > MAX_MESSAGE_SIZE {
                return Err(Error::MessageTooLarge(message_len));
            }
            self.buffer.reserve(4 + message_len);
            self.buffer
                .extend_from_slice(&(message_len as u32).to_be_bytes());
        } else {
            self.buffer.reserve(message_len);
        }

        self.buffer.extend_from_slice(head);
        self.buffer.extend_from_slice(body);
        Ok(&self.buffer)
    }
}
