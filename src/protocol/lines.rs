//! Reassembly of newline-delimited lines from socket reads
//!
//! A read may end anywhere: mid-number, mid-tag or inside a multibyte
//! character. Bytes are held until their terminating `\n` arrives, so only
//! complete lines ever reach the parser.

use crate::error::{Error, Result};

/// Longest unterminated line kept across reads
pub const MAX_LINE_LEN: usize = 4096;

/// Carry-over buffer for partial lines
pub struct LineAssembler {
    buffer: Vec<u8>,
    max_len: usize,
    // Inside an oversized line; skip up to its newline
    discarding: bool,
}

impl LineAssembler {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
            discarding: false,
        }
    }

    /// Append received bytes
    ///
    /// Fails when the unterminated tail grows past `max_len`; the tail is
    /// dropped and the rest of that line is skipped when it arrives.
    pub fn push(&mut self, mut data: &[u8]) -> Result<()> {
        if self.discarding {
            match data.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.discarding = false;
                    data = &data[end + 1..];
                }
                None => return Ok(()),
            }
        }

        self.buffer.extend_from_slice(data);

        let tail_start = self
            .buffer
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let tail_len = self.buffer.len() - tail_start;
        if tail_len > self.max_len {
            self.buffer.truncate(tail_start);
            self.discarding = true;
            return Err(Error::Syntax(format!(
                "line longer than {} bytes dropped",
                self.max_len
            )));
        }
        Ok(())
    }

    /// Next complete line, without its `\n`
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        Some(line)
    }

    /// Unterminated remainder, emptying the buffer
    pub fn take_partial(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() || self.discarding {
            self.buffer.clear();
            self.discarding = false;
            return None;
        }
        Some(std::mem::take(&mut self.buffer))
    }

    /// Bytes held back waiting for a newline
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(MAX_LINE_LEN)
    }
}
