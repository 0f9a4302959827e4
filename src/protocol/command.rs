//! Command line parsing
//!
//! # Grammar
//!
//! ```text
//! line       = move | say | "DISCONNECT"
//! move       = "MOVE" "|" limb "|" vector
//! say        = "SAY" "|" text
//! vector     = "(" triple ")" | "[" triple "]"
//! triple     = float "," float "," float
//! ```
//!
//! Fields are separated by `|` with no escaping, so SAY text containing `|`
//! fails the field-count check and is dropped.

use crate::core::types::Vec3;
use crate::error::{Error, Result};

/// Field separator
pub const SEPARATOR: char = '|';

pub const TAG_MOVE: &str = "MOVE";
pub const TAG_SAY: &str = "SAY";
pub const TAG_DISCONNECT: &str = "DISCONNECT";

/// One decoded protocol line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move a limb toward a tracked hand position
    Move {
        /// Limb name as received (membership is checked at dispatch)
        limb: String,
        /// Tracked position in tracker units
        position: Vec3,
        /// Requested rotation, not carried by the wire format yet
        rotation: Vec3,
    },
    /// Speak text
    Say { text: String },
    /// Close the connection
    Disconnect,
    /// Unrecognised tag
    Unknown { tag: String },
}

impl Command {
    /// Parse a single line (without its newline)
    ///
    /// Returns `Error::Syntax` for a known tag with the wrong field count or
    /// a malformed vector.
    pub fn parse(line: &str) -> Result<Command> {
        if line == TAG_DISCONNECT {
            return Ok(Command::Disconnect);
        }

        let fields: Vec<&str> = line.split(SEPARATOR).collect();
        match fields[0] {
            TAG_MOVE => {
                expect_fields(TAG_MOVE, &fields, 3)?;
                Ok(Command::Move {
                    limb: fields[1].to_string(),
                    position: parse_vector(fields[2])?,
                    rotation: Vec3::zero(),
                })
            }
            TAG_SAY => {
                expect_fields(TAG_SAY, &fields, 2)?;
                Ok(Command::Say {
                    text: fields[1].to_string(),
                })
            }
            TAG_DISCONNECT => Err(Error::Syntax(format!(
                "DISCONNECT takes no fields, got {}",
                fields.len() - 1
            ))),
            tag => Ok(Command::Unknown {
                tag: tag.to_string(),
            }),
        }
    }
}

fn expect_fields(tag: &str, fields: &[&str], expected: usize) -> Result<()> {
    if fields.len() != expected {
        return Err(Error::Syntax(format!(
            "{} expects {} fields, got {}",
            tag,
            expected,
            fields.len()
        )));
    }
    Ok(())
}

/// Parse a bracketed `(x,y,z)` triple
pub fn parse_vector(field: &str) -> Result<Vec3> {
    let trimmed = field.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .or_else(|| {
            trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
        })
        .ok_or_else(|| Error::Syntax(format!("vector must be bracketed, got {:?}", field)))?;
    let compact: String = inner.chars().filter(|c| !c.is_whitespace()).collect();

    let parts: Vec<&str> = compact.split(',').collect();
    if parts.len() != 3 {
        return Err(Error::Syntax(format!(
            "vector needs 3 components, got {} in {:?}",
            parts.len(),
            field
        )));
    }

    let mut values = [0.0f32; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        let parsed: f32 = part
            .parse()
            .map_err(|_| Error::Syntax(format!("non-numeric component {:?} in {:?}", part, field)))?;
        if !parsed.is_finite() {
            return Err(Error::Syntax(format!(
                "non-finite component {:?} in {:?}",
                part, field
            )));
        }
        *value = parsed;
    }

    Ok(Vec3::from(values))
}
