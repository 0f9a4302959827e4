//! Line-oriented command protocol
//!
//! Inbound lines are `|`-separated and newline-delimited. A line is only
//! parsed once its `\n` has arrived:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `MOVE\|<limb>\|(<x>,<y>,<z>)` | Move `LArm`/`RArm` toward the tracked position |
//! | `SAY\|<text>` | Speak `text` |
//! | `DISCONNECT` | Close the connection |

pub mod command;
pub mod dispatcher;
pub mod lines;

pub use command::Command;
pub use dispatcher::{DispatchResult, Dispatcher};
pub use lines::LineAssembler;
