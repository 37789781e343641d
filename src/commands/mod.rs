//! Command parsing and dispatch for txt2sql.
//!
//! Parsing is separate from execution so the router can be tested without a
//! database; handlers produce transport-agnostic output that the REPL renders.

pub mod handlers;
pub mod help;
pub mod output;
pub mod repl;
pub mod router;

pub use handlers::{dispatch, CommandContext};
pub use output::{CommandOutput, ControlAction};
pub use repl::Repl;
pub use router::{Command, CommandRouter};
