//! notemacro — named macros for a notes workspace.
//!
//! A macro is an ordered list of actions read from `notemacros.yaml`:
//! host commands, small scripts, hidden shell steps, and dated notes.

pub mod cli;
pub mod core;
pub mod host;
pub mod notes;
pub mod script;
