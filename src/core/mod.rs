//! Core macro logic — types, parsing, registry, interpretation, injections.

pub mod dateformat;
pub mod error;
pub mod injection;
pub mod interpreter;
pub mod parser;
pub mod registry;
pub mod types;
