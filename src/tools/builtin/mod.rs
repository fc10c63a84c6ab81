//! Built-in tools for file operations, shell execution and diffing.

pub mod diff;
pub mod file;
pub mod shell;
