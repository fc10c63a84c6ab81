//! Terminal coding agent: a REPL that lets a model read, list, edit and diff
//! files and run shell commands in the current directory.

pub mod agent;
pub mod config;
pub mod diff;
pub mod error;
pub mod llm;
pub mod tools;
