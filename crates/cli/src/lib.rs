//! Command-line front end for the Lookout annotation client.
//!
//! Parses flags and environment into the library config structs, reads
//! media from disk and renders results on a [`ConsoleDisplay`](sink::ConsoleDisplay).

pub mod commands;
pub mod config;
pub mod files;
pub mod sink;
