//! Shared types for the Lookout annotation client.
//!
//! Media payloads, annotation results, cache-busted output references,
//! `data:` URL helpers and the display sink abstraction used by the
//! submission and capture crates.

pub mod data_url;
pub mod display;
pub mod error;
pub mod media;
pub mod reference;
pub mod result;
