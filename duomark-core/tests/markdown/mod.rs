//! Markdown format tests
//!
//! Parsing per construct, serializer fidelity and the round-trip properties.

mod export;
mod import;
mod inline;
mod properties;
