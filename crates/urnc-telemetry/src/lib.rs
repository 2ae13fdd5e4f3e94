//! Logging setup shared by the urnc binaries.
//!
//! The sync engine itself only emits `tracing` events; this crate decides
//! where they go: human-readable or JSON on stdout, optionally teed into a
//! log file.

pub mod logging;
