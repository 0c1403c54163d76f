//! Core execution and digest primitives for chunked byte streams.
//!
//! Two independent pieces: pluggable [`strategy::Strategy`] values that decide
//! how a deferred unit of work runs (inline, fixed pool, growable pool, or an
//! external executor), and [`digest::digest_stream`], which reduces a stream
//! of byte chunks to a single chunk holding its cryptographic digest without
//! buffering the input.

pub mod config;
pub mod digest;
pub mod logging;
pub mod strategy;
