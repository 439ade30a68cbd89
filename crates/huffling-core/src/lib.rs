//! # Huffling Core
//!
//! Shared error, configuration and statistics types for the huffling
//! Huffman codec.
//!
//! ## Contents
//!
//! - [`Error`] / [`Result`] - every failure the codec can report
//! - [`CodecConfig`] - buffer capacity and validation switches, loadable from JSON
//! - [`CompressionStats`] / [`Metrics`] - per-call and running statistics

pub mod config;
pub mod error;
pub mod stats;

pub use config::CodecConfig;
pub use error::{Error, Result};
pub use stats::{CompressionRatio, CompressionStats, Direction, Metrics};
