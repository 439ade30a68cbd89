//! # Huffling
//!
//! Byte-oriented Huffman coding over a fixed 256-symbol alphabet.
//!
//! The tree lives in a flat 511-slot arena: leaves are the symbols
//! themselves and internal nodes are appended bottom-up, so the root is
//! always the last node created. Codes are packed LSB-first and decoding
//! resolves 8 bits at a time through a 256-entry lookup table.
//!
//! ## Components
//!
//! - [`BitWriter`] / [`BitReader`]: append-only and extract-only bit packing
//! - [`HuffmanTree`]: construction, code derivation, decode tables, validators
//! - [`TreeStructure`]: compact 9-bit-per-child tree blob
//! - [`HuffmanCodec`]: whole-buffer encode and decode with owned buffers
//!
//! ## Example
//!
//! ```
//! use huffling::HuffmanCodec;
//!
//! let mut codec = HuffmanCodec::with_capacity(64);
//! let summary = codec.encode(b"abracadabra").unwrap();
//! let encoded = codec.encoded().to_vec();
//!
//! let decoded = codec.decode(&encoded, summary.bits).unwrap();
//! assert_eq!(decoded, b"abracadabra");
//! ```

pub mod accelerator;
pub mod bits;
pub mod code;
pub mod codec;
pub mod structure;
pub mod tree;

pub use accelerator::{DecodeAccelerator, DecodeEntry, ACCELERATOR_SIZE};
pub use bits::{BitReader, BitWriter, LOOKAHEAD_BITS};
pub use code::{Code, MAX_CODE_BITS};
pub use codec::{EncodeSummary, HuffmanCodec};
pub use structure::{TreeStructure, NODE_INDEX_BITS};
pub use tree::{DecodeStep, HuffmanTree, Node, NodeId, ALPHABET_SIZE, TREE_SIZE};

// Re-export the shared types callers need alongside the codec
pub use huffling_core::{CodecConfig, CompressionStats, Error, Metrics, Result};
