//! Table-driven decode acceleration.
//!
//! Most Huffman codes that actually save space are short, so resolving every
//! 8-bit lookahead with a single table read removes the per-bit tree walk for
//! the common case:
//!
//! - a code of `len <= 8` bits owns every index whose low `len` bits equal the
//!   code, since the remaining high bits belong to the next symbol;
//! - a longer code owns only the index equal to its first 8 bits, and that
//!   entry points at the internal node reached after those 8 bits so the
//!   decoder can resume walking from there.

use crate::bits::LOOKAHEAD_BITS;
use crate::code::Code;
use crate::tree::{NodeId, ALPHABET_SIZE};

/// Number of table entries (one per possible lookahead byte).
pub const ACCELERATOR_SIZE: usize = 1 << LOOKAHEAD_BITS;

/// A single decode table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeEntry {
    /// Leaf (decoded symbol) or internal node to resume from.
    pub node: NodeId,
    /// Lookahead bits consumed to reach `node`.
    pub bits: u8,
}

impl DecodeEntry {
    /// Entry not covered by any code.
    pub const EMPTY: DecodeEntry = DecodeEntry {
        node: NodeId::MAX,
        bits: 0,
    };

    #[inline]
    pub const fn new(node: NodeId, bits: u8) -> Self {
        Self { node, bits }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl Default for DecodeEntry {
    fn default() -> Self {
        DecodeEntry::EMPTY
    }
}

/// 256-entry lookahead table.
#[derive(Debug, Clone)]
pub struct DecodeAccelerator {
    entries: Box<[DecodeEntry; ACCELERATOR_SIZE]>,
    ready: bool,
}

impl DecodeAccelerator {
    pub fn new() -> Self {
        Self {
            entries: Box::new([DecodeEntry::EMPTY; ACCELERATOR_SIZE]),
            ready: false,
        }
    }

    /// Drop all entries; the table must be refilled before use.
    pub fn clear(&mut self) {
        self.entries.fill(DecodeEntry::EMPTY);
        self.ready = false;
    }

    /// Fill the table from a code set.
    ///
    /// `resume[s]` must hold the depth-8 internal node on the path of every
    /// symbol whose code is longer than 8 bits.
    pub(crate) fn fill(
        &mut self,
        codes: &[Code; ALPHABET_SIZE],
        resume: &[NodeId; ALPHABET_SIZE],
    ) {
        self.entries.fill(DecodeEntry::EMPTY);

        for (symbol, code) in codes.iter().enumerate() {
            let len = code.len();
            if len == 0 || len > LOOKAHEAD_BITS as usize {
                continue;
            }
            let entry = DecodeEntry::new(symbol as NodeId, len as u8);
            let low = code.first_byte() as usize;
            let fill_count = 1usize << (LOOKAHEAD_BITS as usize - len);
            for high in 0..fill_count {
                self.entries[(high << len) | low] = entry;
            }
        }

        for (symbol, code) in codes.iter().enumerate() {
            if code.len() <= LOOKAHEAD_BITS as usize {
                continue;
            }
            let slot = &mut self.entries[code.first_byte() as usize];
            if slot.is_empty() {
                *slot = DecodeEntry::new(resume[symbol], LOOKAHEAD_BITS);
            }
        }

        self.ready = true;
    }

    /// Entry for the next 8 unread bits.
    #[inline]
    pub fn lookup(&self, byte: u8) -> DecodeEntry {
        self.entries[byte as usize]
    }

    /// Whether [`fill`](Self::fill) ran since the last clear.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn entries(&self) -> &[DecodeEntry] {
        &self.entries[..]
    }
}

impl Default for DecodeAccelerator {
    fn default() -> Self {
        Self::new()
    }
}
