//! Huffman tree over a fixed node arena.
//!
//! ## Arena Layout
//!
//! ```text
//! 0 ..= 255    leaves, index == symbol, no stored data
//! 256 ..= 510  internal nodes, both children at lower indices
//! ```
//!
//! Internal nodes are created strictly bottom-up, so the last one created is
//! the root and the arena can never contain a cycle. Every array is allocated
//! once in [`HuffmanTree::new`] and reused by each [`HuffmanTree::rebuild`].
//!
//! ## Construction
//!
//! Leaves are sorted by (frequency, symbol). Newly merged nodes come out in
//! non-decreasing weight order, so they form a second sorted queue and each
//! merge just compares the heads of the two queues. With a fixed 256-symbol
//! alphabet this beats a general priority queue.

use huffling_core::{Error, Result};
use tracing::{debug, trace};

use crate::accelerator::{DecodeAccelerator, DecodeEntry};
use crate::bits::LOOKAHEAD_BITS;
use crate::code::Code;

/// Arena index.
pub type NodeId = u16;

/// Number of symbols (every byte value).
pub const ALPHABET_SIZE: usize = 256;

/// Arena slots: 256 leaves plus at most 255 internal nodes.
pub const TREE_SIZE: usize = 2 * ALPHABET_SIZE - 1;

/// Maximum internal nodes.
pub const MAX_INTERNAL_NODES: usize = ALPHABET_SIZE - 1;

/// Index of the first internal node.
pub const FIRST_INTERNAL: NodeId = ALPHABET_SIZE as NodeId;

const NO_NODE: NodeId = NodeId::MAX;

/// Check if an arena index is a leaf.
#[inline]
pub fn is_leaf(node: NodeId) -> bool {
    (node as usize) < ALPHABET_SIZE
}

/// Children of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Child along a 0 edge.
    pub left: NodeId,
    /// Child along a 1 edge.
    pub right: NodeId,
}

impl Node {
    const UNSET: Node = Node {
        left: NO_NODE,
        right: NO_NODE,
    };

    #[inline]
    pub const fn new(left: NodeId, right: NodeId) -> Self {
        Self { left, right }
    }

    /// Follow one edge.
    #[inline]
    pub fn child(&self, bit: bool) -> NodeId {
        if bit {
            self.right
        } else {
            self.left
        }
    }
}

/// Result of feeding one lookahead byte to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStep {
    /// Leaf reached, or internal node to continue from with the next byte.
    pub node: NodeId,
    /// Bits of the lookahead actually used.
    pub bits: u8,
}

impl DecodeStep {
    /// The decoded symbol, if a leaf was reached.
    #[inline]
    pub fn symbol(&self) -> Option<u8> {
        if is_leaf(self.node) {
            Some(self.node as u8)
        } else {
            None
        }
    }
}

impl From<DecodeEntry> for DecodeStep {
    fn from(entry: DecodeEntry) -> Self {
        Self {
            node: entry.node,
            bits: entry.bits,
        }
    }
}

/// Huffman tree, code table and decode table for the byte alphabet.
#[derive(Clone)]
pub struct HuffmanTree {
    /// Internal nodes, slot `i` holds arena index `256 + i`.
    nodes: Box<[Node; MAX_INTERNAL_NODES]>,
    /// Frequencies for leaves, subtree weights for internal nodes.
    weights: Box<[u64; TREE_SIZE]>,
    /// Sort scratch: (frequency, symbol).
    order: Box<[(u64, NodeId); ALPHABET_SIZE]>,
    root: NodeId,
    codes: Box<[Code; ALPHABET_SIZE]>,
    /// Internal node at depth 8 on each long code's path.
    resume: Box<[NodeId; ALPHABET_SIZE]>,
    accelerator: DecodeAccelerator,
    has_codes: bool,
}

impl HuffmanTree {
    /// Allocate a tree. It starts out built from an all-zero frequency table.
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Box::new([Node::UNSET; MAX_INTERNAL_NODES]),
            weights: Box::new([0; TREE_SIZE]),
            order: Box::new([(0, 0); ALPHABET_SIZE]),
            root: FIRST_INTERNAL,
            codes: Box::new([Code::EMPTY; ALPHABET_SIZE]),
            resume: Box::new([NO_NODE; ALPHABET_SIZE]),
            accelerator: DecodeAccelerator::new(),
            has_codes: false,
        };
        tree.build(&[0; ALPHABET_SIZE]);
        tree
    }

    /// Rebuild the tree from a 256-entry frequency table.
    ///
    /// Codes and decode tables from a previous build are discarded.
    pub fn rebuild(&mut self, frequencies: &[u64]) -> Result<()> {
        let frequencies: &[u64; ALPHABET_SIZE] = frequencies
            .try_into()
            .map_err(|_| Error::InvalidFrequencyTable {
                len: frequencies.len(),
            })?;
        self.build(frequencies);
        Ok(())
    }

    fn build(&mut self, frequencies: &[u64; ALPHABET_SIZE]) {
        for (symbol, &freq) in frequencies.iter().enumerate() {
            self.weights[symbol] = freq;
            self.order[symbol] = (freq, symbol as NodeId);
        }
        self.weights[ALPHABET_SIZE..].fill(0);
        self.nodes.fill(Node::UNSET);
        self.invalidate();

        // (frequency, symbol) keys are unique, so this matches a stable sort
        // of the symbol-ordered array without its scratch allocation.
        self.order.sort_unstable();

        // Keep at least two leaves so the root always has two children.
        let first_used = self.order.partition_point(|&(freq, _)| freq == 0);
        let mut leaf = first_used.min(ALPHABET_SIZE - 2);

        let mut next_internal = FIRST_INTERNAL;
        let mut last = FIRST_INTERNAL;
        self.add_node(last, self.order[leaf].1, self.order[leaf + 1].1);
        leaf += 2;

        while leaf < ALPHABET_SIZE {
            let left = self.take_smallest(&mut leaf, &mut next_internal, last);
            let right = self.take_smallest(&mut leaf, &mut next_internal, last);
            last += 1;
            self.add_node(last, left, right);
        }

        while next_internal < last {
            last += 1;
            self.add_node(last, next_internal, next_internal + 1);
            next_internal += 2;
        }

        self.root = last;
        debug!(
            "Rebuilt Huffman tree: {} leaves, root {}",
            ALPHABET_SIZE - first_used.min(ALPHABET_SIZE - 2),
            self.root
        );
    }

    /// Pop the lighter head of the leaf queue and the internal-node queue.
    /// Leaves win ties.
    fn take_smallest(&self, leaf: &mut usize, next_internal: &mut NodeId, last: NodeId) -> NodeId {
        if *leaf < ALPHABET_SIZE {
            let (freq, symbol) = self.order[*leaf];
            if *next_internal > last || freq <= self.weights[*next_internal as usize] {
                *leaf += 1;
                return symbol;
            }
        }
        let node = *next_internal;
        *next_internal += 1;
        node
    }

    fn add_node(&mut self, node: NodeId, left: NodeId, right: NodeId) {
        self.nodes[(node - FIRST_INTERNAL) as usize] = Node::new(left, right);
        self.weights[node as usize] =
            self.weights[left as usize].saturating_add(self.weights[right as usize]);
    }

    fn invalidate(&mut self) {
        self.has_codes = false;
        self.accelerator.clear();
    }

    /// Install internal nodes `256..256 + nodes.len()` directly, with no
    /// frequency information. The caller must validate before deriving codes.
    pub(crate) fn set_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        if nodes.is_empty() || nodes.len() > MAX_INTERNAL_NODES {
            return Err(Error::invalid_input(format!(
                "tree must have 1..={} internal nodes, got {}",
                MAX_INTERNAL_NODES,
                nodes.len()
            )));
        }
        self.weights.fill(0);
        self.nodes.fill(Node::UNSET);
        self.nodes[..nodes.len()].copy_from_slice(nodes);
        self.root = FIRST_INTERNAL + (nodes.len() - 1) as NodeId;
        self.invalidate();
        Ok(())
    }

    /// Derive every symbol's code with one depth-first walk.
    pub fn calculate_codes(&mut self) {
        self.codes.fill(Code::EMPTY);
        self.resume.fill(NO_NODE);
        self.accelerator.clear();

        let mut path = Code::EMPTY;
        assign_codes(
            &self.nodes,
            self.root,
            &mut path,
            NO_NODE,
            &mut self.codes,
            &mut self.resume,
        );
        self.has_codes = true;
        trace!("Calculated codes, longest {} bits", self.max_code_len());
    }

    /// Fill the 256-entry decode table. Derives codes first if needed.
    pub fn calculate_decode_accelerators(&mut self) {
        if !self.has_codes {
            self.calculate_codes();
        }
        self.accelerator.fill(&self.codes, &self.resume);
        trace!("Filled decode accelerator for root {}", self.root);
    }

    /// Exact packed size of the counted input: Σ frequency × code length.
    pub fn compressed_size_in_bits(&self) -> u64 {
        self.codes
            .iter()
            .zip(self.weights.iter())
            .map(|(code, &freq)| freq.saturating_mul(code.len() as u64))
            .fold(0u64, |acc, bits| acc.saturating_add(bits))
    }

    /// [`compressed_size_in_bits`](Self::compressed_size_in_bits) rounded up.
    pub fn compressed_size_in_bytes(&self) -> usize {
        self.compressed_size_in_bits().div_ceil(8) as usize
    }

    /// Resolve up to 8 bits of `byte`, bit 0 first.
    ///
    /// `None` starts a new symbol and costs a single table lookup; `Some(node)`
    /// continues a long code from an internal node returned by a previous step.
    #[inline]
    pub fn decode_bits(&self, byte: u8, start: Option<NodeId>) -> DecodeStep {
        match start {
            None => self.accelerator.lookup(byte).into(),
            Some(node) => self.walk(byte, node),
        }
    }

    /// Same contract as [`decode_bits`](Self::decode_bits) without the table.
    pub fn decode_bits_unaccelerated(&self, byte: u8, start: Option<NodeId>) -> DecodeStep {
        self.walk(byte, start.unwrap_or(self.root))
    }

    #[inline]
    fn walk(&self, byte: u8, mut node: NodeId) -> DecodeStep {
        let mut bits = 0u8;
        while bits < LOOKAHEAD_BITS && !is_leaf(node) {
            let bit = (byte >> bits) & 1 == 1;
            node = self.internal(node).child(bit);
            bits += 1;
        }
        DecodeStep { node, bits }
    }

    #[inline]
    fn internal(&self, node: NodeId) -> Node {
        self.nodes[(node - FIRST_INTERNAL) as usize]
    }

    /// Check arena structure: children in range and strictly below their
    /// parent, each referenced once, no orphaned internal nodes.
    pub fn check_tree(&self) -> Result<()> {
        let root = self.root;
        if root < FIRST_INTERNAL || root as usize >= TREE_SIZE {
            return Err(Error::corrupted_tree(format!(
                "root {} outside internal range",
                root
            )));
        }

        let mut references = [0u8; TREE_SIZE];
        for node in (FIRST_INTERNAL..=root).rev() {
            let Node { left, right } = self.internal(node);
            for child in [left, right] {
                if child as usize >= TREE_SIZE {
                    return Err(Error::corrupted_node(
                        format!("child {} out of range", child),
                        node,
                    ));
                }
                if child >= node {
                    return Err(Error::corrupted_node(
                        format!("forward reference to {}", child),
                        node,
                    ));
                }
                references[child as usize] += 1;
                if references[child as usize] > 1 {
                    return Err(Error::corrupted_node(
                        format!("child {} referenced twice", child),
                        node,
                    ));
                }
            }
        }

        if let Some(orphan) = (FIRST_INTERNAL..root).find(|&n| references[n as usize] == 0) {
            return Err(Error::corrupted_node("unreferenced internal node", orphan));
        }
        Ok(())
    }

    /// Check that no present code equals or prefixes another.
    pub fn check_codes(&self) -> Result<()> {
        if !self.has_codes {
            return Err(Error::InvalidState {
                expected: "calculated codes",
                actual: "no codes",
            });
        }
        for (i, a) in self.codes.iter().enumerate() {
            if a.is_empty() {
                continue;
            }
            for (j, b) in self.codes.iter().enumerate().skip(i + 1) {
                if a.is_prefix_of(b) || b.is_prefix_of(a) {
                    return Err(Error::corrupted_tree(format!(
                        "codes of symbols {} and {} collide: {:?} / {:?}",
                        i, j, a, b
                    )));
                }
            }
        }
        Ok(())
    }

    /// Check every table entry against a plain walk from the root.
    pub fn check_decode_accelerators(&self) -> Result<()> {
        if !self.accelerator.is_ready() {
            return Err(Error::InvalidState {
                expected: "decode accelerators",
                actual: "no decode table",
            });
        }
        for byte in 0..=u8::MAX {
            let entry = self.accelerator.lookup(byte);
            if entry.is_empty() {
                return Err(Error::corrupted_tree(format!(
                    "no decode entry for {:08b}",
                    byte
                )));
            }
            let walked = self.walk(byte, self.root);
            if DecodeStep::from(entry) != walked {
                return Err(Error::corrupted_tree(format!(
                    "decode entry for {:08b} is {:?}, tree walk gives {:?}",
                    byte, entry, walked
                )));
            }
        }
        Ok(())
    }

    /// Run all three structural checks.
    pub fn validate(&self) -> Result<()> {
        self.check_tree()?;
        self.check_codes()?;
        self.check_decode_accelerators()
    }

    /// Root of the tree (the last internal node created).
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Internal nodes in use.
    #[inline]
    pub fn internal_node_count(&self) -> usize {
        (self.root - FIRST_INTERNAL) as usize + 1
    }

    /// Children of an internal node in use, `None` for leaves and unused slots.
    pub fn node(&self, node: NodeId) -> Option<Node> {
        if (FIRST_INTERNAL..=self.root).contains(&node) {
            Some(self.internal(node))
        } else {
            None
        }
    }

    /// Code of `symbol`; empty if it is not part of the tree or codes are stale.
    #[inline]
    pub fn code(&self, symbol: u8) -> &Code {
        &self.codes[symbol as usize]
    }

    /// Frequency `symbol` was built with.
    #[inline]
    pub fn frequency(&self, symbol: u8) -> u64 {
        self.weights[symbol as usize]
    }

    /// Frequencies the tree was built with.
    pub fn frequencies(&self) -> &[u64] {
        &self.weights[..ALPHABET_SIZE]
    }

    /// Number of symbols counted into the tree (Σ frequencies).
    pub fn symbol_count(&self) -> u64 {
        self.frequencies()
            .iter()
            .fold(0u64, |acc, &f| acc.saturating_add(f))
    }

    /// Longest code in bits.
    pub fn max_code_len(&self) -> usize {
        self.codes.iter().map(Code::len).max().unwrap_or(0)
    }

    #[inline]
    pub fn has_codes(&self) -> bool {
        self.has_codes
    }

    #[inline]
    pub fn has_decode_accelerators(&self) -> bool {
        self.accelerator.is_ready()
    }

    /// The decode table.
    pub fn accelerator(&self) -> &DecodeAccelerator {
        &self.accelerator
    }
}

impl Default for HuffmanTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HuffmanTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuffmanTree")
            .field("root", &self.root)
            .field("internal_nodes", &self.internal_node_count())
            .field("symbols", &self.symbol_count())
            .field("has_codes", &self.has_codes)
            .field("has_decode_accelerators", &self.accelerator.is_ready())
            .finish()
    }
}

/// Walk the subtree at `node` with `path` holding exactly the edges from the
/// root to `node`.
fn assign_codes(
    nodes: &[Node; MAX_INTERNAL_NODES],
    node: NodeId,
    path: &mut Code,
    resume: NodeId,
    codes: &mut [Code; ALPHABET_SIZE],
    resumes: &mut [NodeId; ALPHABET_SIZE],
) {
    if is_leaf(node) {
        codes[node as usize] = *path;
        resumes[node as usize] = resume;
        return;
    }

    let resume = if path.len() == LOOKAHEAD_BITS as usize {
        node
    } else {
        resume
    };
    let Node { left, right } = nodes[(node - FIRST_INTERNAL) as usize];
    for (child, bit) in [(left, false), (right, true)] {
        path.push(bit);
        assign_codes(nodes, child, path, resume, codes, resumes);
        path.pop();
    }
}
