//! Compact tree structure blob.
//!
//! Each internal node from 256 up to the root contributes its left and then
//! its right child index as fixed 9-bit fields, packed LSB-first like the
//! code stream. Frequencies are not part of the blob.

use huffling_core::{Error, Result};
use tracing::debug;

use crate::bits::{BitReader, BitWriter, LOOKAHEAD_BITS};
use crate::tree::{HuffmanTree, Node, NodeId, FIRST_INTERNAL, MAX_INTERNAL_NODES};

/// Bits per serialized child index (enough for 0..=510).
pub const NODE_INDEX_BITS: usize = 9;

/// Bits per serialized internal node.
pub const NODE_BITS: u64 = 2 * NODE_INDEX_BITS as u64;

/// Serialized tree shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStructure {
    bytes: Vec<u8>,
    bit_len: u64,
}

impl TreeStructure {
    /// Wrap a received blob. Checked when loaded.
    pub fn new(bytes: Vec<u8>, bit_len: u64) -> Self {
        Self { bytes, bit_len }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Meaningful bits in [`bytes`](Self::bytes).
    pub fn bit_len(&self) -> u64 {
        self.bit_len
    }

    /// Internal nodes described, if the length is whole.
    pub fn node_count(&self) -> usize {
        (self.bit_len / NODE_BITS) as usize
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Reads consecutive 9-bit fields off a [`BitReader`].
struct FieldReader<'a> {
    reader: BitReader<'a>,
    /// Bits of the last lookahead already used.
    pending: u8,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            reader: BitReader::new(data),
            pending: 0,
        }
    }

    fn next_field(&mut self) -> Option<NodeId> {
        let low = self.reader.peek_after_skipping(self.pending)?;
        let high = self.reader.peek_after_skipping(LOOKAHEAD_BITS)?;
        self.pending = 1;
        Some(low as NodeId | ((high as NodeId & 1) << 8))
    }
}

impl HuffmanTree {
    /// Serialize the internal nodes `256..=root`.
    pub fn serialize_structure(&self) -> Result<TreeStructure> {
        let count = self.internal_node_count();
        let bit_len = count as u64 * NODE_BITS;
        let mut bytes = vec![0u8; bit_len.div_ceil(8) as usize];

        let mut writer = BitWriter::new(&mut bytes);
        for id in FIRST_INTERNAL..=self.root() {
            let node = self
                .node(id)
                .ok_or_else(|| Error::corrupted_node("missing internal node", id))?;
            writer.append(NODE_INDEX_BITS, &node.left.to_le_bytes())?;
            writer.append(NODE_INDEX_BITS, &node.right.to_le_bytes())?;
        }

        Ok(TreeStructure { bytes, bit_len })
    }

    /// Rebuild a decode-ready tree from a structure blob.
    ///
    /// The shape is checked with [`check_tree`](Self::check_tree) before any
    /// code is derived. The result has no frequencies.
    pub fn from_structure(structure: &TreeStructure) -> Result<HuffmanTree> {
        let bit_len = structure.bit_len;
        if bit_len == 0 || bit_len % NODE_BITS != 0 {
            return Err(Error::invalid_input(format!(
                "structure length {} bits is not a positive multiple of {}",
                bit_len, NODE_BITS
            )));
        }
        let count = structure.node_count();
        if count > MAX_INTERNAL_NODES {
            return Err(Error::invalid_input(format!(
                "structure describes {} internal nodes, at most {} allowed",
                count, MAX_INTERNAL_NODES
            )));
        }
        if bit_len > structure.bytes.len() as u64 * 8 {
            return Err(Error::truncated(structure.bytes.len() as u64 * 8, bit_len));
        }

        let mut fields = FieldReader::new(&structure.bytes);
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            let (Some(left), Some(right)) = (fields.next_field(), fields.next_field()) else {
                return Err(Error::truncated(structure.bytes.len() as u64 * 8, bit_len));
            };
            nodes.push(Node::new(left, right));
        }

        let mut tree = HuffmanTree::new();
        tree.set_nodes(&nodes)?;
        tree.check_tree()?;
        tree.calculate_codes();
        tree.calculate_decode_accelerators();
        debug!("Loaded tree structure: {} internal nodes", count);
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ALPHABET_SIZE;

    fn tree_for(input: &[u8]) -> HuffmanTree {
        let mut freq = [0u64; ALPHABET_SIZE];
        for &b in input {
            freq[b as usize] += 1;
        }
        let mut tree = HuffmanTree::new();
        tree.rebuild(&freq).unwrap();
        tree.calculate_decode_accelerators();
        tree
    }

    #[test]
    fn test_known_layout() {
        // root 257 = (256, 10), 256 = (20, 30)
        let tree = tree_for(&[10, 20, 10, 10, 30]);
        let structure = tree.serialize_structure().unwrap();

        assert_eq!(structure.bit_len(), 36);
        assert_eq!(structure.node_count(), 2);
        assert_eq!(structure.bytes().len(), 5);

        let mut fields = FieldReader::new(structure.bytes());
        assert_eq!(fields.next_field(), Some(20));
        assert_eq!(fields.next_field(), Some(30));
        assert_eq!(fields.next_field(), Some(256));
        assert_eq!(fields.next_field(), Some(10));
    }

    #[test]
    fn test_round_trip_arena_and_codes() {
        let input: Vec<u8> = (0..4000u32).map(|i| ((i * i) % 251) as u8).collect();
        let tree = tree_for(&input);
        let structure = tree.serialize_structure().unwrap();
        let loaded = HuffmanTree::from_structure(&structure).unwrap();

        assert_eq!(loaded.root(), tree.root());
        for id in FIRST_INTERNAL..=tree.root() {
            assert_eq!(loaded.node(id), tree.node(id));
        }
        for symbol in 0..=u8::MAX {
            assert_eq!(loaded.code(symbol), tree.code(symbol));
        }
        assert_eq!(loaded.symbol_count(), 0);
        assert_eq!(loaded.compressed_size_in_bits(), 0);
        loaded.validate().unwrap();
    }

    #[test]
    fn test_full_alphabet_round_trip() {
        let input: Vec<u8> = (0..=255u8).collect();
        let tree = tree_for(&input);
        let structure = tree.serialize_structure().unwrap();
        assert_eq!(structure.node_count(), MAX_INTERNAL_NODES);

        let loaded = HuffmanTree::from_structure(&structure).unwrap();
        assert_eq!(loaded.root(), 510);
    }

    #[test]
    fn test_rejects_bad_length() {
        let err = HuffmanTree::from_structure(&TreeStructure::new(vec![0; 4], 20)).unwrap_err();
        assert_eq!(err.category(), "invalid_input");

        let err = HuffmanTree::from_structure(&TreeStructure::new(Vec::new(), 0)).unwrap_err();
        assert_eq!(err.category(), "invalid_input");

        let err = HuffmanTree::from_structure(&TreeStructure::new(vec![0; 2], 36)).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { .. }));

        let too_many = 256 * NODE_BITS;
        let err = HuffmanTree::from_structure(&TreeStructure::new(
            vec![0; too_many.div_ceil(8) as usize],
            too_many,
        ))
        .unwrap_err();
        assert_eq!(err.category(), "invalid_input");
    }

    #[test]
    fn test_rejects_corrupted_shape() {
        // single node whose children are itself and a leaf
        let mut bytes = vec![0u8; 3];
        let mut writer = BitWriter::new(&mut bytes);
        writer.append(NODE_INDEX_BITS, &256u16.to_le_bytes()).unwrap();
        writer.append(NODE_INDEX_BITS, &1u16.to_le_bytes()).unwrap();

        let err = HuffmanTree::from_structure(&TreeStructure::new(bytes, NODE_BITS)).unwrap_err();
        assert!(matches!(err, Error::CorruptedTree(_)));
    }
}
