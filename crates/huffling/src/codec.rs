//! Whole-buffer Huffman encoding and decoding.

use std::time::Instant;

use huffling_core::{CodecConfig, CompressionStats, Direction, Error, Metrics, Result};
use tracing::{debug, warn};

use crate::bits::{BitReader, BitWriter};
use crate::tree::{HuffmanTree, NodeId, ALPHABET_SIZE};

/// Outcome of one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Input bytes encoded.
    pub input_len: usize,
    /// Bytes of the destination holding the packed stream.
    pub bytes: usize,
    /// Exact packed length; pass this to decode.
    pub bits: u64,
}

/// Huffman codec owning its frequency table, tree and encode buffer.
///
/// Encoding builds the tree from the input itself. Decoding needs the tree
/// the stream was encoded with: decode with the same codec, or hand the
/// tree state over with [`from_frequencies`](Self::from_frequencies) or
/// [`from_tree`](Self::from_tree).
pub struct HuffmanCodec {
    config: CodecConfig,
    frequencies: Box<[u64; ALPHABET_SIZE]>,
    tree: HuffmanTree,
    buffer: Vec<u8>,
    encoded_len: usize,
    last_stats: Option<CompressionStats>,
    metrics: Metrics,
}

impl HuffmanCodec {
    /// Create a codec with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    /// Create a codec with an owned encode buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(CodecConfig::with_capacity(capacity))
    }

    /// Create a codec with a specific configuration.
    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            buffer: vec![0; config.capacity],
            config,
            frequencies: Box::new([0; ALPHABET_SIZE]),
            tree: HuffmanTree::new(),
            encoded_len: 0,
            last_stats: None,
            metrics: Metrics::new(),
        }
    }

    /// Decode-side codec for a stream encoded with these frequencies.
    ///
    /// Owns no encode buffer. Build with [`with_config`](Self::with_config)
    /// and call [`load_frequencies`](Self::load_frequencies) to keep one or
    /// to turn on validation.
    pub fn from_frequencies(frequencies: &[u64]) -> Result<Self> {
        let mut codec = Self::with_capacity(0);
        codec.load_frequencies(frequencies)?;
        Ok(codec)
    }

    /// Decode-side codec around an already built tree. Owns no encode buffer.
    pub fn from_tree(tree: HuffmanTree) -> Result<Self> {
        let mut codec = Self::with_capacity(0);
        codec.load_tree(tree)?;
        Ok(codec)
    }

    /// Replace the tree with one built from `frequencies`.
    pub fn load_frequencies(&mut self, frequencies: &[u64]) -> Result<()> {
        self.tree.rebuild(frequencies)?;
        self.frequencies.copy_from_slice(self.tree.frequencies());
        self.derive_tables()
    }

    /// Replace the tree, deriving any missing codes and decode tables.
    ///
    /// Validates the tree when the configuration asks for it.
    pub fn load_tree(&mut self, tree: HuffmanTree) -> Result<()> {
        self.tree = tree;
        self.frequencies.copy_from_slice(self.tree.frequencies());
        if !self.tree.has_decode_accelerators() {
            self.tree.calculate_decode_accelerators();
        }
        self.validate_if_configured()
    }

    fn derive_tables(&mut self) -> Result<()> {
        self.tree.calculate_codes();
        self.tree.calculate_decode_accelerators();
        self.validate_if_configured()
    }

    fn validate_if_configured(&self) -> Result<()> {
        if self.config.validate {
            if let Err(e) = self.tree.validate() {
                warn!("Tree validation failed: {}", e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Encode `input` into `output`.
    ///
    /// Fails with [`Error::BufferTooSmall`] before writing anything when the
    /// packed stream would not fit.
    pub fn encode_into(&mut self, input: &[u8], output: &mut [u8]) -> Result<EncodeSummary> {
        let start = Instant::now();
        let result = self.encode_inner(input, output);
        self.finish(Direction::Encode, input.len(), &result, start, |s| s.bits);
        result
    }

    /// Encode `input` into the codec's own buffer. See [`encoded`](Self::encoded).
    pub fn encode(&mut self, input: &[u8]) -> Result<EncodeSummary> {
        let mut buffer = std::mem::take(&mut self.buffer);
        let result = self.encode_into(input, &mut buffer);
        self.buffer = buffer;
        self.encoded_len = result.as_ref().map(|s| s.bytes).unwrap_or(0);
        result
    }

    /// Bytes produced by the last successful [`encode`](Self::encode).
    pub fn encoded(&self) -> &[u8] {
        &self.buffer[..self.encoded_len]
    }

    fn encode_inner(&mut self, input: &[u8], output: &mut [u8]) -> Result<EncodeSummary> {
        self.frequencies.fill(0);
        for &byte in input {
            self.frequencies[byte as usize] += 1;
        }
        self.tree.rebuild(&self.frequencies[..])?;
        self.derive_tables()?;

        let required = self.tree.compressed_size_in_bytes();
        if required > output.len() {
            return Err(Error::buffer_too_small(required, output.len()));
        }

        let mut writer = BitWriter::new(output);
        for &byte in input {
            if let Err(e) = writer.append_code(self.tree.code(byte)) {
                warn!(
                    "Bit writer overflow after passing size check at {} bits",
                    writer.bits_written()
                );
                return Err(e);
            }
        }

        Ok(EncodeSummary {
            input_len: input.len(),
            bytes: writer.bytes_written(),
            bits: writer.bits_written(),
        })
    }

    /// Decode the first `total_bits` bits of `encoded` into `output`.
    ///
    /// Returns the number of symbols written.
    pub fn decode_into(
        &mut self,
        encoded: &[u8],
        total_bits: u64,
        output: &mut [u8],
    ) -> Result<usize> {
        let start = Instant::now();
        let result = self.decode_inner(encoded, total_bits, output);
        let written = result.as_ref().map_or(0, |&n| n);
        self.finish(Direction::Decode, written, &result, start, |_| total_bits);
        result
    }

    /// Decode into a new vector.
    ///
    /// Every symbol costs at least one bit, so the output is sized by the
    /// readable bits, capped by the tree's symbol count when it has one.
    pub fn decode(&mut self, encoded: &[u8], total_bits: u64) -> Result<Vec<u8>> {
        let mut capacity = total_bits.min(encoded.len() as u64 * 8);
        let counted = self.tree.symbol_count();
        if counted > 0 {
            capacity = capacity.min(counted);
        }
        let mut output = vec![0u8; usize::try_from(capacity).unwrap_or(usize::MAX)];
        let written = self.decode_into(encoded, total_bits, &mut output)?;
        output.truncate(written);
        Ok(output)
    }

    fn decode_inner(&self, encoded: &[u8], total_bits: u64, output: &mut [u8]) -> Result<usize> {
        if !self.tree.has_decode_accelerators() {
            return Err(Error::InvalidState {
                expected: "decode accelerators",
                actual: "no decode table",
            });
        }
        let available = encoded.len() as u64 * 8;
        if total_bits > available {
            return Err(Error::truncated(available, total_bits));
        }

        let mut reader = BitReader::new(encoded);
        let mut written = 0usize;
        let mut skip = 0u8;
        let mut resume: Option<NodeId> = None;

        while reader.bits_consumed() + (skip as u64) < total_bits {
            let byte = reader
                .peek_after_skipping(skip)
                .ok_or_else(|| Error::truncated(reader.bits_consumed(), total_bits))?;
            let step = self.tree.decode_bits(byte, resume);
            if step.bits == 0 {
                return Err(Error::corrupted_node("decode made no progress", step.node));
            }
            skip = step.bits;

            match step.symbol() {
                Some(symbol) => {
                    let slot = output
                        .get_mut(written)
                        .ok_or(Error::DestinationFull { capacity: written })?;
                    *slot = symbol;
                    written += 1;
                    resume = None;
                }
                None => resume = Some(step.node),
            }
        }

        let consumed = reader.bits_consumed() + skip as u64;
        if consumed != total_bits || resume.is_some() {
            return Err(Error::misaligned(consumed, total_bits));
        }
        Ok(written)
    }

    fn finish<T>(
        &mut self,
        direction: Direction,
        original_size: usize,
        result: &Result<T>,
        start: Instant,
        bits: impl FnOnce(&T) -> u64,
    ) {
        match result {
            Ok(value) => {
                let stats = CompressionStats::from_operation(
                    direction,
                    original_size,
                    bits(value),
                    start.elapsed().as_micros() as u64,
                );
                debug!(
                    "{:?} finished: {} bytes <-> {} bits in {}us",
                    direction, stats.original_size, stats.compressed_bits, stats.time_us
                );
                self.metrics.record(&stats);
                self.last_stats = Some(stats);
            }
            Err(e) => {
                debug!("{:?} failed: {}", direction, e);
                self.metrics.record_error();
            }
        }
    }

    /// Tree from the last encode or load.
    pub fn tree(&self) -> &HuffmanTree {
        &self.tree
    }

    /// Frequency table the current tree was built from.
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies[..]
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Statistics of the last successful call.
    pub fn last_stats(&self) -> Option<&CompressionStats> {
        self.last_stats.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

impl Default for HuffmanCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HuffmanCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuffmanCodec")
            .field("config", &self.config)
            .field("tree", &self.tree)
            .field("encoded_len", &self.encoded_len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    #[test]
    fn test_two_symbol_scenario() {
        let mut input = vec![65u8; 5];
        input.extend_from_slice(&[66; 3]);
        let mut codec = HuffmanCodec::with_capacity(64);

        let summary = codec.encode(&input).unwrap();
        assert_eq!(summary.bits, 8);
        assert_eq!(summary.bytes, 1);
        assert_eq!(codec.encoded().len(), 1);

        let encoded = codec.encoded().to_vec();
        assert_eq!(codec.decode(&encoded, summary.bits).unwrap(), input);
    }

    #[test]
    fn test_small_round_trip() {
        let input = [10u8, 20, 10, 10, 30];
        let mut codec = HuffmanCodec::new();
        let mut out = [0u8; 10];

        let summary = codec.encode_into(&input, &mut out).unwrap();
        assert_eq!(summary.bits, 7);
        assert_eq!(summary.bytes, 1);
        assert!(summary.bits > 0 && summary.bits <= 80);

        let decoded = codec.decode(&out[..summary.bytes], summary.bits).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_capacity_precheck_leaves_output() {
        let input: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        let mut codec = HuffmanCodec::new();
        let mut out = [0xAAu8; 16];

        let err = codec.encode_into(&input, &mut out).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                required: 1024,
                provided: 16
            }
        ));
        assert!(err.is_recoverable());
        assert!(out.iter().all(|&b| b == 0xAA));
        assert_eq!(codec.metrics().error_count, 1);
    }

    #[test]
    fn test_one_bit_short_is_misaligned() {
        let input = [10u8, 20, 10, 10, 30];
        let mut codec = HuffmanCodec::new();
        let summary = codec.encode(&input).unwrap();
        let encoded = codec.encoded().to_vec();

        let err = codec.decode(&encoded, summary.bits - 1).unwrap_err();
        assert!(
            matches!(err, Error::MisalignedStream { consumed: 7, expected: 6 }),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_total_bits_beyond_source() {
        let mut codec = HuffmanCodec::new();
        let summary = codec.encode(b"abcabc").unwrap();
        let encoded = codec.encoded().to_vec();

        let err = codec.decode(&encoded, summary.bits + 64).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { .. }));
    }

    #[test]
    fn test_destination_full() {
        let input = b"mississippi";
        let mut codec = HuffmanCodec::new();
        let summary = codec.encode(input).unwrap();
        let encoded = codec.encoded().to_vec();

        let mut out = [0u8; 4];
        let err = codec.decode_into(&encoded, summary.bits, &mut out).unwrap_err();
        assert!(matches!(err, Error::DestinationFull { capacity: 4 }));
        assert_eq!(&out, b"miss");
    }

    #[test]
    fn test_empty_input() {
        let mut codec = HuffmanCodec::new();
        let summary = codec.encode(&[]).unwrap();
        assert_eq!(summary, EncodeSummary { input_len: 0, bytes: 0, bits: 0 });
        assert!(codec.decode(&[], 0).unwrap().is_empty());
    }

    #[test]
    fn test_from_tree_derives_tables() {
        let mut tree = HuffmanTree::new();
        tree.rebuild(&[1; ALPHABET_SIZE]).unwrap();
        assert!(!tree.has_decode_accelerators());

        // load_tree derives what is missing
        let mut codec = HuffmanCodec::from_tree(tree).unwrap();
        assert!(codec.tree().has_decode_accelerators());
        assert_eq!(codec.decode(&[0], 8).unwrap().len(), 1);
    }

    #[test]
    fn test_from_frequencies_decodes() {
        let input = b"the quick brown fox jumps over the lazy dog";
        let mut encoder = HuffmanCodec::new();
        let summary = encoder.encode(input).unwrap();

        let mut decoder = HuffmanCodec::from_frequencies(encoder.frequencies()).unwrap();
        assert_eq!(decoder.decode(encoder.encoded(), summary.bits).unwrap(), input);
    }

    #[test]
    fn test_decode_sized_by_stream_not_counts() {
        let mut frequencies = [0u64; ALPHABET_SIZE];
        frequencies[1] = u64::MAX / 2;
        frequencies[2] = u64::MAX / 2;
        let mut codec = HuffmanCodec::from_frequencies(&frequencies).unwrap();
        assert_eq!(codec.tree().code(1).len(), 1);

        // symbol 1 is the left child: a single 0 bit
        assert_eq!(codec.decode(&[0u8], 1).unwrap(), [1]);
        assert_eq!(codec.decode(&[0b10u8], 2).unwrap(), [1, 2]);
    }

    #[test]
    fn test_decode_with_structure_tree() {
        let input = b"structure only, no counts";
        let mut encoder = HuffmanCodec::new();
        let summary = encoder.encode(input).unwrap();

        let structure = encoder.tree().serialize_structure().unwrap();
        let tree = HuffmanTree::from_structure(&structure).unwrap();
        assert_eq!(tree.symbol_count(), 0);

        let mut decoder = HuffmanCodec::from_tree(tree).unwrap();
        assert_eq!(decoder.decode(encoder.encoded(), summary.bits).unwrap(), input);
    }

    #[test]
    fn test_decode_side_codecs_own_no_buffer() {
        let decoder = HuffmanCodec::from_frequencies(&[1; ALPHABET_SIZE]).unwrap();
        assert_eq!(decoder.config().capacity, 0);
        assert!(decoder.encoded().is_empty());

        let decoder = HuffmanCodec::from_tree(HuffmanTree::new()).unwrap();
        assert_eq!(decoder.config().capacity, 0);
    }

    #[test]
    fn test_load_tree_validates_when_configured() {
        let mut tree = HuffmanTree::new();
        tree.set_nodes(&[Node::new(0, 1), Node::new(0, 256)]).unwrap();

        let mut codec = HuffmanCodec::with_config(CodecConfig::with_capacity(0).validate(true));
        let err = codec.load_tree(tree.clone()).unwrap_err();
        assert!(matches!(err, Error::CorruptedTree(_)));

        // without validation the tree is taken as given
        let mut codec = HuffmanCodec::with_capacity(0);
        codec.load_tree(tree).unwrap();
    }

    #[test]
    fn test_validate_config() {
        let config = CodecConfig::with_capacity(256).validate(true);
        let mut codec = HuffmanCodec::with_config(config);
        let summary = codec.encode(b"validated round trip").unwrap();
        let encoded = codec.encoded().to_vec();
        assert_eq!(codec.decode(&encoded, summary.bits).unwrap(), b"validated round trip");
    }

    #[test]
    fn test_stats_and_metrics() {
        let mut codec = HuffmanCodec::new();
        let input = vec![b'a'; 100];
        let summary = codec.encode(&input).unwrap();

        let stats = codec.last_stats().unwrap();
        assert_eq!(stats.direction, Direction::Encode);
        assert_eq!(stats.original_size, 100);
        assert_eq!(stats.compressed_bits, summary.bits);
        assert!(stats.ratio().is_effective());

        let encoded = codec.encoded().to_vec();
        codec.decode(&encoded, summary.bits).unwrap();
        assert_eq!(codec.last_stats().unwrap().direction, Direction::Decode);
        assert_eq!(codec.metrics().encodes, 1);
        assert_eq!(codec.metrics().decodes, 1);
        assert_eq!(codec.metrics().bytes_in, 200);
    }

    #[test]
    fn test_reuse_across_calls() {
        let mut codec = HuffmanCodec::with_capacity(1024);
        for input in [&b"aaaabbbcc"[..], b"zyxwvu", b"q"] {
            let summary = codec.encode(input).unwrap();
            let encoded = codec.encoded().to_vec();
            assert_eq!(codec.decode(&encoded, summary.bits).unwrap(), input);
        }
    }
}
