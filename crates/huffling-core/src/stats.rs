//! Statistics and metrics for codec operations.

use serde::Serialize;

/// Direction of a completed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Encode,
    Decode,
}

/// Packed size against the 8-bit-per-symbol input, measured in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionRatio {
    /// Symbols in the uncompressed side.
    pub symbols: u64,
    /// Exact packed length.
    pub coded_bits: u64,
}

impl CompressionRatio {
    pub fn new(symbols: u64, coded_bits: u64) -> Self {
        Self {
            symbols,
            coded_bits,
        }
    }

    /// Input bits per packed bit; 0 when nothing was packed.
    pub fn ratio(&self) -> f64 {
        if self.coded_bits == 0 {
            return 0.0;
        }
        self.symbols.saturating_mul(8) as f64 / self.coded_bits as f64
    }

    /// Mean code length.
    pub fn bits_per_symbol(&self) -> f64 {
        if self.symbols == 0 {
            return 0.0;
        }
        self.coded_bits as f64 / self.symbols as f64
    }

    /// Share of the 8-bit encoding saved, in percent. Negative when codes
    /// average more than 8 bits.
    pub fn savings_percent(&self) -> f64 {
        if self.symbols == 0 {
            return 0.0;
        }
        (8.0 - self.bits_per_symbol()) / 8.0 * 100.0
    }

    /// Codes average under 8 bits.
    pub fn is_effective(&self) -> bool {
        self.coded_bits < self.symbols.saturating_mul(8)
    }
}

/// Statistics from a single encode or decode call.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompressionStats {
    /// Which way the data went.
    pub direction: Direction,

    /// Uncompressed size in bytes.
    pub original_size: usize,

    /// Packed size in bytes.
    pub compressed_size: usize,

    /// Exact packed size in bits.
    pub compressed_bits: u64,

    /// Time taken in microseconds.
    pub time_us: u64,
}

impl CompressionStats {
    /// Create stats from a completed operation.
    pub fn from_operation(
        direction: Direction,
        original_size: usize,
        compressed_bits: u64,
        time_us: u64,
    ) -> Self {
        CompressionStats {
            direction,
            original_size,
            compressed_size: compressed_bits.div_ceil(8) as usize,
            compressed_bits,
            time_us,
        }
    }

    pub fn ratio(&self) -> CompressionRatio {
        CompressionRatio::new(self.original_size as u64, self.compressed_bits)
    }

    /// Average code length in bits per input byte.
    pub fn bits_per_symbol(&self) -> f64 {
        self.ratio().bits_per_symbol()
    }

    /// Throughput over the uncompressed side in MB/s.
    pub fn throughput_mbs(&self) -> f64 {
        if self.time_us == 0 {
            return 0.0;
        }
        self.original_size as f64 / self.time_us as f64
    }
}

/// Running totals across the lifetime of a codec.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Metrics {
    /// Successful encode calls.
    pub encodes: u64,

    /// Successful decode calls.
    pub decodes: u64,

    /// Uncompressed bytes seen by successful calls.
    pub bytes_in: u64,

    /// Packed bits seen by successful calls.
    pub bits_out: u64,

    /// Total time spent in microseconds.
    pub total_time_us: u64,

    /// Failed calls.
    pub error_count: u64,
}

impl Metrics {
    /// Create new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed operation.
    pub fn record(&mut self, stats: &CompressionStats) {
        match stats.direction {
            Direction::Encode => self.encodes += 1,
            Direction::Decode => self.decodes += 1,
        }
        self.bytes_in += stats.original_size as u64;
        self.bits_out += stats.compressed_bits;
        self.total_time_us += stats.time_us;
    }

    /// Record an error.
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Average ratio over everything recorded so far.
    pub fn average_ratio(&self) -> f64 {
        if self.bits_out == 0 {
            return 1.0;
        }
        (self.bytes_in * 8) as f64 / self.bits_out as f64
    }
}
