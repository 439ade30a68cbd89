//! Bit packing over caller-owned byte buffers.
//!
//! Bits are LSB-first: stream bit `k` lives in byte `k / 8` at bit position
//! `k % 8`. [`BitWriter`] only appends and [`BitReader`] only extracts; a
//! buffer is bound to one of them for its whole lifetime.

use huffling_core::{Error, Result};

use crate::code::Code;

/// Bits delivered by each [`BitReader::peek_after_skipping`] call.
pub const LOOKAHEAD_BITS: u8 = 8;

#[inline]
fn low_mask(bits: usize) -> u8 {
    ((1u16 << bits) - 1) as u8
}

/// Append-only bit writer over a fixed buffer.
///
/// The slice length is the usable size; the writer never grows it.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buf: &'a mut [u8],
    bit_pos: u64,
}

impl<'a> BitWriter<'a> {
    /// Bind a writer to `buf`, cursor at bit 0.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    /// Total bits the bound buffer can hold.
    #[inline]
    pub fn capacity_bits(&self) -> u64 {
        self.buf.len() as u64 * 8
    }

    /// Bits appended so far.
    #[inline]
    pub fn bits_written(&self) -> u64 {
        self.bit_pos
    }

    /// Bytes touched so far, counting a partial trailing byte.
    #[inline]
    pub fn bytes_written(&self) -> usize {
        self.bit_pos.div_ceil(8) as usize
    }

    /// Append the low `bit_count` bits of the byte-packed `bits`.
    ///
    /// Capacity is checked before any byte is written: on overflow the buffer
    /// and cursor are left exactly as they were.
    pub fn append(&mut self, bit_count: usize, bits: &[u8]) -> Result<()> {
        if bit_count > bits.len() * 8 {
            return Err(Error::invalid_input(format!(
                "{} bits requested from a {} byte source",
                bit_count,
                bits.len()
            )));
        }

        let available = self.capacity_bits() - self.bit_pos;
        if bit_count as u64 > available {
            return Err(Error::bit_overflow(bit_count as u64, available));
        }

        let mut remaining = bit_count;
        for &byte in bits {
            if remaining == 0 {
                break;
            }
            let n = remaining.min(8);
            self.put(byte & low_mask(n), n);
            remaining -= n;
        }
        Ok(())
    }

    /// Append a symbol's code.
    #[inline]
    pub fn append_code(&mut self, code: &Code) -> Result<()> {
        self.append(code.len(), code.as_bytes())
    }

    /// Place `n <= 8` already-masked bits at the cursor.
    #[inline]
    fn put(&mut self, value: u8, n: usize) {
        let index = (self.bit_pos / 8) as usize;
        let offset = (self.bit_pos % 8) as usize;
        let wide = (value as u16) << offset;

        // First touch of a byte overwrites it; later touches merge.
        if offset == 0 {
            self.buf[index] = wide as u8;
        } else {
            self.buf[index] |= wide as u8;
        }
        if offset + n > 8 {
            self.buf[index + 1] = (wide >> 8) as u8;
        }
        self.bit_pos += n as u64;
    }
}

/// Extract-only bit reader delivering 8-bit lookaheads.
///
/// Keeps a small shift register refilled one source byte at a time, so the
/// caller can "skip what I used, show me the next byte" without branching
/// per bit.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Next source byte to load.
    pos: usize,
    window: u32,
    /// Valid (non-padding) bits held in `window`.
    valid: u8,
    consumed: u64,
    exhausted: bool,
}

impl<'a> BitReader<'a> {
    /// Bind a reader to `data`, cursor at bit 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            window: 0,
            valid: 0,
            consumed: 0,
            exhausted: false,
        }
    }

    /// Bits the caller has skipped past so far.
    #[inline]
    pub fn bits_consumed(&self) -> u64 {
        self.consumed
    }

    /// Total bits in the bound source.
    #[inline]
    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    /// Drop `skip` consumed bits and return the next 8 bits.
    ///
    /// Bits past the end of the source read as zero. Returns `None` once no
    /// real bit is left, or when `skip` reaches beyond the real bits (the
    /// caller consumed padding); the reader stays exhausted afterwards.
    #[inline]
    pub fn peek_after_skipping(&mut self, skip: u8) -> Option<u8> {
        debug_assert!(skip <= LOOKAHEAD_BITS);
        if self.exhausted || skip > self.valid {
            self.exhausted = true;
            return None;
        }

        self.window >>= skip;
        self.valid -= skip;
        self.consumed += skip as u64;

        while self.valid < LOOKAHEAD_BITS && self.pos < self.data.len() {
            self.window |= (self.data[self.pos] as u32) << self.valid;
            self.pos += 1;
            self.valid += 8;
        }

        if self.valid == 0 {
            self.exhausted = true;
            return None;
        }
        Some(self.window as u8)
    }
}
