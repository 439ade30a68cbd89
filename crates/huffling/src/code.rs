//! Per-symbol Huffman codes.
//!
//! A [`Code`] is the root-to-leaf path of a symbol: one bit per edge, 0 for a
//! left edge and 1 for a right edge. Bit `k` of the path lives in byte `k / 8`
//! at bit position `k % 8`, which is also the order the bits are appended to
//! the packed stream.

/// Longest possible code in bits (a fully skewed 256-leaf tree).
pub const MAX_CODE_BITS: usize = 255;

/// Bytes needed to hold a code of [`MAX_CODE_BITS`].
pub const MAX_CODE_BYTES: usize = MAX_CODE_BITS.div_ceil(8);

/// Variable-length bit code for one symbol.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Code {
    len: u8,
    bits: [u8; MAX_CODE_BYTES],
}

impl Code {
    /// The code of a symbol that never occurs.
    pub const EMPTY: Code = Code {
        len: 0,
        bits: [0; MAX_CODE_BYTES],
    };

    /// Build a code from its path bits, first edge first.
    ///
    /// Returns `None` for paths longer than [`MAX_CODE_BITS`].
    pub fn from_path(path: &[bool]) -> Option<Self> {
        if path.len() > MAX_CODE_BITS {
            return None;
        }
        let mut code = Code::EMPTY;
        for &bit in path {
            code.push(bit);
        }
        Some(code)
    }

    /// Length in bits; 0 means the symbol is absent.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed bits, trimmed to the bytes in use.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits[..self.len().div_ceil(8)]
    }

    /// The first (up to) eight path bits as a byte, unused high bits zero.
    #[inline]
    pub fn first_byte(&self) -> u8 {
        self.bits[0]
    }

    /// Path bit `index`; `true` is a right edge.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        debug_assert!(index < self.len());
        (self.bits[index / 8] >> (index % 8)) & 1 == 1
    }

    /// Iterate over the path bits, first edge first.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(|i| self.bit(i))
    }

    /// Append one edge to the path.
    ///
    /// The caller keeps the path within [`MAX_CODE_BITS`]; a 256-leaf tree
    /// is never deeper than that.
    #[inline]
    pub fn push(&mut self, bit: bool) {
        debug_assert!(self.len() < MAX_CODE_BITS, "code longer than {MAX_CODE_BITS} bits");
        let index = self.len();
        if bit {
            self.bits[index / 8] |= 1 << (index % 8);
        }
        self.len += 1;
    }

    /// Remove the last edge from the path, clearing its bit.
    #[inline]
    pub fn pop(&mut self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let index = self.len();
        let mask = 1 << (index % 8);
        let bit = self.bits[index / 8] & mask != 0;
        self.bits[index / 8] &= !mask;
        Some(bit)
    }

    /// Check if `self` is a bit-prefix of `other` (equal codes count).
    ///
    /// Empty codes are never prefixes: an absent symbol has no path.
    pub fn is_prefix_of(&self, other: &Code) -> bool {
        if self.is_empty() || self.len > other.len {
            return false;
        }
        let full = self.len() / 8;
        if self.bits[..full] != other.bits[..full] {
            return false;
        }
        let rest = self.len() % 8;
        if rest == 0 {
            return true;
        }
        let mask = ((1u16 << rest) - 1) as u8;
        self.bits[full] & mask == other.bits[full] & mask
    }
}

impl Default for Code {
    fn default() -> Self {
        Code::EMPTY
    }
}

impl std::fmt::Debug for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path: String = self.iter().map(|b| if b { '1' } else { '0' }).collect();
        write!(f, "Code({path:?})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MAX_CODE_BITS, 255);
        assert_eq!(MAX_CODE_BYTES, 32);
    }

    #[test]
    fn test_push_pop() {
        let mut code = Code::EMPTY;
        code.push(true);
        code.push(false);
        code.push(true);
        assert_eq!(code.len(), 3);
        assert_eq!(code.first_byte(), 0b101);

        assert_eq!(code.pop(), Some(true));
        assert_eq!(code.len(), 2);
        assert_eq!(code.first_byte(), 0b01);

        assert_eq!(code.pop(), Some(false));
        assert_eq!(code.pop(), Some(true));
        assert_eq!(code.pop(), None);
        assert_eq!(code, Code::EMPTY);
    }

    #[test]
    fn test_crosses_byte_boundary() {
        let path: Vec<bool> = (0..11).map(|i| i % 3 == 0).collect();
        let code = Code::from_path(&path).unwrap();

        assert_eq!(code.len(), 11);
        assert_eq!(code.as_bytes().len(), 2);
        // bits 0, 3, 6 in the first byte; 9 in the second
        assert_eq!(code.as_bytes(), &[0b0100_1001, 0b0000_0010]);
        assert_eq!(code.iter().collect::<Vec<_>>(), path);
    }

    #[test]
    fn test_max_length() {
        let path = vec![true; MAX_CODE_BITS];
        let code = Code::from_path(&path).unwrap();
        assert_eq!(code.len(), MAX_CODE_BITS);
        assert_eq!(code.as_bytes().len(), MAX_CODE_BYTES);
        assert_eq!(code.as_bytes()[MAX_CODE_BYTES - 1], 0x7F);

        assert!(Code::from_path(&vec![false; MAX_CODE_BITS + 1]).is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "code longer than")]
    fn test_push_past_max_length() {
        let mut code = Code::from_path(&[true; MAX_CODE_BITS]).unwrap();
        code.push(false);
    }

    #[test]
    fn test_prefix() {
        let a = Code::from_path(&[true, false]).unwrap();
        let b = Code::from_path(&[true, false, true]).unwrap();
        let c = Code::from_path(&[true, true, true]).unwrap();

        assert!(a.is_prefix_of(&b));
        assert!(a.is_prefix_of(&a));
        assert!(!b.is_prefix_of(&a));
        assert!(!a.is_prefix_of(&c));
        assert!(!Code::EMPTY.is_prefix_of(&a));
        assert!(!Code::EMPTY.is_prefix_of(&Code::EMPTY));
    }

    #[test]
    fn test_prefix_long_codes() {
        let mut long = vec![false; 20];
        long[12] = true;
        let a = Code::from_path(&long[..13]).unwrap();
        let b = Code::from_path(&long).unwrap();
        let mut other = long.clone();
        other[9] = true;
        let c = Code::from_path(&other).unwrap();

        assert!(a.is_prefix_of(&b));
        assert!(!a.is_prefix_of(&c));
    }

    #[test]
    fn test_debug_format() {
        let code = Code::from_path(&[false, true, true]).unwrap();
        assert_eq!(format!("{code:?}"), "Code(\"011\")");
    }
}
