//! Continuation-bit encoded fields.
//!
//! Local timestamps, global timestamps and extension packets carry an
//! integer after the header byte as a sequence of 7-bit groups, least
//! significant group first. Bit 7 of each byte is set if another byte
//! follows. Every packet family caps the number of bytes; the byte at
//! the cap ends the field regardless of bit 7 and contributes all of
//! its 8 bits. (c.f. e.g. Appendix D4, Fig. D4-4)

use bitvec::prelude::*;

const CONTINUATION: u8 = 1 << 7;

/// Outcome of [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Continuation {
    /// The field ended after `len` bytes.
    Complete {
        /// The decoded value.
        value: u64,

        /// Number of bytes the field occupies.
        len: usize,
    },

    /// Every available byte has its continuation bit set and the cap
    /// has not been reached. More input is needed.
    Incomplete,
}

/// Decodes a continuation-encoded field of at most `max_len` bytes
/// from the start of `bytes`.
///
/// ```
/// use itm_swo::continuation::{decode, Continuation};
///
/// assert_eq!(
///     decode(&[0b1100_1001, 0b0000_0001], 4),
///     Continuation::Complete { value: 0b1_1001001, len: 2 },
/// );
/// assert_eq!(decode(&[0b1100_1001], 4), Continuation::Incomplete);
/// ```
pub fn decode(bytes: &[u8], max_len: usize) -> Continuation {
    let mut field = Field::new(max_len);
    match field.resume(bytes) {
        Some(len) => Continuation::Complete {
            value: field.value(),
            len,
        },
        None => Continuation::Incomplete,
    }
}

/// A continuation-encoded field that may be decoded piecewise, as its
/// bytes arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    value: u64,
    len: usize,
    max_len: usize,
    complete: bool,
}

impl Field {
    /// A field of at most `max_len` bytes. A cap of zero is treated as
    /// one.
    pub fn new(max_len: usize) -> Self {
        Self {
            value: 0,
            len: 0,
            max_len: max_len.max(1),
            complete: false,
        }
    }

    /// Consumes bytes from `bytes` until the field ends or `bytes` is
    /// depleted. Returns the total length of the field once it has
    /// ended; further calls then consume nothing.
    pub fn resume(&mut self, bytes: &[u8]) -> Option<usize> {
        for b in bytes {
            if self.complete {
                break;
            }
            self.push(*b);
        }

        if self.complete {
            Some(self.len)
        } else {
            None
        }
    }

    /// The value accumulated so far.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Number of bytes consumed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no bytes have been consumed yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the field has ended.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn push(&mut self, b: u8) {
        let at_cap = self.len + 1 == self.max_len;
        let width = if at_cap { 8 } else { 7 };

        // groups beyond bit 63 cannot be represented and are dropped
        let start = 7 * self.len;
        let end = (start + width).min(64);
        if start < end {
            self.value.view_bits_mut::<Lsb0>()[start..end].store_le(b);
        }

        self.len += 1;
        self.complete = at_cap || b & CONTINUATION == 0;
    }
}
