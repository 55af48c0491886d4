//! # PrimesDB — Bit-Packed Decade-Pair Primality Database
//!
//! A compact read-only primality table. Every integer whose last digit is
//! 1, 3, 7 or 9 gets one bit; the four residues of a decade (`n / 10`) fill a
//! nibble, and two consecutive decades share a byte:
//!
//! ```text
//!   byte[address]   bit 7 6 5 4 | 3 2 1 0
//!                       9 7 3 1 | 9 7 3 1
//!                     even decade | odd decade
//! ```
//!
//! Everything divisible by 2, 3 or 5 (and everything ≤ 7) is resolved by rule
//! and never stored, so a 1 MB block covers integers up to ~20 million.
//!
//! ## Address Layouts
//!
//! - [`AddressLayout::DecadePair`]: `address = decade / 2`. Byte 0 holds
//!   decades 0 and 1.
//! - [`AddressLayout::Offset`]: `address = ceil(decade / 2) − 1`, the layout
//!   of the published PrimesDB files, which do not store decade 0. Byte 0
//!   holds decades 1 and 2.
//!
//! Bit semantics are the same in both; only the decade→byte mapping shifts.
//!
//! Loading the buffer (download, file read, mmap) is the caller's job. A
//! block can be checked against a known SHA-256 digest on construction.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::error::PrimeError;

/// Last digits that can end a prime above 5, in bit order.
pub const RESIDUE_DIGITS: [u64; 4] = [1, 3, 7, 9];

/// How a decade maps to a byte address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressLayout {
    #[default]
    DecadePair,
    Offset,
}

impl AddressLayout {
    /// Byte address for `decade`, or `None` if the layout has no slot for it.
    #[inline]
    pub fn address(self, decade: u64) -> Option<u64> {
        match self {
            AddressLayout::DecadePair => Some(decade / 2),
            AddressLayout::Offset => decade.div_ceil(2).checked_sub(1),
        }
    }

    /// Largest decade stored by a block of `len` bytes.
    fn last_decade(self, len: u64) -> Option<u64> {
        if len == 0 {
            return None;
        }
        match self {
            AddressLayout::DecadePair => Some(2 * len - 1),
            AddressLayout::Offset => Some(2 * len),
        }
    }
}

/// Bit index of residue `last_digit` within the byte for `decade`.
#[inline]
fn bit_position(last_digit: u64, decade: u64) -> Option<u32> {
    let residue_bit = RESIDUE_DIGITS.iter().position(|&d| d == last_digit)? as u32;
    Some(if decade % 2 == 0 {
        residue_bit + 4
    } else {
        residue_bit
    })
}

/// An immutable PrimesDB buffer plus its address layout.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone)]
pub struct PrimesDbBlock {
    bytes: Arc<[u8]>,
    layout: AddressLayout,
}

impl PrimesDbBlock {
    pub fn new(bytes: impl Into<Arc<[u8]>>, layout: AddressLayout) -> Self {
        PrimesDbBlock {
            bytes: bytes.into(),
            layout,
        }
    }

    /// Like [`new`](Self::new), but rejects the buffer unless its SHA-256
    /// digest equals `expected_sha256` (lowercase or uppercase hex).
    pub fn verified(
        bytes: impl Into<Arc<[u8]>>,
        layout: AddressLayout,
        expected_sha256: &str,
    ) -> Result<Self, PrimeError> {
        let block = Self::new(bytes, layout);
        let actual = block.digest_hex();
        if !actual.eq_ignore_ascii_case(expected_sha256.trim()) {
            return Err(PrimeError::DigestMismatch {
                expected: expected_sha256.trim().to_lowercase(),
                actual,
            });
        }
        Ok(block)
    }

    pub fn layout(&self) -> AddressLayout {
        self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 of the raw buffer as lowercase hex.
    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Largest integer whose primality this block can answer (0 if empty).
    pub fn ceiling(&self) -> u64 {
        self.layout
            .last_decade(self.bytes.len() as u64)
            .map_or(0, |d| d * 10 + 9)
    }

    /// True if `n` is at or below [`ceiling`](Self::ceiling).
    #[inline]
    pub fn covers(&self, n: u64) -> bool {
        !self.bytes.is_empty() && n <= self.ceiling()
    }

    /// Shorthand for [`decode`]`(self, n)`.
    #[inline]
    pub fn lookup(&self, n: u64) -> Option<bool> {
        decode(self, n)
    }
}

/// Read the primality of `n` from `block`.
///
/// Returns `Some(verdict)` for `n ≤ 7` (by rule) and for stored residues.
/// Returns `None` when `n` has no slot: divisible by 2, 3 or 5, or its
/// address lies past the end of the buffer. The oracle treats `None` as
/// "ask another strategy".
pub fn decode(block: &PrimesDbBlock, n: u64) -> Option<bool> {
    if n <= 7 {
        return Some(matches!(n, 2 | 3 | 5 | 7));
    }
    if n % 2 == 0 || n % 3 == 0 || n % 5 == 0 {
        return None;
    }
    let decade = n / 10;
    let address = block.layout.address(decade)? as usize;
    let byte = *block.bytes.get(address)?;
    let bit = bit_position(n % 10, decade)?;
    Some((byte >> bit) & 1 == 1)
}

/// Build the smallest block covering every integer up to `limit`, taking
/// each stored bit from `is_prime`.
///
/// The final byte is always filled completely, so `is_prime` is also asked
/// about values between `limit` and the block's
/// [`ceiling`](PrimesDbBlock::ceiling). Afterwards
/// `decode(&block, n) == Some(is_prime(n))` for every stored `n ≤ ceiling`.
pub fn encode(limit: u64, layout: AddressLayout, is_prime: impl Fn(u64) -> bool) -> PrimesDbBlock {
    let len = layout.address(limit / 10).map_or(0, |a| a as usize + 1);
    let mut bytes = vec![0u8; len];
    let Some(last_decade) = layout.last_decade(len as u64) else {
        return PrimesDbBlock::new(bytes, layout);
    };

    for decade in 0..=last_decade {
        let Some(address) = layout.address(decade) else {
            continue;
        };
        for &digit in &RESIDUE_DIGITS {
            let n = decade * 10 + digit;
            if !is_prime(n) {
                continue;
            }
            if let Some(bit) = bit_position(digit, decade) {
                bytes[address as usize] |= 1 << bit;
            }
        }
    }

    PrimesDbBlock::new(bytes, layout)
}
