//! Array-of-bytes pattern with wildcard mask support

use super::error::{MemoryError, MemoryResult};

/// A byte pattern paired with a mask of equal length.
///
/// A mask byte of `0x00` is a wildcard for that position. Any non-zero mask
/// byte compares only the bits set in the mask, so `0xFF` is an exact match
/// and something like `0x0F` matches the low nibble only. An empty mask
/// supplied by a caller is promoted to all-`0xFF`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AobPattern {
    pattern: Vec<u8>,
    mask: Vec<u8>,
}

impl AobPattern {
    /// Creates a pattern with an explicit mask.
    ///
    /// An empty mask is promoted to an exact-match mask of the pattern's
    /// length; any other length mismatch is rejected.
    pub fn new(pattern: Vec<u8>, mask: Vec<u8>) -> MemoryResult<Self> {
        if pattern.is_empty() {
            return Err(MemoryError::EmptyPattern);
        }
        let mask = if mask.is_empty() {
            vec![0xFF; pattern.len()]
        } else if mask.len() != pattern.len() {
            return Err(MemoryError::MaskMismatch {
                pattern: pattern.len(),
                mask: mask.len(),
            });
        } else {
            mask
        };
        Ok(AobPattern { pattern, mask })
    }

    /// Creates an exact-match pattern
    pub fn exact(pattern: Vec<u8>) -> MemoryResult<Self> {
        Self::new(pattern, Vec::new())
    }

    /// Parses a pattern string of hex byte tokens separated by spaces or
    /// commas, where `??` (or `?`) marks a wildcard position.
    ///
    /// Examples: `"48 8B ?? ?? 89"`, `"00,ba,ad,??,f0"`.
    pub fn from_hex_string(text: &str) -> MemoryResult<Self> {
        let mut pattern = Vec::new();
        let mut mask = Vec::new();

        for part in text.split([' ', ',']).filter(|p| !p.is_empty()) {
            if part == "??" || part == "?" {
                pattern.push(0x00);
                mask.push(0x00);
                continue;
            }
            if part.len() != 2 {
                return Err(MemoryError::InvalidPattern(format!(
                    "invalid hex byte '{}': must be 2 digits",
                    part
                )));
            }
            let byte = u8::from_str_radix(part, 16)
                .map_err(|_| MemoryError::InvalidPattern(format!("invalid hex: {}", part)))?;
            pattern.push(byte);
            mask.push(0xFF);
        }

        if pattern.is_empty() {
            return Err(MemoryError::EmptyPattern);
        }

        Ok(AobPattern { pattern, mask })
    }

    /// The pattern bytes
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    /// The mask bytes, always the same length as the pattern
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Pattern length in bytes
    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    /// True when the pattern holds no bytes (never constructible)
    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }

    /// Checks whether the window starting at `data[0]` matches
    pub fn matches(&self, data: &[u8]) -> bool {
        if data.len() < self.pattern.len() {
            return false;
        }
        self.pattern
            .iter()
            .zip(&self.mask)
            .zip(data)
            .all(|((&p, &m), &d)| m == 0 || d & m == p & m)
    }
}

impl std::fmt::Display for AobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (&p, &m)) in self.pattern.iter().zip(&self.mask).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            if m == 0 {
                write!(f, "??")?;
            } else {
                write!(f, "{:02x}", p)?;
            }
        }
        Ok(())
    }
}
