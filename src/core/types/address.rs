//! Foreign address and size wrapper types with hex parsing

use super::error::MemoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

/// A virtual address inside the target process.
///
/// This is never a local pointer. Arithmetic is only meaningful within a
/// single contiguous region of the target's memory map, and all additions
/// are checked so an overflowing address surfaces as a validation failure
/// instead of wrapping.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Addr(pub u64);

impl Addr {
    /// Creates a new address from a raw value
    pub const fn new(value: u64) -> Self {
        Addr(value)
    }

    /// Creates a null address (0x0)
    pub const fn null() -> Self {
        Addr(0)
    }

    /// Checks if the address is null
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw u64 value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Checks if the address is aligned to the specified boundary
    pub const fn is_aligned(&self, alignment: u64) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Adds a byte count, returning `None` on 64-bit overflow
    pub fn checked_add(&self, size: MemSize) -> Option<Addr> {
        self.0.checked_add(size.0).map(Addr)
    }

    /// Byte distance from `other` to `self`; `None` if `other > self`
    pub fn offset_from(&self, other: Addr) -> Option<MemSize> {
        self.0.checked_sub(other.0).map(MemSize)
    }
}

impl FromStr for Addr {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16)
            .map(Addr)
            .map_err(|_| MemoryError::InvalidAddress(s.to_string()))
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl From<u64> for Addr {
    fn from(value: u64) -> Self {
        Addr(value)
    }
}

impl Add<MemSize> for Addr {
    type Output = Addr;

    /// Saturating add for display and scan arithmetic; validity checks use
    /// [`Addr::checked_add`].
    fn add(self, rhs: MemSize) -> Addr {
        Addr(self.0.saturating_add(rhs.0))
    }
}

/// A width in bytes of a foreign memory range.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MemSize(pub u64);

impl MemSize {
    /// Creates a new size from a raw byte count
    pub const fn new(value: u64) -> Self {
        MemSize(value)
    }

    /// Returns the raw u64 value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the size as a usize for local buffer allocation
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Checks if the size is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for MemSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

impl From<u64> for MemSize {
    fn from(value: u64) -> Self {
        MemSize(value)
    }
}

impl From<usize> for MemSize {
    fn from(value: usize) -> Self {
        MemSize(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_parsing() {
        assert_eq!(Addr::from_str("0x1000").unwrap(), Addr::new(0x1000));
        assert_eq!(Addr::from_str("0X1000").unwrap(), Addr::new(0x1000));
        assert_eq!(Addr::from_str("deadbeef").unwrap(), Addr::new(0xDEADBEEF));
        assert_eq!(Addr::from_str("  0x20  ").unwrap(), Addr::new(0x20));
        assert!(Addr::from_str("0xGGGG").is_err());
        assert!(Addr::from_str("").is_err());
    }

    #[test]
    fn test_addr_display() {
        let addr = Addr::new(0xDEADBEEF);
        assert_eq!(format!("{}", addr), "0xdeadbeef");
        assert_eq!(format!("{:x}", addr), "deadbeef");
        assert_eq!(format!("{:X}", addr), "DEADBEEF");
    }

    #[test]
    fn test_checked_add() {
        let addr = Addr::new(0x1000);
        assert_eq!(
            addr.checked_add(MemSize::new(0x10)),
            Some(Addr::new(0x1010))
        );
        assert_eq!(Addr::new(u64::MAX).checked_add(MemSize::new(1)), None);
    }

    #[test]
    fn test_offset_from() {
        let base = Addr::new(0x1000);
        let addr = Addr::new(0x1040);
        assert_eq!(addr.offset_from(base), Some(MemSize::new(0x40)));
        assert_eq!(base.offset_from(addr), None);
    }

    #[test]
    fn test_null_address() {
        assert!(Addr::null().is_null());
        assert!(!Addr::new(1).is_null());
    }

    #[test]
    fn test_alignment() {
        assert!(Addr::new(0x1000).is_aligned(8));
        assert!(!Addr::new(0x1005).is_aligned(4));
        assert!(!Addr::new(0x1000).is_aligned(0));
    }

    #[test]
    fn test_serde_round_trip() {
        let addr = Addr::new(0x7F00_0000_1000);
        let json = serde_json::to_string(&addr).unwrap();
        let back: Addr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_size_conversions() {
        let size = MemSize::from(4096usize);
        assert_eq!(size.as_u64(), 4096);
        assert_eq!(size.as_usize(), 4096);
        assert!(!size.is_zero());
        assert!(MemSize::new(0).is_zero());
        assert_eq!(format!("{}", size), "4096 bytes");
    }
}
