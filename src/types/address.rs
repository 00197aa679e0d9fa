/*!
Abstraction over an address in the simulated machine.
*/

use std::fmt;
use std::ops;

/// This type represents an address in the simulated machine.
///
/// It internally holds a `u64` value. The same type is used for full
/// addresses, page addresses (full addresses shifted right by the
/// page-offset bit width) and cache-line addresses; [`Address::to_page`]
/// and [`Address::to_line`] convert between them.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

/// Constructs an `Address` from a `u32` value.
impl From<u32> for Address {
    fn from(item: u32) -> Self {
        Self(u64::from(item))
    }
}

/// Constructs an `Address` from a `u64` value.
impl From<u64> for Address {
    fn from(item: u64) -> Self {
        Self(item)
    }
}

/// Constructs an `Address` from a `usize` value.
impl From<usize> for Address {
    fn from(item: usize) -> Self {
        Self(item as u64)
    }
}

impl Address {
    /// An address with the value of zero.
    pub const NULL: Address = Address(0);

    /// An address with an invalid value.
    ///
    /// Used as the empty-slot and cleared-filter-entry sentinel; no
    /// modeled address ever occupies the full 64-bit range.
    pub const INVALID: Address = Address(!0);

    /// Returns an address with a value of zero.
    pub const fn null() -> Self {
        Address::NULL
    }

    /// Checks whether the address is zero or not.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns an address with an invalid value.
    pub const fn invalid() -> Self {
        Address::INVALID
    }

    /// Checks whether the address is valid or not.
    pub const fn is_valid(self) -> bool {
        self.0 != !0
    }

    /// Converts the address into a `u64` value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Converts the address into a `usize` value.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Returns the page address, dropping the page-offset bits.
    pub const fn to_page(self, page_bits: u32) -> Address {
        Address(self.0 >> page_bits)
    }

    /// Returns the cache-line address, dropping the line-offset bits.
    pub const fn to_line(self, line_bits: u32) -> Address {
        Address(self.0 >> line_bits)
    }
}

/// Returns an address with a value of zero.
impl Default for Address {
    fn default() -> Self {
        Self::null()
    }
}

/// Adds a `u64` offset to an `Address`.
impl ops::Add<u64> for Address {
    type Output = Self;

    fn add(self, other: u64) -> Self {
        Self(self.0 + other)
    }
}

/// Subtracts a `u64` offset from an `Address`.
impl ops::Sub<u64> for Address {
    type Output = Self;

    fn sub(self, other: u64) -> Self {
        Self(self.0 - other)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from() {
        assert_eq!(Address::null().is_null(), true);
        assert_eq!(Address::from(1337_u64).as_u64(), 1337);
        assert_eq!(Address::from(4321_usize).as_usize(), 4321);
        assert_eq!(Address::invalid().is_valid(), false);
    }

    #[test]
    fn test_page_and_line() {
        assert_eq!(Address::from(0x1234_u64).to_page(12), Address::from(1_u64));
        assert_eq!(
            Address::from(0xdead_b000_u64).to_page(12),
            Address::from(0xdead_b_u64)
        );
        assert_eq!(Address::from(0x1fc0_u64).to_line(6), Address::from(0x7f_u64));
    }

    #[test]
    fn test_ops() {
        assert_eq!(Address::from(10_u64) + 5, Address::from(15_u64));
        assert_eq!(Address::from(100_u64) - 5, Address::from(95_u64));
    }
}
