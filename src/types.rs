//! This module defines range-checked types for HL-G1 device addresses and
//! command payloads, so that a value which doesn't fit its wire field is
//! rejected before anything is transmitted.

use snafu::{ensure, OptionExt, Snafu};

use arrayvec::ArrayVec;
use core::convert::{TryFrom, TryInto};
use core::fmt;
use core::ops::{Deref, RangeInclusive};

/// Error type for this module
#[derive(Debug, PartialEq, Eq, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The value isn't a valid device id.
    #[snafu(display("Invalid address"))]
    InvalidAddress,
    /// The value doesn't fit in the payload field it is meant for.
    #[snafu(display("Value {} does not fit a {}-digit field", value, digits))]
    ValueOutOfRange { value: i64, digits: usize },
}

const fn invalid_address() -> InvalidAddressSnafu {
    InvalidAddressSnafu
}

/// Address is a range-checked [0, 99] integer, the device id of one sensor.
///
/// On the wire it is the command prefix `%NN#`.
///
/// ## Example
/// ```
/// use hlg1_proto::Address;
/// let addr = Address::new(1).unwrap();
/// assert_eq!(&addr.prefix(), b"%01#");
/// ```
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct Address(u8);

impl Address {
    /// Create a new address, checking that the address is in \[0, 99\].
    /// # Errors
    /// Returns [`Error::InvalidAddress`] if `address` is out of range.
    pub fn new(address: impl TryInto<u8>) -> Result<Self, Error> {
        let address = address.try_into().ok().with_context(invalid_address)?;
        ensure!(address <= 99, invalid_address());
        Ok(Self(address))
    }

    /// The two ASCII digits of the id.
    pub const fn to_bytes(self) -> [u8; 2] {
        [b'0' + self.0 / 10, b'0' + self.0 % 10]
    }

    /// The command-address prefix `%NN#` put in front of every command frame.
    pub const fn prefix(self) -> [u8; 4] {
        let id = self.to_bytes();
        [b'%', id[0], id[1], b'#']
    }
}

impl Default for Address {
    fn default() -> Self {
        Self(1)
    }
}

impl Deref for Address {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// Trait to convert `T: TryInto<u8>` into an [`Address`].
pub trait IntoAddress {
    /// Convert self to an Address.
    /// # Errors
    /// Returns `Error:InvalidAddress` if self isn't a valid address.
    fn into_address(self) -> Result<Address, Error>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address, Error> {
        Ok(self)
    }
}

impl<T> IntoAddress for T
where
    T: TryInto<u8>,
{
    fn into_address(self) -> Result<Address, Error> {
        Address::new(self)
    }
}

impl TryFrom<usize> for Address {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod address_tests {
    use super::Address;

    #[test]
    fn test_valid_addresses() {
        for n in 0..=99 {
            let a = Address::new(n).unwrap();
            assert_eq!(*a, n);
            let bytes = a.to_bytes();
            assert_eq!(bytes[0] - b'0', n / 10);
            assert_eq!(bytes[1] - b'0', n % 10);
        }
    }

    #[test]
    fn test_address() {
        let a05 = Address::new(5).unwrap();
        assert_eq!(&a05.prefix(), b"%05#");
        assert_eq!(a05.to_string(), "05");
        assert_eq!(Address::default(), Address::new(1).unwrap());

        assert!(Address::new(100).is_err());
        assert!(Address::new(-1).is_err());
    }
}

/// Sign character written in front of a command payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Sign {
    #[default]
    Plus,
    Minus,
}

impl Sign {
    /// Non-negative values are sent with `+`.
    pub const fn of(value: i64) -> Self {
        if value < 0 {
            Self::Minus
        } else {
            Self::Plus
        }
    }

    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Plus => b'+',
            Self::Minus => b'-',
        }
    }
}

/// Fixed-width ASCII digits of a payload field.
pub type DigitBytes<const N: usize> = ArrayVec<u8, N>;

fn zero_padded<const N: usize>(mut value: u32) -> DigitBytes<N> {
    let mut buf = DigitBytes::new();
    for _ in 0..N {
        buf.push(b'0' + (value % 10) as u8);
        value /= 10;
    }
    buf.reverse();
    buf
}

const U5_RANGE: RangeInclusive<u32> = 0..=99_999;

/// A non-negative payload, sent as exactly five zero-padded digits.
///
/// ```
/// use hlg1_proto::Unsigned5;
/// assert_eq!(Unsigned5::new(7u8).unwrap().to_bytes().as_slice(), b"00007");
/// assert!(Unsigned5::new(100_000).is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Unsigned5(u32);

impl Unsigned5 {
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if `value` needs more than five digits
    /// or is negative.
    pub fn new(value: impl TryInto<i64>) -> Result<Self, Error> {
        let value: i64 = value.try_into().ok().context(ValueOutOfRangeSnafu {
            value: i64::MAX,
            digits: 5usize,
        })?;
        let checked = u32::try_from(value)
            .ok()
            .filter(|v| U5_RANGE.contains(v))
            .context(ValueOutOfRangeSnafu {
                value,
                digits: 5usize,
            })?;
        Ok(Self(checked))
    }

    /// The five-digit, zero-padded wire form.
    pub fn to_bytes(self) -> DigitBytes<5> {
        zero_padded(self.0)
    }
}

impl From<bool> for Unsigned5 {
    fn from(on: bool) -> Self {
        Self(on.into())
    }
}

impl From<u16> for Unsigned5 {
    fn from(v: u16) -> Self {
        Self(v.into())
    }
}

impl From<u8> for Unsigned5 {
    fn from(v: u8) -> Self {
        Self(v.into())
    }
}

impl Deref for Unsigned5 {
    type Target = u32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const S7_MAX: i32 = 9_999_999;

/// A signed payload, sent as a sign character followed by seven zero-padded
/// digits of the magnitude. Used for thresholds and offsets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Signed7(i32);

impl Signed7 {
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if the magnitude needs more than
    /// seven digits.
    pub fn new(value: impl Into<i64>) -> Result<Self, Error> {
        let value: i64 = value.into();
        ensure!(
            (-i64::from(S7_MAX)..=i64::from(S7_MAX)).contains(&value),
            ValueOutOfRangeSnafu {
                value,
                digits: 7usize
            }
        );
        Ok(Self(value as i32))
    }

    pub const fn sign(self) -> Sign {
        Sign::of(self.0 as i64)
    }

    /// Seven zero-padded digits of the absolute value.
    pub fn magnitude_bytes(self) -> DigitBytes<7> {
        zero_padded(self.0.unsigned_abs())
    }
}

impl From<Signed7> for i32 {
    fn from(v: Signed7) -> Self {
        v.0
    }
}

impl Deref for Signed7 {
    type Target = i32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
