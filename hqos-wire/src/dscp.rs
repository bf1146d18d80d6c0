use std::fmt;

use crate::InspectError;

/// A Differentiated Services Code Point: the upper six bits of the IPv4 TOS byte.
///
/// Construction validates the 6-bit range, so every `Dscp` can be written into a header
/// as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dscp(u8);

impl Dscp {
    /// Largest value that fits the 6-bit field.
    pub const MAX: u8 = 63;

    /// Default forwarding (best effort).
    pub const DEFAULT: Self = Self(0);
    pub const CS1: Self = Self(8);
    pub const AF11: Self = Self(10);
    pub const CS2: Self = Self(16);
    pub const AF21: Self = Self(18);
    pub const CS3: Self = Self(24);
    pub const AF31: Self = Self(26);
    pub const CS4: Self = Self(32);
    pub const AF41: Self = Self(34);
    pub const CS5: Self = Self(40);
    /// Expedited forwarding.
    pub const EF: Self = Self(46);
    pub const CS6: Self = Self(48);
    pub const CS7: Self = Self(56);

    /// Creates a code point, rejecting values that don't fit in 6 bits.
    pub const fn new(value: u8) -> Result<Self, InspectError> {
        if value > Self::MAX {
            return Err(InspectError::InvalidDscp(value));
        }

        Ok(Self(value))
    }

    /// Creates a code point from the lower six bits of `bits`.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MAX)
    }

    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Returns the well-known name of this code point, if it has one.
    pub const fn name(self) -> Option<&'static str> {
        Some(match self.0 {
            0 => "BE",
            8 => "CS1",
            10 => "AF11",
            16 => "CS2",
            18 => "AF21",
            24 => "CS3",
            26 => "AF31",
            32 => "CS4",
            34 => "AF41",
            40 => "CS5",
            46 => "EF",
            48 => "CS6",
            56 => "CS7",
            _ => return None,
        })
    }
}

impl TryFrom<u8> for Dscp {
    type Error = InspectError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Dscp> for u8 {
    fn from(dscp: Dscp) -> Self {
        dscp.0
    }
}

impl fmt::Display for Dscp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{}", self.0),
        }
    }
}
