use std::{fmt, str::FromStr};

use thiserror::Error;

/// The unit a queue capacity is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueSizeUnit {
    Packets,
    Bytes,
}

/// A queue capacity: a number of packets or a number of bytes.
///
/// The textual form is `<value><unit>`, with unit `p` (packets) or `B` (bytes) and an
/// optional `k`/`K` (10^3), `M` (10^6), `Ki` (2^10) or `Mi` (2^20) multiplier in between,
/// e.g. `"10024p"`, `"64KiB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueSize {
    unit: QueueSizeUnit,
    value: u32,
}

impl QueueSize {
    pub const fn new(unit: QueueSizeUnit, value: u32) -> Self {
        Self { unit, value }
    }

    pub const fn packets(value: u32) -> Self {
        Self::new(QueueSizeUnit::Packets, value)
    }

    pub const fn bytes(value: u32) -> Self {
        Self::new(QueueSizeUnit::Bytes, value)
    }

    #[inline]
    pub const fn unit(&self) -> QueueSizeUnit {
        self.unit
    }

    #[inline]
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// The occupancy measured in this size's unit.
    #[inline]
    fn occupancy(&self, packets: usize, bytes: usize) -> usize {
        match self.unit {
            QueueSizeUnit::Packets => packets,
            QueueSizeUnit::Bytes => bytes,
        }
    }

    /// Whether an occupancy of `packets`/`bytes` has reached this capacity.
    pub fn is_full(&self, packets: usize, bytes: usize) -> bool {
        self.occupancy(packets, bytes) >= self.value as usize
    }

    /// Whether an occupancy of `packets`/`bytes` stays within this capacity.
    pub fn holds(&self, packets: usize, bytes: usize) -> bool {
        self.occupancy(packets, bytes) <= self.value as usize
    }

    /// Whether an item of `item_bytes` fits on top of the given occupancy.
    pub fn admits(&self, packets: usize, bytes: usize, item_bytes: usize) -> bool {
        match self.unit {
            QueueSizeUnit::Packets => packets < self.value as usize,
            QueueSizeUnit::Bytes => bytes + item_bytes <= self.value as usize,
        }
    }

    /// Whether this capacity is at least `other`. Sizes in different units don't compare.
    pub fn covers(&self, other: &Self) -> Option<bool> {
        (self.unit == other.unit).then_some(self.value >= other.value)
    }
}

impl fmt::Display for QueueSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            QueueSizeUnit::Packets => write!(f, "{}p", self.value),
            QueueSizeUnit::Bytes => write!(f, "{}B", self.value),
        }
    }
}

/// A queue size string that isn't `<n>p` or `<n>B`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSizeError {
    #[error("queue size {0:?}: missing unit (expected `p` or `B`)")]
    MissingUnit(String),
    #[error("queue size {0:?}: unknown multiplier")]
    UnknownMultiplier(String),
    #[error("queue size {0:?}: invalid number")]
    InvalidNumber(String),
    #[error("queue size {0:?}: value does not fit in 32 bits")]
    Overflow(String),
}

impl FromStr for QueueSize {
    type Err = ParseSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (rest, unit) = if let Some(rest) = s.strip_suffix('p') {
            (rest, QueueSizeUnit::Packets)
        } else if let Some(rest) = s.strip_suffix('B') {
            (rest, QueueSizeUnit::Bytes)
        } else {
            return Err(ParseSizeError::MissingUnit(s.to_string()));
        };

        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (digits, multiplier) = rest.split_at(digits_end);

        let multiplier: u64 = match multiplier {
            "" => 1,
            "k" | "K" => 1_000,
            "M" => 1_000_000,
            "Ki" => 1 << 10,
            "Mi" => 1 << 20,
            _ => return Err(ParseSizeError::UnknownMultiplier(s.to_string())),
        };

        let value: u64 =
            digits.parse().map_err(|_| ParseSizeError::InvalidNumber(s.to_string()))?;
        let value = value
            .checked_mul(multiplier)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ParseSizeError::Overflow(s.to_string()))?;

        Ok(Self { unit, value })
    }
}
