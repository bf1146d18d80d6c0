use std::{fmt, str::FromStr};

use thiserror::Error;

/// Number of entries in a priomap.
pub const PRIOMAP_LEN: usize = 16;

/// Maps an item's priority to a band: `band = map[priority % 16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priomap([usize; PRIOMAP_LEN]);

impl Default for Priomap {
    /// The Linux `prio` map folded onto two bands: interactive priorities (6 and 7) go to
    /// band 0, everything else to band 1.
    fn default() -> Self {
        Self([1, 1, 1, 1, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1])
    }
}

impl Priomap {
    pub const fn new(bands: [usize; PRIOMAP_LEN]) -> Self {
        Self(bands)
    }

    /// A map sending every priority to `band`.
    pub const fn uniform(band: usize) -> Self {
        Self([band; PRIOMAP_LEN])
    }

    /// The band for items with the given priority.
    #[inline]
    pub const fn band_for(&self, priority: u8) -> usize {
        self.0[priority as usize % PRIOMAP_LEN]
    }

    /// Sets the band for `priority` (taken modulo 16).
    pub fn set_band(&mut self, priority: u8, band: usize) {
        self.0[priority as usize % PRIOMAP_LEN] = band;
    }

    pub fn with_band(mut self, priority: u8, band: usize) -> Self {
        self.set_band(priority, band);
        self
    }

    /// Highest band referenced by any entry.
    pub fn max_band(&self) -> usize {
        self.0.iter().copied().max().unwrap_or_default()
    }

    #[inline]
    pub const fn as_array(&self) -> &[usize; PRIOMAP_LEN] {
        &self.0
    }
}

impl From<[usize; PRIOMAP_LEN]> for Priomap {
    fn from(bands: [usize; PRIOMAP_LEN]) -> Self {
        Self(bands)
    }
}

impl fmt::Display for Priomap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, band) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{band}")?;
        }
        Ok(())
    }
}

/// A priomap string with the wrong number of entries or a bad band.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsePriomapError {
    #[error("priomap needs {PRIOMAP_LEN} entries, got {0}")]
    Length(usize),
    #[error("invalid band {0:?}")]
    Band(String),
}

impl FromStr for Priomap {
    type Err = ParsePriomapError;

    /// Parses 16 whitespace-separated band indices, e.g. `"1 2 2 2 1 2 0 0 1 1 1 1 1 1 1 1"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bands = s
            .split_whitespace()
            .map(|token| token.parse().map_err(|_| ParsePriomapError::Band(token.to_owned())))
            .collect::<Result<Vec<usize>, _>>()?;

        let bands: [usize; PRIOMAP_LEN] =
            bands.try_into().map_err(|bands: Vec<usize>| ParsePriomapError::Length(bands.len()))?;

        Ok(Self(bands))
    }
}
