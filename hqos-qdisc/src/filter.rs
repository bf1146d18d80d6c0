use std::fmt;

use hqos_wire::{Dscp, QueueDiscItem};

/// Classifies items into the bands of a classful discipline.
pub trait PacketFilter: fmt::Debug + Send {
    /// Returns the band for this item, or `None` if the filter doesn't match it. A parent
    /// ignores bands it doesn't have.
    fn classify(&self, item: &QueueDiscItem) -> Option<usize>;
}

/// Classifies by the DSCP value in the network header. Items with unreadable headers or
/// unmapped code points don't match.
#[derive(Clone, PartialEq, Eq)]
pub struct DscpFilter {
    bands: Vec<Option<usize>>,
}

impl DscpFilter {
    pub fn new() -> Self {
        Self { bands: vec![None; Dscp::MAX as usize + 1] }
    }

    /// Sends items marked with `dscp` to `band`.
    pub fn with_rule(mut self, dscp: Dscp, band: usize) -> Self {
        self.insert(dscp, band);
        self
    }

    pub fn insert(&mut self, dscp: Dscp, band: usize) {
        self.bands[dscp.value() as usize] = Some(band);
    }

    pub fn band_for(&self, dscp: Dscp) -> Option<usize> {
        self.bands.get(dscp.value() as usize).copied().flatten()
    }
}

impl Default for DscpFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DscpFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules = self
            .bands
            .iter()
            .enumerate()
            .filter_map(|(dscp, band)| band.map(|band| (dscp, band)));
        f.debug_map().entries(rules).finish()
    }
}

impl PacketFilter for DscpFilter {
    fn classify(&self, item: &QueueDiscItem) -> Option<usize> {
        self.band_for(item.dscp().ok()?)
    }
}
