use bytes::{Bytes, BytesMut};

use crate::{
    inspect::{self, Headers},
    Dscp, InspectError,
};

/// A unit of traffic handed to a queue discipline: a raw IPv4 datagram plus the socket
/// priority the producing layer attached to it.
///
/// Items are moved, never shared. Whichever discipline currently holds an item owns it;
/// ownership passes downstream on dequeue, or back to the producer when the item is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDiscItem {
    packet: BytesMut,
    priority: u8,
}

impl QueueDiscItem {
    pub fn new(packet: BytesMut) -> Self {
        Self { packet, priority: 0 }
    }

    pub fn from_slice(packet: &[u8]) -> Self {
        Self::new(BytesMut::from(packet))
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// The socket priority, used to index the priomap.
    #[inline]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Total size of the datagram in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.packet.len()
    }

    #[inline]
    pub fn packet(&self) -> &[u8] {
        &self.packet
    }

    pub fn headers(&self) -> Result<Headers, InspectError> {
        inspect::inspect(&self.packet)
    }

    pub fn dscp(&self) -> Result<Dscp, InspectError> {
        self.headers().map(|headers| headers.network.dscp)
    }

    /// Rewrites the DSCP field of the datagram.
    pub fn set_dscp(&mut self, dscp: Dscp) -> Result<(), InspectError> {
        inspect::set_dscp(&mut self.packet, dscp)
    }

    pub fn into_packet(self) -> Bytes {
        self.packet.freeze()
    }
}
