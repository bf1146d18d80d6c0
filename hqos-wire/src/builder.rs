use std::net::Ipv4Addr;

use bytes::{Bytes, BytesMut};
use pnet::packet::{
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipv4::{self, MutableIpv4Packet},
    udp::{self, MutableUdpPacket},
};

use crate::{
    inspect::{IPV4_MIN_HEADER_LEN, UDP_HEADER_LEN},
    Dscp, QueueDiscItem,
};

/// Largest UDP payload that fits a single IPv4 datagram.
pub const MAX_UDP_PAYLOAD: usize = u16::MAX as usize - IPV4_MIN_HEADER_LEN - UDP_HEADER_LEN;

/// Builds raw IPv4 datagrams, the way a producing layer would hand them to traffic control.
///
/// Payloads larger than [`MAX_UDP_PAYLOAD`] are truncated.
#[derive(Debug, Clone)]
pub struct DatagramBuilder {
    source: Ipv4Addr,
    destination: Ipv4Addr,
    protocol: IpNextHeaderProtocol,
    source_port: u16,
    destination_port: u16,
    dscp: Dscp,
    ttl: u8,
    priority: u8,
    payload: Bytes,
}

impl Default for DatagramBuilder {
    fn default() -> Self {
        Self {
            source: Ipv4Addr::new(10, 0, 10, 1),
            destination: Ipv4Addr::new(10, 0, 5, 2),
            protocol: IpNextHeaderProtocols::Udp,
            source_port: 49_152,
            destination_port: 9,
            dscp: Dscp::DEFAULT,
            ttl: 64,
            priority: 0,
            payload: Bytes::new(),
        }
    }
}

impl DatagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A UDP datagram towards the given destination port.
    pub fn udp(destination_port: u16) -> Self {
        Self { destination_port, ..Self::default() }
    }

    pub fn with_source(mut self, source: Ipv4Addr) -> Self {
        self.source = source;
        self
    }

    pub fn with_destination(mut self, destination: Ipv4Addr) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_protocol(mut self, protocol: IpNextHeaderProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_source_port(mut self, port: u16) -> Self {
        self.source_port = port;
        self
    }

    pub fn with_destination_port(mut self, port: u16) -> Self {
        self.destination_port = port;
        self
    }

    pub fn with_dscp(mut self, dscp: Dscp) -> Self {
        self.dscp = dscp;
        self
    }

    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the socket priority carried by the resulting [`QueueDiscItem`].
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_UDP_PAYLOAD);
        self.payload = Bytes::copy_from_slice(&payload[..len]);
        self
    }

    /// Serializes the datagram, filling in lengths and checksums.
    pub fn build(&self) -> BytesMut {
        let is_udp = self.protocol == IpNextHeaderProtocols::Udp;
        let transport_len =
            if is_udp { UDP_HEADER_LEN + self.payload.len() } else { self.payload.len() };
        let total_len = IPV4_MIN_HEADER_LEN + transport_len;

        let mut buf = BytesMut::zeroed(total_len);
        let (header, rest) = buf.split_at_mut(IPV4_MIN_HEADER_LEN);

        if is_udp {
            let mut udp = MutableUdpPacket::new(rest).expect("buffer sized for the UDP header");
            udp.set_source(self.source_port);
            udp.set_destination(self.destination_port);
            udp.set_length(transport_len as u16);
            udp.set_payload(&self.payload);
            let checksum = udp::ipv4_checksum(&udp.to_immutable(), &self.source, &self.destination);
            udp.set_checksum(checksum);
        } else {
            rest.copy_from_slice(&self.payload);
        }

        let mut ip = MutableIpv4Packet::new(header).expect("buffer sized for the IPv4 header");
        ip.set_version(4);
        ip.set_header_length((IPV4_MIN_HEADER_LEN / 4) as u8);
        ip.set_dscp(self.dscp.value());
        ip.set_total_length(total_len as u16);
        ip.set_ttl(self.ttl);
        ip.set_next_level_protocol(self.protocol);
        ip.set_source(self.source);
        ip.set_destination(self.destination);
        let checksum = ipv4::checksum(&ip.to_immutable());
        ip.set_checksum(checksum);

        buf
    }

    /// Serializes the datagram and wraps it into a queue item.
    pub fn build_item(&self) -> QueueDiscItem {
        QueueDiscItem::new(self.build()).with_priority(self.priority)
    }
}
