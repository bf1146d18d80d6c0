//! IPv4 / UDP header inspection.
//!
//! The marking stage needs the network header (for the DSCP field) and, for UDP traffic,
//! the destination port. Parsing goes through `pnet` packet views over the raw datagram;
//! nothing is copied out of the buffer beyond the fields listed here.

use std::net::Ipv4Addr;

pub use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};
use pnet::packet::{
    ipv4::{self, Ipv4Packet, MutableIpv4Packet},
    udp::UdpPacket,
};

use crate::{Dscp, InspectError};

/// Length of an IPv4 header without options.
pub const IPV4_MIN_HEADER_LEN: usize = 20;

/// Length of a UDP header.
pub const UDP_HEADER_LEN: usize = 8;

/// The fields of the IPv4 header relevant to traffic control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkHeader {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub protocol: IpNextHeaderProtocol,
    pub dscp: Dscp,
    pub ecn: u8,
    pub ttl: u8,
    /// Header length in bytes, options included.
    pub header_len: usize,
    /// Value of the total length field.
    pub total_len: usize,
}

/// UDP ports and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHeader {
    pub source_port: u16,
    pub destination_port: u16,
    pub length: u16,
}

/// Parsed headers of a datagram. The transport header is only present for UDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headers {
    pub network: NetworkHeader,
    pub transport: Option<TransportHeader>,
}

impl Headers {
    #[inline]
    pub fn destination_port(&self) -> Option<u16> {
        self.transport.map(|udp| udp.destination_port)
    }

    #[inline]
    pub fn is_udp(&self) -> bool {
        self.network.protocol == IpNextHeaderProtocols::Udp
    }

    /// Bytes carried after the network and transport headers.
    pub fn payload_len(&self) -> usize {
        let transport_len = if self.transport.is_some() { UDP_HEADER_LEN } else { 0 };
        self.network.total_len.saturating_sub(self.network.header_len + transport_len)
    }
}

/// Parses the network header and, if the protocol is UDP, the transport header.
///
/// ## Errors
/// - The buffer does not start with an IPv4 header
/// - The IPv4 header (options included) is cut short
/// - The protocol is UDP but fewer than 8 bytes follow the network header
pub fn inspect(buf: &[u8]) -> Result<Headers, InspectError> {
    let version = match buf.first() {
        Some(byte) => byte >> 4,
        None => return Err(InspectError::Truncated { need: IPV4_MIN_HEADER_LEN, got: 0 }),
    };
    if version != 4 {
        return Err(InspectError::NotIpv4(version));
    }

    let ip = Ipv4Packet::new(buf)
        .ok_or(InspectError::Truncated { need: IPV4_MIN_HEADER_LEN, got: buf.len() })?;

    let header_len = ip.get_header_length() as usize * 4;
    if header_len < IPV4_MIN_HEADER_LEN || header_len > buf.len() {
        return Err(InspectError::Truncated { need: header_len.max(IPV4_MIN_HEADER_LEN), got: buf.len() });
    }

    let protocol = ip.get_next_level_protocol();
    let network = NetworkHeader {
        source: ip.get_source(),
        destination: ip.get_destination(),
        protocol,
        dscp: Dscp::new(ip.get_dscp())?,
        ecn: ip.get_ecn(),
        ttl: ip.get_ttl(),
        header_len,
        total_len: ip.get_total_length() as usize,
    };

    let transport = if protocol == IpNextHeaderProtocols::Udp {
        let rest = &buf[header_len..];
        let udp = UdpPacket::new(rest)
            .ok_or(InspectError::TruncatedTransport { need: UDP_HEADER_LEN, got: rest.len() })?;

        Some(TransportHeader {
            source_port: udp.get_source(),
            destination_port: udp.get_destination(),
            length: udp.get_length(),
        })
    } else {
        None
    };

    Ok(Headers { network, transport })
}

/// Rewrites the DSCP field in place and refreshes the header checksum. The ECN bits are
/// left untouched.
pub fn set_dscp(buf: &mut [u8], dscp: Dscp) -> Result<(), InspectError> {
    let got = buf.len();
    let mut ip = MutableIpv4Packet::new(buf)
        .ok_or(InspectError::Truncated { need: IPV4_MIN_HEADER_LEN, got })?;

    ip.set_dscp(dscp.value());
    let checksum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(checksum);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatagramBuilder;

    #[test]
    fn inspect_udp() {
        let datagram = DatagramBuilder::udp(8080).with_payload(&[0u8; 100]).build();
        let headers = inspect(&datagram).unwrap();

        assert!(headers.is_udp());
        assert_eq!(headers.destination_port(), Some(8080));
        assert_eq!(headers.network.header_len, IPV4_MIN_HEADER_LEN);
        assert_eq!(headers.network.total_len, 128);
        assert_eq!(headers.payload_len(), 100);
    }

    #[test]
    fn inspect_non_udp_has_no_transport() {
        let datagram = DatagramBuilder::new()
            .with_protocol(IpNextHeaderProtocols::Tcp)
            .with_payload(&[0u8; 20])
            .build();
        let headers = inspect(&datagram).unwrap();

        assert!(!headers.is_udp());
        assert_eq!(headers.destination_port(), None);
    }

    #[test]
    fn inspect_rejects_garbage() {
        assert_eq!(inspect(&[]), Err(InspectError::Truncated { need: 20, got: 0 }));
        assert_eq!(inspect(&[0x60; 40]), Err(InspectError::NotIpv4(6)));
        assert_eq!(inspect(&[0x45; 10]), Err(InspectError::Truncated { need: 20, got: 10 }));

        // Valid IPv4 header announcing UDP, but the UDP header is cut short.
        let datagram = DatagramBuilder::udp(9000).build();
        assert_eq!(
            inspect(&datagram[..24]),
            Err(InspectError::TruncatedTransport { need: UDP_HEADER_LEN, got: 4 })
        );
    }

    #[test]
    fn set_dscp_keeps_checksum_valid() {
        let mut datagram = DatagramBuilder::udp(8080).with_dscp(Dscp::CS1).build();

        set_dscp(&mut datagram, Dscp::EF).unwrap();

        let ip = Ipv4Packet::new(&datagram).unwrap();
        assert_eq!(ip.get_dscp(), 46);
        assert_eq!(ip.get_checksum(), ipv4::checksum(&ip));
        assert_eq!(inspect(&datagram).unwrap().network.dscp, Dscp::EF);
    }
}
