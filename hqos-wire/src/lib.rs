#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Packet items as seen by the traffic-control layer, together with the IPv4/UDP
//! header inspection the queue disciplines rely on.

use thiserror::Error;

mod builder;
pub use builder::*;

mod dscp;
pub use dscp::Dscp;

pub mod inspect;
pub use inspect::{Headers, NetworkHeader, TransportHeader};

mod item;
pub use item::QueueDiscItem;

/// Reasons an item could not be interpreted as an IPv4 datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InspectError {
    #[error("not an IPv4 datagram (version {0})")]
    NotIpv4(u8),
    #[error("truncated network header: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("truncated UDP header: need {need} bytes, got {got}")]
    TruncatedTransport { need: usize, got: usize },
    #[error("invalid DSCP value: {0} (must be 0-63)")]
    InvalidDscp(u8),
}
