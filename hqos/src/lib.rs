#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! DSCP marking and strict-priority scheduling for simulated forwarding nodes.
//!
//! Re-exports the packet layer ([`hqos_wire`]) and the queue disciplines ([`hqos_qdisc`]),
//! and adds the pieces a simulation wires them up with: [`Scenario`] files and the
//! two-stage [`Node`].

pub use hqos_qdisc::*;
pub use hqos_wire::*;

mod node;
pub use node::{Forwarded, Node};

pub mod scenario;
pub use scenario::{Scenario, ScenarioError};
