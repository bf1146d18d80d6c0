//! Scenario files.
//!
//! A scenario is a JSON object describing the QoS setup of a node:
//!
//! ```json
//! {
//!     "Marking_Port": "8080 46 9090 46 10800 8 10900 16 11000 24",
//!     "Weights": "73 9 18",
//!     "MapQueue": "8 0 16 1 24 2",
//!     "QSD": "Wrr",
//!     "MaxSize": "10024p"
//! }
//! ```
//!
//! The scheduler built from it has two bands: EF traffic goes to a FIFO in band 0, code
//! points listed in `MapQueue` go to the weighted child in band 1, anything else follows the
//! priomap. Keys other than the ones above are ignored.

use std::path::{Path, PathBuf};

use hqos_qdisc::{
    ConfigError, DisciplineConfig, DscpFilter, DscpMap, FifoQueueDisc, MarkerQueueDisc,
    MarkingRules, Priomap, PrioQueueDisc, QueueDisc, QueueSize, Quanta, WdrrQueueDisc,
    WrrQueueDisc,
};
use hqos_wire::Dscp;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::Node;

mod parse;
pub use parse::{parse_dscp_map, parse_marking_rules, parse_quanta, ParseError, SchedulerKind};

/// Band of the priority scheduler that takes expedited traffic.
pub const EXPEDITED_BAND: usize = 0;

/// Band of the priority scheduler served by the weighted child.
pub const WEIGHTED_BAND: usize = 1;

/// Errors raised while loading a scenario or building its stages.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The QoS setup of a node, as read from a scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Port ranges and the DSCP value they are marked with.
    #[serde(rename = "Marking_Port", default, deserialize_with = "parse::marking_rules")]
    pub marking_rules: MarkingRules,
    /// Quanta of the weighted child.
    #[serde(rename = "Weights", default, deserialize_with = "parse::quanta")]
    pub quanta: Quanta,
    /// DSCP values handled by the weighted child, and their sub-bands.
    #[serde(rename = "MapQueue", default, deserialize_with = "parse::dscp_map")]
    pub dscp_map: DscpMap,
    /// Which discipline serves the weighted band.
    #[serde(rename = "QSD", deserialize_with = "parse::scheduler_kind")]
    pub scheduler: SchedulerKind,
    /// Capacity of the marker.
    #[serde(rename = "MaxSize", default, deserialize_with = "parse::queue_size")]
    pub max_size: Option<QueueSize>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(json)?;
        debug!(
            rules = scenario.marking_rules.len(),
            scheduler = %scenario.scheduler,
            quanta = ?scenario.quanta.as_slice(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|source| ScenarioError::Io { path: path.to_owned(), source })?;
        Self::from_json(&json)
    }

    /// The marking stage, not yet activated.
    pub fn marker(&self) -> MarkerQueueDisc {
        let mut config = DisciplineConfig::new();
        if let Some(max_size) = self.max_size {
            config = config.with_max_size(max_size);
        }

        MarkerQueueDisc::new(config, self.marking_rules.clone())
    }

    /// The child serving [`WEIGHTED_BAND`].
    pub fn weighted_child(&self) -> Box<dyn QueueDisc> {
        let quanta = self.quanta.clone();
        let map = self.dscp_map.clone();

        match self.scheduler {
            SchedulerKind::Fifo => Box::new(FifoQueueDisc::default()),
            SchedulerKind::Wrr => Box::new(WrrQueueDisc::new(DisciplineConfig::new(), quanta, map)),
            SchedulerKind::Wdrr => Box::new(WdrrQueueDisc::new(DisciplineConfig::new(), quanta, map)),
        }
    }

    /// The filter sending EF to [`EXPEDITED_BAND`] and mapped code points to
    /// [`WEIGHTED_BAND`].
    pub fn filter(&self) -> DscpFilter {
        let filter = self
            .dscp_map
            .iter()
            .fold(DscpFilter::new(), |filter, (dscp, _)| filter.with_rule(dscp, WEIGHTED_BAND));
        filter.with_rule(Dscp::EF, EXPEDITED_BAND)
    }

    /// The two-band priority scheduler, not yet activated.
    pub fn scheduler(&self) -> PrioQueueDisc {
        let config = DisciplineConfig::new()
            .with_class(FifoQueueDisc::default())
            .with_boxed_class(self.weighted_child())
            .with_filter(self.filter());

        PrioQueueDisc::new(config, Priomap::default())
    }

    /// Builds and activates both stages.
    pub fn node(&self) -> Result<Node, ScenarioError> {
        Ok(Node::new(self.marker(), self.scheduler())?)
    }
}
