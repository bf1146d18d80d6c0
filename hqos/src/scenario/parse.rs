//! Parsers for the space-separated parameter strings found in scenario files.

use std::{fmt, str::FromStr};

use hqos_qdisc::{DscpMap, MarkingRule, MarkingRules, Quanta};
use hqos_wire::{Dscp, InspectError};
use serde::{de, Deserialize, Deserializer};
use thiserror::Error;

/// A malformed parameter string.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid integer {token:?} in {what}")]
    Integer { what: &'static str, token: String },
    #[error("{what} needs (key, value) pairs, got an odd number of values")]
    OddPairs { what: &'static str },
    #[error(transparent)]
    Dscp(#[from] InspectError),
    #[error("unknown scheduler {0:?}, expected one of Fifo, Wrr, Wdrr")]
    UnknownScheduler(String),
}

fn number<T: FromStr>(what: &'static str, token: &str) -> Result<T, ParseError> {
    token.parse().map_err(|_| ParseError::Integer { what, token: token.to_owned() })
}

fn numbers<T: FromStr>(what: &'static str, s: &str) -> Result<Vec<T>, ParseError> {
    s.split_whitespace().map(|token| number(what, token)).collect()
}

/// Splits `s` into `(key, value)` pairs, parsing keys as `K` and values as `V`.
fn pairs<K: FromStr, V: FromStr>(what: &'static str, s: &str) -> Result<Vec<(K, V)>, ParseError> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ParseError::OddPairs { what });
    }

    tokens
        .chunks_exact(2)
        .map(|pair| -> Result<(K, V), ParseError> { Ok((number(what, pair[0])?, number(what, pair[1])?)) })
        .collect()
}

/// Parses `"<port> <dscp> <port> <dscp> ..."`, e.g. `"8080 46 8081 8"`.
pub fn parse_marking_rules(s: &str) -> Result<MarkingRules, ParseError> {
    pairs::<u16, u8>("marking rules", s)?
        .into_iter()
        .map(|(port, dscp)| -> Result<_, ParseError> { Ok(MarkingRule::new(port, Dscp::new(dscp)?)) })
        .collect()
}

/// Parses `"<quantum> <quantum> ..."`, e.g. `"9 1 1"`.
pub fn parse_quanta(s: &str) -> Result<Quanta, ParseError> {
    numbers("quanta", s).map(Quanta::new)
}

/// Parses `"<dscp> <sub-band> <dscp> <sub-band> ..."`, e.g. `"8 0 16 1 24 2"`.
pub fn parse_dscp_map(s: &str) -> Result<DscpMap, ParseError> {
    pairs::<u8, usize>("DSCP map", s)?
        .into_iter()
        .map(|(dscp, subband)| -> Result<_, ParseError> { Ok((Dscp::new(dscp)?, subband)) })
        .collect()
}

/// The child discipline of the weighted band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    Fifo,
    Wrr,
    Wdrr,
}

impl FromStr for SchedulerKind {
    type Err = ParseError;

    /// Accepts the bare name as well as a quoted one (`"\"Wrr\""`), which some scenario
    /// generators emit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_matches('"') {
            "Fifo" => Ok(Self::Fifo),
            "Wrr" => Ok(Self::Wrr),
            "Wdrr" => Ok(Self::Wdrr),
            other => Err(ParseError::UnknownScheduler(other.to_owned())),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fifo => "Fifo",
            Self::Wrr => "Wrr",
            Self::Wdrr => "Wdrr",
        })
    }
}

/// Deserializes a string field through `parse`.
fn with_parser<'de, D, T>(
    deserializer: D,
    parse: fn(&str) -> Result<T, ParseError>,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(de::Error::custom)
}

pub(super) fn marking_rules<'de, D: Deserializer<'de>>(d: D) -> Result<MarkingRules, D::Error> {
    with_parser(d, parse_marking_rules)
}

pub(super) fn quanta<'de, D: Deserializer<'de>>(d: D) -> Result<Quanta, D::Error> {
    with_parser(d, parse_quanta)
}

pub(super) fn dscp_map<'de, D: Deserializer<'de>>(d: D) -> Result<DscpMap, D::Error> {
    with_parser(d, parse_dscp_map)
}

pub(super) fn scheduler_kind<'de, D: Deserializer<'de>>(d: D) -> Result<SchedulerKind, D::Error> {
    with_parser(d, str::parse::<SchedulerKind>)
}

pub(super) fn queue_size<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<hqos_qdisc::QueueSize>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|s| s.parse::<hqos_qdisc::QueueSize>().map_err(de::Error::custom))
        .transpose()
}
