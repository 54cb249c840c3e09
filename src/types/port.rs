//! Port numbers and port range specifications.
//!
//! `Port` is always in 1-65535. `PortSpec` is the textual form callers use
//! ("22,80,8000-9000") and expands to the raw candidate list the scanner
//! validates again on entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated TCP port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 65535;

    /// Create a new Port, returning None for 0.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Validate raw candidates into a sorted, duplicate-free port list.
    ///
    /// Fails on an empty candidate list or on any value outside 1-65535.
    pub fn collect_unique(candidates: &[u16]) -> Result<Vec<Self>, PortError> {
        if candidates.is_empty() {
            return Err(PortError::Empty);
        }

        let mut ports = candidates
            .iter()
            .map(|&raw| Self::try_from(raw))
            .collect::<Result<Vec<_>, _>>()?;
        ports.sort_unstable();
        ports.dedup();
        Ok(ports)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// An inclusive range of ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start > end {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// The whole TCP port space.
    pub const fn full() -> Self {
        Self {
            start: Port(Port::MIN),
            end: Port(Port::MAX),
        }
    }

    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// Always false; a valid range holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start.0..=self.end.0).contains(&port)
    }

    pub fn iter(&self) -> impl Iterator<Item = u16> {
        self.start.0..=self.end.0
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A port specification made of one or more ranges.
///
/// Supports "80", "80,443,8080", "1-1000" and mixes such as
/// "22,80,443,8000-9000".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// 1-65535.
    pub fn full() -> Self {
        Self {
            ranges: vec![PortRange::full()],
        }
    }

    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Expand into raw candidates, in specification order.
    ///
    /// Overlapping ranges yield repeated values; the scanner collapses them.
    pub fn candidates(&self) -> Vec<u16> {
        self.ranges.iter().flat_map(PortRange::iter).collect()
    }

    /// Number of distinct ports covered.
    pub fn count(&self) -> usize {
        let mut ports = self.candidates();
        ports.sort_unstable();
        ports.dedup();
        ports.len()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ranges.iter().any(|r| r.contains(port))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();
        for part in s.split(',').map(str::trim) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start = Port::try_from(parse_port_number(start)?)?;
                    let end = Port::try_from(parse_port_number(end)?)?;
                    spec.add_range(PortRange::new(start, end)?);
                }
                None => {
                    let port = Port::try_from(parse_port_number(part)?)?;
                    spec.add_port(port);
                }
            }
        }

        Ok(spec)
    }
}

fn parse_port_number(s: &str) -> Result<u16, PortError> {
    let s = s.trim();
    s.parse()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}
