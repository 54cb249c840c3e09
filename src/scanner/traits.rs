//! Prober trait abstraction.
//!
//! A prober performs one connection attempt against one socket address.
//! The scanner owns everything around it: admission control, the per-probe
//! timeout, fault isolation and aggregation. Swapping the prober is how tests
//! stand in for a real target.

use crate::error::ProbeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The connection was established.
    Open,
    /// The target actively refused the connection.
    Closed,
    /// Anything else: timeout, unreachable, local I/O failure, faulted probe.
    Error(ProbeError),
}

impl ProbeOutcome {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
            Self::Error(e) => write!(f, "error ({})", e),
        }
    }
}

/// Per-outcome counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTally {
    pub probed: usize,
    pub open: usize,
    pub closed: usize,
    pub timed_out: usize,
    pub errored: usize,
}

impl ProbeTally {
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.probed += 1;
        match outcome {
            ProbeOutcome::Open => self.open += 1,
            ProbeOutcome::Closed => self.closed += 1,
            ProbeOutcome::Error(ProbeError::TimedOut) => self.timed_out += 1,
            ProbeOutcome::Error(_) => self.errored += 1,
        }
    }

    /// Ports that did not accept a connection, for whatever reason.
    pub fn not_open(&self) -> usize {
        self.closed + self.timed_out + self.errored
    }
}

/// Trait for single-port probe implementations.
///
/// Implementations must release every resource they acquire when the
/// returned future is dropped, since the scanner drops probes that exceed
/// their timeout or belong to a cancelled scan.
///
/// # Example
///
/// ```ignore
/// use reconscan::scanner::{Prober, ProbeOutcome};
///
/// struct AlwaysOpen;
///
/// #[async_trait::async_trait]
/// impl Prober for AlwaysOpen {
///     async fn probe(&self, _addr: SocketAddr) -> ProbeOutcome {
///         ProbeOutcome::Open
///     }
/// }
/// ```
#[async_trait]
pub trait Prober: Send + Sync {
    /// Attempt one connection to `addr`.
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome;
}

#[async_trait]
impl<P: Prober + ?Sized> Prober for std::sync::Arc<P> {
    async fn probe(&self, addr: SocketAddr) -> ProbeOutcome {
        (**self).probe(addr).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(ProbeOutcome::Open.to_string(), "open");
        assert_eq!(ProbeOutcome::Closed.to_string(), "closed");
        assert_eq!(
            ProbeOutcome::Error(ProbeError::TimedOut).to_string(),
            "error (connect timed out)"
        );
    }

    #[test]
    fn test_tally_record() {
        let mut tally = ProbeTally::default();
        tally.record(&ProbeOutcome::Open);
        tally.record(&ProbeOutcome::Closed);
        tally.record(&ProbeOutcome::Closed);
        tally.record(&ProbeOutcome::Error(ProbeError::TimedOut));
        tally.record(&ProbeOutcome::Error(ProbeError::Io("reset".to_string())));

        assert_eq!(tally.probed, 5);
        assert_eq!(tally.open, 1);
        assert_eq!(tally.closed, 2);
        assert_eq!(tally.timed_out, 1);
        assert_eq!(tally.errored, 1);
        assert_eq!(tally.not_open(), 4);
    }
}
