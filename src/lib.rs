//! # reconscan - bounded concurrent TCP port sweeping
//!
//! reconscan probes the TCP ports of a single host with a TCP connect per
//! port, runs many probes at once under a hard concurrency ceiling, and
//! reports which ports accepted a connection.
//!
//! ## Guarantees
//!
//! - Every requested port is probed exactly once; duplicates are collapsed.
//! - No more than `concurrency_limit` probes are ever in flight.
//! - Each probe is bounded by the per-probe timeout, so a silent host cannot
//!   stall the sweep.
//! - A failing or panicking probe only affects its own port.
//! - Open ports come back sorted ascending and free of duplicates.
//! - Cancellation stops dispatch, closes in-flight sockets and returns
//!   [`ScanError::Cancelled`] rather than a partial result.
//!
//! ## Example
//!
//! ```rust,ignore
//! use reconscan::{ScanOptions, Scanner};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reconscan::ScanError> {
//!     let options = ScanOptions::new()
//!         .with_concurrency_limit(500)
//!         .with_timeout(Duration::from_millis(300));
//!     let ports: Vec<u16> = (1..=1024).collect();
//!
//!     let result = Scanner::new(options).scan("127.0.0.1", &ports).await?;
//!     println!("open: {:?}", result.open_ports);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`scanner`] - the sweep engine and the [`Prober`] seam
//! - [`types`] - ports, port specs and targets
//! - [`banner`] - post-scan banner grabbing
//! - [`report`] - report model and persistence
//! - [`config`] - settings file and XDG paths
//! - [`output`] - plain, JSON and CSV rendering
//! - [`cli`] - the `reconscan` command line
//! - [`logging`] - tracing subscriber setup
//! - [`error`] - error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;
pub mod scanner;
pub mod types;

pub use error::{CliError, ProbeError, ScanError};
pub use scanner::{
    ProbeOutcome, ProbeTally, Prober, ScanOptions, ScanResult, Scanner, TcpConnectProber,
};
pub use types::{Port, PortRange, PortSpec, ScanTarget, TargetSpec};
