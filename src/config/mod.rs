//! Configuration management for reconscan.
//!
//! Settings come from an optional JSON file in the XDG config directory and
//! are overridden by command-line flags and `RECONSCAN_*` environment
//! variables.

mod settings;

pub use settings::{Paths, Settings};
