//! Liveness checking for cached connections

mod probe;

#[cfg(test)]
mod tests;

pub use probe::{ProbeError, ProbeResult, probe_liveness};
