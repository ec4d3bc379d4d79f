//! # Sweep
//!
//! Runs the latency probe once per candidate size, strictly in order and one size at a time, and
//! pairs each size with its average per-access latency.
use crate::access::{LatencyProbe, average_latency_ns};
use crate::error::Result;
use crate::format_size;
use log::info;
use std::time::Duration;

/// One measured point of a sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Working set size in bytes
    pub size: usize,
    /// Average nanoseconds per access
    pub latency_ns: f64,
}

impl Sample {
    pub fn new(size: usize, latency_ns: f64) -> Self {
        Sample { size, latency_ns }
    }
}

/// Samples in the same order as the sizes that produced them
pub type Series = Vec<Sample>;

/// Measure every size in `sizes` with `iterations` accesses each.
pub fn run_sweep<P: LatencyProbe + ?Sized>(
    probe: &mut P,
    sizes: &[usize],
    iterations: u64,
) -> Result<Series> {
    let mut series = Series::with_capacity(sizes.len());
    for &size in sizes {
        let elapsed = probe.measure(size, iterations)?;
        let latency_ns = average_latency_ns(elapsed, iterations);
        info!(
            "Size: {:>10} | elapsed: {:>12?} | {:.2} ns/access",
            format_size(size as u64),
            elapsed,
            latency_ns
        );
        series.push(Sample::new(size, latency_ns));
    }
    Ok(series)
}

/// Total time spent measuring a series, reconstructed from the averages
pub fn series_duration(series: &[Sample], iterations: u64) -> Duration {
    let nanos: f64 = series
        .iter()
        .map(|sample| sample.latency_ns * iterations as f64)
        .sum();
    Duration::from_nanos(nanos as u64)
}
