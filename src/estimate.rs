//! # Estimate
//!
//! Two-phase search for the last-level cache size. A coarse sweep doubles the working set from
//! `coarse_floor` until it reaches `coarse_ceiling` and locates the pair of sizes with the largest
//! latency jump. A fine sweep then walks that bracket linearly and locates the jump again at a
//! much finer resolution.
//!
//! The estimate is the fine-sweep size where the steepest rise *begins*, i.e. the largest size
//! still believed to fit in cache. The size right after the rise is kept alongside as
//! [`Estimate::first_miss_size`].
use crate::access::LatencyProbe;
use crate::error::{ProbeError, Result};
use crate::format_size;
use crate::knee::steepest_rise;
use crate::sizes::{COARSE_CEILING, COARSE_FLOOR, LINEAR_STEPS, geometric_sizes, linear_sizes};
use crate::sweep::{Series, run_sweep, series_duration};
use log::{debug, info};
use std::fmt;

/// Tunables of the two-phase search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorParams {
    /// Accesses per size in the coarse sweep
    pub coarse_iterations: u64,
    /// Accesses per size in the fine sweep
    pub fine_iterations: u64,
    /// Number of sizes in the fine sweep
    pub linear_steps: usize,
    /// First coarse size in bytes
    pub coarse_floor: usize,
    /// Coarse sweep stops at the first size reaching this
    pub coarse_ceiling: usize,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        EstimatorParams {
            coarse_iterations: 16 * 1024 * 1024,
            fine_iterations: 32 * 1024 * 1024,
            linear_steps: LINEAR_STEPS,
            coarse_floor: COARSE_FLOOR,
            coarse_ceiling: COARSE_CEILING,
        }
    }
}

impl EstimatorParams {
    /// Reject parameters that cannot produce two strictly increasing size sequences
    pub fn validate(&self) -> Result<()> {
        if self.coarse_iterations == 0 || self.fine_iterations == 0 {
            return Err(ProbeError::invalid_params("iteration counts must be positive"));
        }
        if self.linear_steps < 2 {
            return Err(ProbeError::invalid_params(format!(
                "linear_steps must be at least 2, got {}",
                self.linear_steps
            )));
        }
        if self.coarse_floor == 0 {
            return Err(ProbeError::invalid_params("coarse_floor must be positive"));
        }
        if self.coarse_ceiling <= self.coarse_floor {
            return Err(ProbeError::invalid_params(format!(
                "coarse_ceiling ({}) must exceed coarse_floor ({})",
                self.coarse_ceiling, self.coarse_floor
            )));
        }
        Ok(())
    }
}

/// Which sweep a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Coarse,
    Fine,
}

impl Phase {
    pub fn name(self) -> &'static str {
        match self {
            Phase::Coarse => "coarse",
            Phase::Fine => "fine",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sizes, measurements and detected knee of one sweep
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub phase: Phase,
    pub sizes: Vec<usize>,
    pub series: Series,
    /// Index of the sample right before the steepest rise, always `< series.len() - 1`
    pub knee: usize,
}

impl PhaseResult {
    /// Sizes on both sides of the steepest rise
    pub fn bracket(&self) -> (usize, usize) {
        (self.sizes[self.knee], self.sizes[self.knee + 1])
    }
}

/// Output of the two-phase search
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub coarse: PhaseResult,
    pub fine: PhaseResult,
}

impl Estimate {
    /// Largest size believed to still fit in the last-level cache
    pub fn size(&self) -> usize {
        self.fine.sizes[self.fine.knee]
    }

    /// First size past the steepest rise
    pub fn first_miss_size(&self) -> usize {
        self.fine.sizes[self.fine.knee + 1]
    }
}

/// Sweep `sizes` and locate the knee, refusing series too short to bracket one.
fn run_phase<P: LatencyProbe + ?Sized>(
    probe: &mut P,
    phase: Phase,
    sizes: Vec<usize>,
    iterations: u64,
) -> Result<PhaseResult> {
    info!(
        "Starting {} sweep over {} sizes ({} .. {}), {} accesses each",
        phase,
        sizes.len(),
        format_size(sizes.first().copied().unwrap_or_default() as u64),
        format_size(sizes.last().copied().unwrap_or_default() as u64),
        iterations
    );

    let series = run_sweep(probe, &sizes, iterations)?;
    if series.len() < 2 {
        return Err(ProbeError::DegenerateSweep {
            phase: phase.name(),
            samples: series.len(),
        });
    }
    debug!("{} sweep measured for {:?}", phase, series_duration(&series, iterations));

    // steepest_rise never returns the last index for a series of 2+ samples, clamp anyway so a
    // bracket always has an upper bound
    let knee = steepest_rise(&series).min(series.len() - 2);
    let result = PhaseResult {
        phase,
        sizes,
        series,
        knee,
    };

    let (lower, upper) = result.bracket();
    info!(
        "{} sweep: steepest rise between {} and {}",
        phase,
        format_size(lower as u64),
        format_size(upper as u64)
    );
    Ok(result)
}

/// Run both sweeps against `probe` and return the estimate along with the raw data.
pub fn estimate_llc_size<P: LatencyProbe + ?Sized>(
    probe: &mut P,
    params: &EstimatorParams,
) -> Result<Estimate> {
    params.validate()?;

    let coarse_sizes = geometric_sizes(params.coarse_floor, params.coarse_ceiling);
    let coarse = run_phase(probe, Phase::Coarse, coarse_sizes, params.coarse_iterations)?;

    let (lower, upper) = coarse.bracket();
    let fine_sizes = linear_sizes(lower, upper, params.linear_steps);
    let fine = run_phase(probe, Phase::Fine, fine_sizes, params.fine_iterations)?;

    Ok(Estimate { coarse, fine })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Flat latency below `cliff`, much slower at and above it
    struct CliffProbe {
        cliff: usize,
        sizes_seen: Vec<usize>,
    }

    impl CliffProbe {
        fn new(cliff: usize) -> Self {
            CliffProbe {
                cliff,
                sizes_seen: Vec::new(),
            }
        }
    }

    impl LatencyProbe for CliffProbe {
        fn measure(&mut self, size: usize, iterations: u64) -> Result<Duration> {
            self.sizes_seen.push(size);
            let per_access = if size < self.cliff { 2 } else { 80 };
            Ok(Duration::from_nanos(per_access * iterations))
        }
    }

    fn quick_params() -> EstimatorParams {
        EstimatorParams {
            coarse_iterations: 10,
            fine_iterations: 20,
            ..EstimatorParams::default()
        }
    }

    #[test]
    fn default_params_are_valid() {
        let params = EstimatorParams::default();
        params.validate().unwrap();
        assert_eq!(params.coarse_floor, 1024);
        assert_eq!(params.coarse_ceiling, 64 * 1024 * 1024);
        assert_eq!(params.linear_steps, 8);
        assert!(params.fine_iterations >= params.coarse_iterations);
    }

    #[test]
    fn validate_rejects_unusable_params() {
        let base = EstimatorParams::default();
        for params in [
            EstimatorParams {
                coarse_iterations: 0,
                ..base.clone()
            },
            EstimatorParams {
                fine_iterations: 0,
                ..base.clone()
            },
            EstimatorParams {
                linear_steps: 1,
                ..base.clone()
            },
            EstimatorParams {
                coarse_floor: 0,
                ..base.clone()
            },
            EstimatorParams {
                coarse_ceiling: 1024,
                ..base.clone()
            },
        ] {
            assert!(matches!(params.validate(), Err(ProbeError::InvalidParams(_))));
        }
    }

    #[test]
    fn brackets_then_refines_the_cliff() {
        let cliff = 6 * 1024 * 1024;
        let mut probe = CliffProbe::new(cliff);
        let estimate = estimate_llc_size(&mut probe, &quick_params()).unwrap();

        // 4 MiB fits, 8 MiB does not
        assert_eq!(estimate.coarse.bracket(), (4 << 20, 8 << 20));
        assert_eq!(estimate.coarse.sizes.len(), 17);

        // Fine sweep steps by 512 KiB from 4 MiB; 5.5 MiB is the last fast size
        assert_eq!(estimate.fine.sizes.len(), 8);
        assert_eq!(estimate.size(), 5632 * 1024);
        assert_eq!(estimate.first_miss_size(), cliff);
        assert_eq!(probe.sizes_seen.len(), 17 + 8);
    }

    #[test]
    fn estimate_reports_start_of_rise() {
        let mut probe = CliffProbe::new(3 * 1024 * 1024);
        let estimate = estimate_llc_size(&mut probe, &quick_params()).unwrap();
        assert_eq!(estimate.size(), estimate.fine.sizes[estimate.fine.knee]);
        assert_eq!(
            estimate.first_miss_size(),
            estimate.fine.sizes[estimate.fine.knee + 1]
        );
        assert!(estimate.size() < 3 * 1024 * 1024);
        assert!(estimate.first_miss_size() >= 3 * 1024 * 1024);
    }

    #[test]
    fn flat_curve_falls_back_to_the_smallest_sizes() {
        struct FlatProbe;
        impl LatencyProbe for FlatProbe {
            fn measure(&mut self, _size: usize, iterations: u64) -> Result<Duration> {
                Ok(Duration::from_nanos(5 * iterations))
            }
        }

        let estimate = estimate_llc_size(&mut FlatProbe, &quick_params()).unwrap();
        assert_eq!(estimate.coarse.knee, 0);
        assert_eq!(estimate.coarse.bracket(), (1024, 2048));
        assert_eq!(estimate.size(), 1024);
    }

    #[test]
    fn invalid_params_measure_nothing() {
        let mut probe = CliffProbe::new(1 << 20);
        let params = EstimatorParams {
            linear_steps: 0,
            ..quick_params()
        };
        assert!(estimate_llc_size(&mut probe, &params).is_err());
        assert!(probe.sizes_seen.is_empty());
    }

    /// Records every message logged at `Info` or above
    struct InfoRecorder {
        messages: Mutex<Vec<String>>,
    }

    impl log::Log for InfoRecorder {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.messages.lock().unwrap().push(record.args().to_string());
            }
        }

        fn flush(&self) {}
    }

    static RECORDER: InfoRecorder = InfoRecorder {
        messages: Mutex::new(Vec::new()),
    };

    #[test]
    fn final_estimate_is_left_to_the_caller_to_report() {
        if log::set_logger(&RECORDER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
        let mut probe = CliffProbe::new(6 * 1024 * 1024);
        estimate_llc_size(&mut probe, &quick_params()).unwrap();

        let messages = RECORDER.messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.starts_with("coarse sweep: steepest rise")));
        assert!(!messages.iter().any(|m| m.contains("Estimated LLC size")));
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::Coarse.to_string(), "coarse");
        assert_eq!(Phase::Fine.to_string(), "fine");
    }
}
