//! # Stride probe
//!
//! Estimates the cache line width. A large buffer of 32-bit integers is walked with increasing
//! strides, touching every k-th element. While the stride is within one line every line is still
//! fetched from memory and a pass costs roughly the same; once strides skip whole lines the pass
//! time starts to fall.
use crate::error::{ProbeError, Result};
use log::debug;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Default buffer length in elements (128 MiB of `i32`)
pub const DEFAULT_ELEMENTS: usize = 32 * 1024 * 1024;

/// Default largest stride, in elements
pub const DEFAULT_MAX_STRIDE: usize = 128;

/// A pass is considered cheaper once it drops below this fraction of the stride-1 time
const DROP_RATIO: f64 = 0.75;

/// Time of one strided pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrideSample {
    /// Stride in elements
    pub stride: usize,
    pub elapsed: Duration,
}

/// Time one pass for every stride in `1..=max_stride` over `elements` 32-bit integers.
pub fn stride_sweep(elements: usize, max_stride: usize) -> Result<Vec<StrideSample>> {
    let mut buffer: Vec<i32> = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| ProbeError::Allocation {
            bytes: elements.saturating_mul(std::mem::size_of::<i32>()),
        })?;
    buffer.resize(elements, 0);

    let mut samples = Vec::with_capacity(max_stride);
    for stride in 1..=max_stride {
        // reset
        buffer.fill(4);

        let start = Instant::now();
        for value in buffer.iter_mut().step_by(stride) {
            *value = value.wrapping_mul(3);
        }
        let elapsed = start.elapsed();
        black_box(&buffer);

        debug!("stride {:>3}: {:?}", stride, elapsed);
        samples.push(StrideSample { stride, elapsed });
    }
    Ok(samples)
}

/// Cache line width in bytes implied by a stride sweep, if the pass time ever drops.
pub fn cache_line_estimate(samples: &[StrideSample], element_width: usize) -> Option<usize> {
    let baseline = samples.first()?.elapsed.as_nanos() as f64;
    let drop = samples
        .iter()
        .position(|s| (s.elapsed.as_nanos() as f64) < baseline * DROP_RATIO)?;
    if drop == 0 {
        return None;
    }

    let bytes = samples[drop - 1].stride * element_width;
    // round down to a power of two
    Some(1 << bytes.ilog2())
}
