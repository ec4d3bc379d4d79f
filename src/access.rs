//! # Randomized access benchmark
//!
//! The measurement primitive. A buffer of cache-line sized elements is allocated for the requested
//! size, then hit at pseudo-random indices with a read-increment-write. Random indices defeat the
//! hardware prefetchers, and using one full line per element means every access lands in a
//! distinct cache line, so the average access time tracks where the working set lives in the
//! memory hierarchy.
use crate::error::{ProbeError, Result};
use rand::RngCore;
use std::hint::black_box;
use std::time::{Duration, Instant};

/// Width of one benchmark element, matching the common x86-64/aarch64 cache line
pub const LINE_WIDTH: usize = 64;

/// One buffer element, occupying (and aligned to) a whole cache line
#[derive(Clone, Copy, Default)]
#[repr(C, align(64))]
pub struct CacheLine {
    counter: u64,
    _pad: [u64; 7],
}

/// Number of elements that fit in `size` bytes. Never zero, so sub-line sizes still get one slot.
pub fn element_count(size: usize) -> usize {
    (size / std::mem::size_of::<CacheLine>()).max(1)
}

/// Anything that can time `iterations` accesses over a working set of `size` bytes.
///
/// The estimator only talks to this trait, so synthetic latency curves can stand in for the
/// hardware in tests.
pub trait LatencyProbe {
    fn measure(&mut self, size: usize, iterations: u64) -> Result<Duration>;
}

/// The real probe: random read-increment-write accesses driven by an explicit generator
pub struct RandomAccessProbe<R: RngCore> {
    rng: R,
}

impl<R: RngCore> RandomAccessProbe<R> {
    pub fn new(rng: R) -> Self {
        RandomAccessProbe { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl<R: RngCore> LatencyProbe for RandomAccessProbe<R> {
    fn measure(&mut self, size: usize, iterations: u64) -> Result<Duration> {
        random_access(size, iterations, &mut self.rng)
    }
}

/// Allocate a buffer of `size` bytes and time `iterations` random read-increment-write accesses.
///
/// The buffer is dropped before returning, so nothing is retained across sizes.
#[inline(never)]
pub fn random_access<R: RngCore + ?Sized>(
    size: usize,
    iterations: u64,
    rng: &mut R,
) -> Result<Duration> {
    let len = element_count(size);
    let mut buffer: Vec<CacheLine> = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| ProbeError::Allocation {
            bytes: len * std::mem::size_of::<CacheLine>(),
        })?;
    // Touch every line up front so page faults are not billed to the timed loop
    buffer.resize(len, CacheLine::default());

    let start = Instant::now();
    for _ in 0..iterations {
        let idx = (rng.next_u64() % len as u64) as usize;
        buffer[idx].counter = buffer[idx].counter.wrapping_add(1);
    }
    let elapsed = start.elapsed();

    // Prevent dead code elimination
    black_box(&buffer);

    Ok(elapsed)
}

/// Average nanoseconds per access for a measured run
pub fn average_latency_ns(elapsed: Duration, iterations: u64) -> f64 {
    if iterations == 0 {
        return 0.0;
    }
    elapsed.as_nanos() as f64 / iterations as f64
}
