//! Candidate size sequences for the two sweeps.

/// First size of the coarse sweep
pub const COARSE_FLOOR: usize = 1024;

/// The coarse sweep stops at the first size reaching this ceiling
pub const COARSE_CEILING: usize = 64 * 1024 * 1024;

/// Number of sizes in the fine sweep
pub const LINEAR_STEPS: usize = 8;

/// Doubling sequence from `floor` up to and including the first term that reaches `ceiling`.
///
/// A `floor` of zero would never grow and yields an empty sequence.
pub fn geometric_sizes(floor: usize, ceiling: usize) -> Vec<usize> {
    if floor == 0 {
        return Vec::new();
    }

    let mut sizes = vec![floor];
    let mut size = floor;
    while size < ceiling {
        match size.checked_mul(2) {
            Some(next) => {
                size = next;
                sizes.push(size);
            }
            None => break,
        }
    }
    sizes
}

/// `steps` evenly spaced sizes starting at `lower`, stepping by `(upper - lower) / steps`.
///
/// The step is at least one byte so the sequence stays strictly increasing even when the
/// interval is narrower than `steps`.
pub fn linear_sizes(lower: usize, upper: usize, steps: usize) -> Vec<usize> {
    if steps == 0 {
        return Vec::new();
    }

    let step = (upper.saturating_sub(lower) / steps).max(1);
    (0..steps).map(|i| lower + i * step).collect()
}
