//! Knee detection: find where the latency curve climbs the most between neighbouring sizes.
use crate::sweep::Sample;

/// Index `i` of the sample right before the steepest rise, i.e. the pair `(i, i + 1)` with the
/// largest positive latency increase.
///
/// Ties keep the lowest index. A flat or falling series (and any series shorter than two samples)
/// yields 0. Size values are ignored, only the latency deltas matter.
pub fn steepest_rise(series: &[Sample]) -> usize {
    let mut max_rise = 0.0;
    let mut knee = 0;
    for (i, pair) in series.windows(2).enumerate() {
        let rise = pair[1].latency_ns - pair[0].latency_ns;
        if rise > max_rise {
            max_rise = rise;
            knee = i;
        }
    }
    knee
}
