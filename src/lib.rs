pub mod access;
pub mod config;
pub mod error;
pub mod estimate;
pub mod hwinfo;
pub mod knee;
pub mod pinning;
pub mod plot;
pub mod sizes;
pub mod stride;
pub mod sweep;

pub use error::{ProbeError, Result};

/// Convert number of bytes to formatted string using IEC (1024-based) units
///
/// Counts below 1 KiB are printed as a bare integer, everything else with one decimal place.
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    format!("{:.1} {}iB", bytes as f64 / div as f64, PREFIXES[exp])
}

/// Convert a nanosecond count to a compact duration string (`12ns`, `1.5µs`, `3ms`)
pub fn format_latency(nanos: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e9, "s"), (1e6, "ms"), (1e3, "µs"), (1.0, "ns")];

    if nanos == 0.0 || !nanos.is_finite() {
        return "0s".to_string();
    }

    let magnitude = nanos.abs();
    let (scale, suffix) = UNITS
        .iter()
        .copied()
        .find(|(scale, _)| magnitude >= *scale)
        .unwrap_or((1.0, "ns"));

    let value = format!("{:.3}", nanos / scale);
    let value = value.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", value, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_below_one_kib_as_integer() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn formats_binary_prefixes_with_one_decimal() {
        assert_eq!(format_size(1024), "1.0 KiB");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(1024 * 1024), "1.0 MiB");
        assert_eq!(format_size(64 * 1024 * 1024), "64.0 MiB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024 / 2), "1.5 GiB");
        assert_eq!(format_size(1 << 40), "1.0 TiB");
        assert_eq!(format_size(1 << 50), "1.0 PiB");
        assert_eq!(format_size(1 << 60), "1.0 EiB");
        assert_eq!(format_size(u64::MAX), "16.0 EiB");
    }

    #[test]
    fn formats_latency_in_the_nearest_unit() {
        assert_eq!(format_latency(0.0), "0s");
        assert_eq!(format_latency(12.0), "12ns");
        assert_eq!(format_latency(2.25), "2.25ns");
        assert_eq!(format_latency(1500.0), "1.5µs");
        assert_eq!(format_latency(3_000_000.0), "3ms");
        assert_eq!(format_latency(2_500_000_000.0), "2.5s");
    }
}
