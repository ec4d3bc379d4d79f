//! Reported cache topology and CPU identification, for display only. Nothing here feeds back
//! into the estimate.
use crate::format_size;
use std::fmt;

/// What the hardware says about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheReport {
    pub cpu_brand: String,
    pub logical_cpus: usize,
    pub physical_cores: Option<usize>,
    pub cache_line: Option<usize>,
    pub l1d: Option<usize>,
    pub l2: Option<usize>,
    pub l3: Option<usize>,
}

impl CacheReport {
    pub fn collect() -> Self {
        use sysinfo::System;

        let sys = System::new_all();
        let cpu_brand = sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        CacheReport {
            cpu_brand,
            logical_cpus: sys.cpus().len(),
            physical_cores: sys.physical_core_count(),
            cache_line: cache_size::l1_cache_line_size(),
            l1d: cache_size::l1_cache_size(),
            l2: cache_size::l2_cache_size(),
            l3: cache_size::l3_cache_size(),
        }
    }

    /// Labeled reported sizes worth marking on a size axis, smallest first
    pub fn markers(&self) -> Vec<(&'static str, usize)> {
        [("L1d", self.l1d), ("L2", self.l2), ("L3", self.l3)]
            .into_iter()
            .filter_map(|(label, size)| size.map(|size| (label, size)))
            .collect()
    }

    /// The largest reported cache, if any level is known
    pub fn last_level(&self) -> Option<(&'static str, usize)> {
        self.markers().into_iter().last()
    }
}

fn size_or_unknown(size: Option<usize>) -> String {
    size.map(|s| format_size(s as u64))
        .unwrap_or_else(|| "unknown".to_string())
}

impl fmt::Display for CacheReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cores = self
            .physical_cores
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let line = self
            .cache_line
            .map(|l| format!("{} bytes", l))
            .unwrap_or_else(|| "unknown".to_string());

        writeln!(f, "CPU: {}", self.cpu_brand)?;
        writeln!(f, "Cores: {} physical, {} logical", cores, self.logical_cpus)?;
        writeln!(f, "Cache Line Size: {}", line)?;
        writeln!(f, "L1d Cache: {}", size_or_unknown(self.l1d))?;
        writeln!(f, "L2 Cache: {}", size_or_unknown(self.l2))?;
        write!(f, "L3 Cache: {}", size_or_unknown(self.l3))
    }
}
