//! Quiet the scheduler around the measuring thread: pin it to one core so it keeps its caches,
//! and raise its priority so it is preempted less often. Both are best effort.
use log::{debug, warn};

/// Outcome of [`prepare_current_thread`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThreadSetup {
    pub pinned_core: Option<usize>,
    pub max_priority: bool,
}

/// Optionally pin the calling thread to `core` and raise it to maximum priority.
///
/// Failures only log a warning, measurement still works without either.
pub fn prepare_current_thread(core: Option<usize>, raise_priority: bool) -> ThreadSetup {
    let mut setup = ThreadSetup::default();

    if let Some(cpu_num) = core {
        let core_id = core_affinity::CoreId { id: cpu_num };
        if !is_pinnable(cpu_num) {
            warn!(
                "Not pinning measuring thread: CPU core {} is not in the affinity mask {:?}",
                cpu_num,
                pinnable_cores()
            );
        } else if core_affinity::set_for_current(core_id) {
            debug!("Pinned measuring thread to CPU core {}", cpu_num);
            setup.pinned_core = Some(cpu_num);
        } else {
            warn!(
                "Couldn't pin measuring thread to CPU core {} (NOTE: this is expected on macOS)",
                cpu_num
            );
        }
    }

    if raise_priority {
        if thread_priority::set_current_thread_priority(thread_priority::ThreadPriority::Max)
            .is_err()
        {
            warn!("Couldn't set measuring thread to maximum priority");
        } else {
            setup.max_priority = true;
        }
    }

    setup
}

/// IDs of the cores the calling process may be pinned to. These are the CPU numbers of the
/// affinity mask, not `0..count` (e.g. `[4, 5, 6, 7]` under `taskset -c 4-7`).
pub fn pinnable_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .map(|ids| ids.into_iter().map(|core| core.id).collect())
        .unwrap_or_default()
}

/// Whether `cpu_num` is one of [`pinnable_cores`]
pub fn is_pinnable(cpu_num: usize) -> bool {
    mask_contains(&pinnable_cores(), cpu_num)
}

fn mask_contains(mask: &[usize], cpu_num: usize) -> bool {
    mask.contains(&cpu_num)
}
