//! Last-Level Cache Size Estimation
//!
//! Times random accesses over arrays of increasing size and reports the size at which the average
//! access latency jumps. Optional first argument: path to a configuration file.

use llc_estimate_rs::access::RandomAccessProbe;
use llc_estimate_rs::config::ProbeConfig;
use llc_estimate_rs::estimate::estimate_llc_size;
use llc_estimate_rs::hwinfo::CacheReport;
use llc_estimate_rs::pinning::prepare_current_thread;
use llc_estimate_rs::plot::render_phase;
use llc_estimate_rs::{Result, format_size};
use log::{error, info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Seed from the wall clock, so consecutive runs sample different access patterns
fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ProbeConfig::load_from_file(path)?,
        None => ProbeConfig::load()?,
    };
    let params = config.estimator_params();
    params.validate()?;

    let report = CacheReport::collect();
    println!("{}", report);

    prepare_current_thread(config.pin_core, config.raise_priority);

    let seed = config.seed.unwrap_or_else(time_seed);
    info!("Random seed: {}", seed);
    let mut probe = RandomAccessProbe::new(ChaCha8Rng::seed_from_u64(seed));

    let estimate = estimate_llc_size(&mut probe, &params)?;

    if config.plot.enabled {
        let markers = report.markers();
        for phase in [&estimate.coarse, &estimate.fine] {
            if let Err(e) = render_phase(&config.plot, phase, &markers) {
                warn!("Skipping {} sweep plot: {}", phase.phase, e);
            }
        }
    }

    println!("Estimated LLC size: {}", format_size(estimate.size() as u64));
    if let Some((level, size)) = report.last_level() {
        println!("Reported {} size: {}", level, format_size(size as u64));
    }
    Ok(())
}

fn main() -> ExitCode {
    // progress lines belong on stdout next to the results
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
