//! Cache Line Width Measurement via Strided Access
//!
//! Walks a large buffer with strides of 1 to 128 elements and times each pass. Pass time stays
//! flat while every stride still touches every cache line, then falls off. The stride where the
//! fall-off starts gives the line width.

use llc_estimate_rs::config::ProbeConfig;
use llc_estimate_rs::pinning::prepare_current_thread;
use llc_estimate_rs::plot::render_stride;
use llc_estimate_rs::stride::{DEFAULT_ELEMENTS, DEFAULT_MAX_STRIDE, cache_line_estimate, stride_sweep};
use llc_estimate_rs::{ProbeError, format_latency};
use log::{error, warn};
use std::process::ExitCode;

// use faster/smaller `mimalloc` allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> ExitCode {
    // progress lines belong on stdout next to the results
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let config = match ProbeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    prepare_current_thread(config.pin_core, config.raise_priority);

    println!("Cache Line Width Measurement");
    println!("============================");
    println!("Method: strided multiply over {} i32 elements\n", DEFAULT_ELEMENTS);

    let samples = match stride_sweep(DEFAULT_ELEMENTS, DEFAULT_MAX_STRIDE) {
        Ok(samples) => samples,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("{:>8} {:>12} {:>10}", "Stride", "Pass time", "Relative");
    println!("{:-<8} {:-<12} {:-<10}", "", "", "");

    let baseline = samples[0].elapsed.as_nanos().max(1) as f64;
    let mut prev_ratio = 1.0f64;
    for sample in &samples {
        let nanos = sample.elapsed.as_nanos() as f64;
        let ratio = nanos / baseline;

        // Show drop indicator for significant pass time decreases
        let drop = if ratio < prev_ratio * 0.85 { " ←" } else { "" };

        println!(
            "{:>8} {:>12} {:>9.2}x{}",
            sample.stride,
            format_latency(nanos),
            ratio,
            drop
        );
        prev_ratio = ratio;
    }

    println!("\n← indicates significant pass time drop (stride skipping cache lines)");
    match cache_line_estimate(&samples, std::mem::size_of::<i32>()) {
        Some(line) => println!("\nEstimated cache line size: {} bytes", line),
        None => println!("\nNo pass time drop observed, cache line size undetermined"),
    }

    if config.plot.enabled {
        let path = config.plot.output_dir.join("caches.png");
        let size = (config.plot.width, config.plot.height);
        if let Err(e) = std::fs::create_dir_all(&config.plot.output_dir)
            .map_err(ProbeError::from)
            .and_then(|()| render_stride(&path, &samples, size))
        {
            warn!("Skipping stride plot: {}", e);
        }
    }

    ExitCode::SUCCESS
}
