//! # Plot
//!
//! Renders sweep results to PNG images. Purely observational: the estimator hands finished data
//! over, nothing rendered here flows back into it.
use crate::config::PlotConfig;
use crate::error::{ProbeError, Result};
use crate::estimate::{Phase, PhaseResult};
use crate::stride::StrideSample;
use crate::sweep::Sample;
use crate::{format_latency, format_size};
use log::info;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::path::{Path, PathBuf};

/// How sizes map onto the horizontal axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeAxis {
    /// Axis position is `log2(size)`, for doubling sweeps
    Log2,
    /// Axis position is the size itself
    Linear,
}

impl SizeAxis {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Coarse => SizeAxis::Log2,
            Phase::Fine => SizeAxis::Linear,
        }
    }

    pub fn position(self, size: usize) -> f64 {
        match self {
            SizeAxis::Log2 => (size.max(1) as f64).log2(),
            SizeAxis::Linear => size as f64,
        }
    }
}

/// Image file a phase is rendered to, inside `dir`
pub fn phase_file(dir: &Path, phase: Phase) -> PathBuf {
    match phase {
        Phase::Coarse => dir.join("first.png"),
        Phase::Fine => dir.join("second.png"),
    }
}

/// Padded `(min, max)` of `values`, never an empty range
fn padded_range(values: impl Iterator<Item = f64>, floor_at_zero: bool) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let pad = if max > min { (max - min) * 0.05 } else { max.abs().max(1.0) * 0.1 };
    let lo = if floor_at_zero { 0.0 } else { min - pad };
    (lo, max + pad)
}

/// Horizontal pixels reserved per size label
const PIXELS_PER_LABEL: u32 = 80;

/// One tick per swept size, with a label on every n-th tick so at most `max_labels` are printed
pub fn size_ticks(sizes: &[usize], max_labels: usize) -> Vec<(usize, Option<String>)> {
    let every = sizes.len().div_ceil(max_labels.max(1)).max(1);
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| (size, (i % every == 0).then(|| format_size(size as u64))))
        .collect()
}

/// Render one sweep with size ticks at the swept `sizes`, marking any `markers` (label, size)
/// that fall inside the plotted range.
pub fn render_sweep(
    path: &Path,
    title: &str,
    sizes: &[usize],
    series: &[Sample],
    axis: SizeAxis,
    markers: &[(&str, usize)],
    size: (u32, u32),
) -> Result<()> {
    draw_sweep(path, title, sizes, series, axis, markers, size)
        .map_err(|e| ProbeError::plot(path, e))
}

fn draw_sweep(
    path: &Path,
    title: &str,
    sizes: &[usize],
    series: &[Sample],
    axis: SizeAxis,
    markers: &[(&str, usize)],
    size: (u32, u32),
) -> std::result::Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let points: Vec<(f64, f64)> = series
        .iter()
        .map(|s| (axis.position(s.size), s.latency_ns))
        .collect();
    let (x_min, x_max) = padded_range(
        sizes
            .iter()
            .chain(series.iter().map(|s| &s.size))
            .map(|&s| axis.position(s)),
        false,
    );
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1), true);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_axis()
        .disable_x_mesh()
        .y_desc("Average Time")
        .y_label_formatter(&|y| format_latency(*y))
        .draw()?;

    // Size axis ticks sit exactly on the swept sizes
    let label_style = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    let max_labels = (size.0 / PIXELS_PER_LABEL) as usize;
    for (bytes, label) in size_ticks(sizes, max_labels) {
        let x = axis.position(bytes);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x, y_min), (x, y_max)],
            BLACK.mix(0.1),
        )))?;
        let (px, py) = chart.backend_coord(&(x, y_min));
        root.draw(&PathElement::new(vec![(px, py), (px, py + 5)], BLACK))?;
        if let Some(label) = label {
            root.draw(&Text::new(label, (px, py + 8), label_style.clone()))?;
        }
    }
    let (center, bottom) = chart.backend_coord(&((x_min + x_max) / 2.0, y_min));
    root.draw(&Text::new("Array Size", (center, bottom + 28), label_style))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), BLUE.stroke_width(2)))?
        .label("average access time")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))?;

    for (i, &(label, bytes)) in markers.iter().enumerate() {
        let x = axis.position(bytes);
        if x < x_min || x > x_max {
            continue;
        }
        let color = Palette99::pick(i + 1).to_rgba();
        chart
            .draw_series(LineSeries::new(
                vec![(x, y_min), (x, y_max)],
                color.stroke_width(1),
            ))?
            .label(format!("reported {} ({})", label, format_size(bytes as u64)))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(1)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render a phase of the estimator to its standard file under `config.output_dir`.
pub fn render_phase(
    config: &PlotConfig,
    result: &PhaseResult,
    markers: &[(&str, usize)],
) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.output_dir)?;
    let path = phase_file(&config.output_dir, result.phase);
    let title = format!(
        "Average access time for different sized arrays ({} sweep)",
        result.phase
    );
    render_sweep(
        &path,
        &title,
        &result.sizes,
        &result.series,
        SizeAxis::for_phase(result.phase),
        markers,
        (config.width, config.height),
    )?;
    info!("Saved {} sweep plot to {}", result.phase, path.display());
    Ok(path)
}

/// Render a stride sweep: pass time against stride in elements.
pub fn render_stride(path: &Path, samples: &[StrideSample], size: (u32, u32)) -> Result<()> {
    draw_stride(path, samples, size).map_err(|e| ProbeError::plot(path, e))
}

fn draw_stride(
    path: &Path,
    samples: &[StrideSample],
    size: (u32, u32),
) -> std::result::Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let points: Vec<(f64, f64)> = samples
        .iter()
        .map(|s| (s.stride as f64, s.elapsed.as_nanos() as f64))
        .collect();
    let (x_min, x_max) = padded_range(points.iter().map(|p| p.0), false);
    let (y_min, y_max) = padded_range(points.iter().map(|p| p.1), true);

    let mut chart = ChartBuilder::on(&root)
        .caption("Cache lines measurement", ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Stride (elements)")
        .y_desc("Pass time")
        .y_label_formatter(&|y| format_latency(*y))
        .draw()?;

    chart.draw_series(LineSeries::new(points, &BLUE))?;

    root.present()?;
    Ok(())
}
