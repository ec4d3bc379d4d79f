//! Probe configuration: defaults, then `llc_estimate.toml`, then `LLC_*` environment variables.
//!
//! Nested keys use a double underscore in the environment, e.g. `LLC_PLOT__ENABLED=false` or
//! `LLC_FINE_ITERATIONS=67108864`.
use crate::error::Result;
use crate::estimate::EstimatorParams;
use crate::sizes::{COARSE_CEILING, COARSE_FLOOR, LINEAR_STEPS};
use ::config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file, looked up in the working directory
pub const CONFIG_FILE: &str = "llc_estimate.toml";

/// Main probe configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Accesses per size in the coarse sweep
    pub coarse_iterations: u64,
    /// Accesses per size in the fine sweep
    pub fine_iterations: u64,
    /// Sizes in the fine sweep
    pub linear_steps: usize,
    /// First coarse size in bytes
    pub coarse_floor: usize,
    /// Coarse sweep ends at the first size reaching this
    pub coarse_ceiling: usize,
    /// Fixed random seed, time-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// CPU core to pin the measuring thread to
    #[serde(default)]
    pub pin_core: Option<usize>,
    /// Run the measuring thread at maximum priority
    pub raise_priority: bool,
    /// Plot output
    pub plot: PlotConfig,
}

/// Plot rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let params = EstimatorParams::default();
        ProbeConfig {
            coarse_iterations: params.coarse_iterations,
            fine_iterations: params.fine_iterations,
            linear_steps: params.linear_steps,
            coarse_floor: params.coarse_floor,
            coarse_ceiling: params.coarse_ceiling,
            seed: None,
            pin_core: None,
            raise_priority: true,
            plot: PlotConfig::default(),
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            enabled: true,
            output_dir: PathBuf::from("."),
            width: 1200,
            height: 800,
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    let params = EstimatorParams::default();
    Ok(Config::builder()
        .set_default("coarse_iterations", params.coarse_iterations as i64)?
        .set_default("fine_iterations", params.fine_iterations as i64)?
        .set_default("linear_steps", LINEAR_STEPS as i64)?
        .set_default("coarse_floor", COARSE_FLOOR as i64)?
        .set_default("coarse_ceiling", COARSE_CEILING as i64)?
        .set_default("raise_priority", true)?
        .set_default("plot.enabled", true)?
        .set_default("plot.output_dir", ".")?
        .set_default("plot.width", 1200)?
        .set_default("plot.height", 800)?)
}

fn environment() -> Environment {
    Environment::with_prefix("LLC")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

impl ProbeConfig {
    /// Load configuration with precedence: defaults → `llc_estimate.toml` → env vars
    pub fn load() -> Result<Self> {
        let file = Path::new(CONFIG_FILE);
        Self::from_sources(file.exists().then_some(file), environment())
    }

    /// Load configuration from an explicit file, which must exist
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_sources(Some(path.as_ref()), environment())
    }

    /// Layer `file` (required when given) and then `env` over the defaults
    fn from_sources(file: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = defaults()?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Estimator tunables carried by this configuration
    pub fn estimator_params(&self) -> EstimatorParams {
        EstimatorParams {
            coarse_iterations: self.coarse_iterations,
            fine_iterations: self.fine_iterations,
            linear_steps: self.linear_steps,
            coarse_floor: self.coarse_floor,
            coarse_ceiling: self.coarse_ceiling,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.coarse_iterations, 16 * 1024 * 1024);
        assert_eq!(config.fine_iterations, 32 * 1024 * 1024);
        assert_eq!(config.linear_steps, 8);
        assert_eq!(config.seed, None);
        assert!(config.plot.enabled);
        assert_eq!(config.plot.output_dir, PathBuf::from("."));
        assert_eq!(config.estimator_params(), EstimatorParams::default());
    }

    #[test]
    fn test_defaults_round_trip_through_builder() {
        let config: ProbeConfig = defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config, ProbeConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!(
            "llc_estimate_test_{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "fine_iterations = 1000\nseed = 42\n\n[plot]\nenabled = false\noutput_dir = \"plots\""
        )
        .unwrap();
        drop(file);

        let config = ProbeConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.fine_iterations, 1000);
        assert_eq!(config.coarse_iterations, 16 * 1024 * 1024);
        assert_eq!(config.seed, Some(42));
        assert!(!config.plot.enabled);
        assert_eq!(config.plot.output_dir, PathBuf::from("plots"));
        assert_eq!(config.plot.width, 1200);
    }

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: ::config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    #[test]
    fn test_env_splits_prefix_and_nested_keys() {
        let config = ProbeConfig::from_sources(
            None,
            env(&[
                ("LLC_FINE_ITERATIONS", "1000"),
                ("LLC_PIN_CORE", "3"),
                ("LLC_PLOT__ENABLED", "false"),
                ("LLC_PLOT__WIDTH", "640"),
            ]),
        )
        .unwrap();

        assert_eq!(config.fine_iterations, 1000);
        assert_eq!(config.pin_core, Some(3));
        assert!(!config.plot.enabled);
        assert_eq!(config.plot.width, 640);
        assert_eq!(config.coarse_iterations, 16 * 1024 * 1024);
        assert_eq!(config.plot.height, 800);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = std::env::temp_dir().join(format!(
            "llc_estimate_env_test_{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "fine_iterations = 5000\ncoarse_iterations = 7000\n\n[plot]\nenabled = true\n",
        )
        .unwrap();

        let config = ProbeConfig::from_sources(
            Some(&path),
            env(&[
                ("LLC_FINE_ITERATIONS", "1000"),
                ("LLC_PLOT__ENABLED", "false"),
            ]),
        );
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.fine_iterations, 1000);
        assert!(!config.plot.enabled);
        // untouched by the environment, so the file value stands
        assert_eq!(config.coarse_iterations, 7000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = ProbeConfig::load_from_file("/nonexistent/llc_estimate.toml").unwrap_err();
        assert!(matches!(err, ProbeError::Config(_)));
    }
}
