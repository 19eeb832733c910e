//! Simulation configuration.
//!
//! Parameters are read from a TOML file into [`SimulationConfig`] and
//! validated fail-fast: no simulation work starts on an invalid
//! configuration, and validation failures are the only fatal errors in the
//! pipeline.

use crate::lightcurve::LightcurveKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration errors, reported before any simulation begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Type of transient not recognised: {0:?}. Use tophat, fred, gaussian, or sbpl")]
    UnknownLightcurve(String),
    #[error("Flux prior bounds must satisfy 0 < fl_min < fl_max (got {0} .. {1})")]
    InvalidFluxBounds(f64, f64),
    #[error("Duration prior bounds must satisfy 0 < dmin < dmax (got {0} .. {1})")]
    InvalidDurationBounds(f64, f64),
    #[error("n_sources must be positive")]
    NoSources,
    #[error("det_threshold must be positive (got {0})")]
    InvalidDetThreshold(f64),
    #[error("extra_threshold must be non-negative (got {0})")]
    InvalidExtraThreshold(f64),
    #[error("flux_err must be non-negative (got {0})")]
    InvalidFluxErr(f64),
    #[error("confidence must lie strictly between 0 and 1 (got {0})")]
    InvalidConfidence(f64),
    #[error("extract_radius must be positive (got {0})")]
    InvalidExtractRadius(f64),
    #[error("grid_dex must be positive (got {0})")]
    InvalidGridResolution(f64),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Transient population priors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    pub n_sources: usize,
    /// Flux prior bounds in Jy (log-uniform).
    pub fl_min: f64,
    pub fl_max: f64,
    /// Duration prior bounds in days (log-uniform).
    pub dmin: f64,
    pub dmax: f64,
    /// Pin every source to a single duration instead of drawing from the prior.
    #[serde(default)]
    pub burst_length: Option<f64>,
}

/// Detection thresholds and measurement-noise model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Primary detection threshold in sigma; observation sensitivities are
    /// scaled by this on ingest.
    pub det_threshold: f64,
    /// Secondary threshold margin, in sigma above `det_threshold`.
    pub extra_threshold: f64,
    /// Fractional calibration error on characteristic fluxes.
    pub flux_err: f64,
    /// Light-curve family key: tophat, fred, gaussian, or sbpl.
    pub lightcurve: String,
}

/// Smoothly-broken power-law parameters.
/// Defaults follow Mooley et al. 2018 (arXiv:1810.12927).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SbplConfig {
    #[serde(default = "default_alpha1")]
    pub alpha1: f64,
    #[serde(default = "default_alpha2")]
    pub alpha2: f64,
    /// Smoothness exponent: the sharpness parameter is `10^log_s`.
    #[serde(default = "default_log_s")]
    pub log_s: f64,
    /// Observing frequency in GHz.
    #[serde(default = "default_nu")]
    pub nu: f64,
    /// Reference frequency in GHz.
    #[serde(default = "default_nu")]
    pub nu0: f64,
    /// Spectral index.
    #[serde(default = "default_beta")]
    pub beta: f64,
}

fn default_alpha1() -> f64 {
    0.8
}
fn default_alpha2() -> f64 {
    -2.1
}
fn default_log_s() -> f64 {
    0.39
}
fn default_nu() -> f64 {
    3.0
}
fn default_beta() -> f64 {
    -0.61
}

impl Default for SbplConfig {
    fn default() -> Self {
        Self {
            alpha1: default_alpha1(),
            alpha2: default_alpha2(),
            log_s: default_log_s(),
            nu: default_nu(),
            nu0: default_nu(),
            beta: default_beta(),
        }
    }
}

/// Synthetic fixed-cadence campaign, used when no observation list is supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialModeConfig {
    pub nobs: usize,
    /// ISO-8601 start of the first observation.
    #[serde(default = "default_first_start")]
    pub first_start: String,
    pub interval_days: f64,
    pub duration_days: f64,
    /// Mean per-observation noise level in Jy (before threshold scaling).
    pub obs_sensitivity: f64,
    /// Standard deviation of the per-observation noise level.
    pub obs_sigma: f64,
    #[serde(default = "default_pointing_ra")]
    pub pointing_ra_deg: f64,
    #[serde(default = "default_pointing_dec")]
    pub pointing_dec_deg: f64,
    #[serde(default = "default_field_radius")]
    pub field_radius_deg: f64,
}

fn default_first_start() -> String {
    "2019-08-08T12:50:05.0".to_string()
}
fn default_pointing_ra() -> f64 {
    275.0913169
}
fn default_pointing_dec() -> f64 {
    7.185135679
}
fn default_field_radius() -> f64 {
    1.5
}

/// Probability-grid and rate-estimation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Confidence level for the Poisson rate bounds, in (0, 1).
    pub confidence: f64,
    /// Source-extraction radius in degrees; sets the per-region solid angle.
    pub extract_radius: f64,
    /// Number of real detections supplied by the survey.
    #[serde(default)]
    pub detections: u64,
    /// Minimum usable integration time in seconds (shortest rate timescale).
    #[serde(default = "default_min_integration")]
    pub min_integration_secs: f64,
    /// Probability-grid bin spacing in dex.
    #[serde(default = "default_grid_dex")]
    pub grid_dex: f64,
}

fn default_min_integration() -> f64 {
    600.0
}
fn default_grid_dex() -> f64 {
    0.05
}

/// Complete simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub detection: DetectionConfig,
    #[serde(default)]
    pub sbpl: SbplConfig,
    pub trial_mode: TrialModeConfig,
    pub statistics: StatisticsConfig,
    /// Master RNG seed; omitted means seeded from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of independent Monte-Carlo trials.
    #[serde(default = "default_trials")]
    pub trials: usize,
}

fn default_trials() -> usize {
    1
}

impl SimulationConfig {
    /// Parse and validate a TOML configuration string.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolved light-curve family. Fails on an unrecognized key.
    pub fn lightcurve_kind(&self) -> Result<LightcurveKind, ConfigError> {
        self.detection
            .lightcurve
            .parse()
            .map_err(|_| ConfigError::UnknownLightcurve(self.detection.lightcurve.clone()))
    }

    /// Validate every bound the simulation depends on. All failures are fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lightcurve_kind()?;
        let p = &self.population;
        if p.n_sources == 0 {
            return Err(ConfigError::NoSources);
        }
        if !(p.fl_min > 0.0 && p.fl_min < p.fl_max) {
            return Err(ConfigError::InvalidFluxBounds(p.fl_min, p.fl_max));
        }
        if !(p.dmin > 0.0 && p.dmin < p.dmax) {
            return Err(ConfigError::InvalidDurationBounds(p.dmin, p.dmax));
        }
        let d = &self.detection;
        if d.det_threshold <= 0.0 {
            return Err(ConfigError::InvalidDetThreshold(d.det_threshold));
        }
        if d.extra_threshold < 0.0 {
            return Err(ConfigError::InvalidExtraThreshold(d.extra_threshold));
        }
        if d.flux_err < 0.0 {
            return Err(ConfigError::InvalidFluxErr(d.flux_err));
        }
        let s = &self.statistics;
        if !(s.confidence > 0.0 && s.confidence < 1.0) {
            return Err(ConfigError::InvalidConfidence(s.confidence));
        }
        if s.extract_radius <= 0.0 {
            return Err(ConfigError::InvalidExtractRadius(s.extract_radius));
        }
        if s.grid_dex <= 0.0 {
            return Err(ConfigError::InvalidGridResolution(s.grid_dex));
        }
        Ok(())
    }
}
