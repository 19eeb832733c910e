//! # transim
//!
//! Monte-Carlo detection simulation and occurrence-rate estimation for
//! intermittent radio transient surveys.
//!
//! Given an observing campaign (a list of observation windows, optionally with
//! sky pointings) and a light-curve family, the crate estimates the
//! probability that a transient of a given characteristic duration and flux
//! would have been detected, and converts detection counts (or their absence)
//! into an all-sky occurrence rate with Poisson confidence bounds.
//!
//! ## Architecture
//!
//! - [`config`]: TOML-backed simulation parameters with fail-fast validation
//! - [`models`]: typed records for observations, simulated sources, MJD time
//! - [`lightcurve`]: the four integrated-flux families (top-hat, FRED,
//!   Gaussian, smoothly-broken power law)
//! - [`services`]: the pipeline stages: population sampling, the detection engine,
//!   sky-region bookkeeping, probability grids and rate estimation
//!
//! ## Reproducibility
//!
//! All random draws go through an explicit seedable [`rand::rngs::StdRng`];
//! independent trials use derived seeds and may run concurrently
//! ([`services::pipeline::run_trials`]).

pub mod config;
pub mod lightcurve;
pub mod models;
pub mod services;

pub use config::{ConfigError, SimulationConfig};
pub use lightcurve::LightcurveModel;
pub use models::observation::{Observation, ObservationSchedule, Pointing};
pub use models::source::SimulatedSource;
pub use services::detection::DetectionOutcome;
pub use services::rates::RateSeries;
pub use services::sky_regions::SkyRegionCatalog;
pub use services::statistics::ProbabilityGrid;
