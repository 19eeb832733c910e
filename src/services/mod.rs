//! Simulation pipeline stages.
//!
//! Each stage is a pure function over the typed records in [`crate::models`]:
//! population sampling, sky-region derivation, the detection engine, the
//! probability-grid aggregation and the rate estimators. Orchestration across
//! stages (and across independent trials) lives in [`pipeline`].

pub mod detection;
pub mod pipeline;
pub mod population;
pub mod rates;
pub mod sky_regions;
pub mod statistics;

pub use detection::{detect_sources, DetectionOutcome};
pub use pipeline::{run_trial, run_trials, SimulationRun, TrialOutcome};
pub use population::generate_population;
pub use rates::{estimate_rates, RateBounds, RatePoint, RateSeries};
pub use sky_regions::{SkyRegion, SkyRegionCatalog};
pub use statistics::{aggregate_probability_grid, ProbabilityGrid, ProbabilityGridCell};
