//! Integrated-flux light-curve families.
//!
//! Each family maps (characteristic flux, onset, duration, observation
//! window) to the window-averaged flux a survey would measure. The family is
//! selected once at configuration time and dispatched through the closed
//! [`LightcurveModel`] enum; unrecognized keys are rejected during
//! configuration validation, never here.
//!
//! Failure policy: a degenerate domain or non-convergent quadrature yields
//! `+inf` ("detectable at any sensitivity") for that source, never 0 and
//! never an error that aborts the run.

pub mod fred;
pub mod gaussian;
pub mod sbpl;
pub mod tophat;

pub use fred::Fred;
pub use gaussian::Gaussian;
pub use sbpl::Sbpl;
pub use tophat::Tophat;

use crate::config::SbplConfig;
use crate::models::observation::ObservationSchedule;
use crate::models::source::SimulatedSource;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which survey boundaries a transient must respect to be eligible for
/// detection in a window: a definite start edge, a definite end edge, both,
/// or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Emission has a definite start and end (top-hat).
    Both,
    /// Emission has a definite start but never truly ends (FRED, SBPL).
    StartOnly,
    /// Emission has a definite end but no sharp start.
    EndOnly,
    /// No sharp boundaries (Gaussian); every source is eligible everywhere.
    None,
}

impl EdgePolicy {
    /// Whether a source is a candidate for the window `[obs_start, obs_end]`.
    pub fn is_candidate(&self, source: &SimulatedSource, obs_start: f64, obs_end: f64) -> bool {
        match self {
            EdgePolicy::Both => {
                source.chartime + source.chardur > obs_start && source.chartime < obs_end
            }
            EdgePolicy::EndOnly => source.chartime > obs_start,
            EdgePolicy::StartOnly => source.chartime < obs_end,
            EdgePolicy::None => true,
        }
    }
}

/// String-keyed light-curve family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightcurveKind {
    Tophat,
    Fred,
    Gaussian,
    Sbpl,
}

impl FromStr for LightcurveKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tophat" => Ok(LightcurveKind::Tophat),
            "fred" => Ok(LightcurveKind::Fred),
            "gaussian" => Ok(LightcurveKind::Gaussian),
            "sbpl" => Ok(LightcurveKind::Sbpl),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LightcurveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LightcurveKind::Tophat => "tophat",
            LightcurveKind::Fred => "fred",
            LightcurveKind::Gaussian => "gaussian",
            LightcurveKind::Sbpl => "sbpl",
        };
        write!(f, "{name}")
    }
}

/// One arm of an inverse sensitivity-limit overlay: either a vertical line at
/// a fixed duration, or a flux floor per grid duration (`+inf` where always
/// undetectable at that arm's constraint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LimitCurve {
    Vertical(f64),
    Curve(Vec<f64>),
}

/// Diagnostic design curves: the flux floor below which a transient of a
/// given duration cannot be detected against the full survey span, and
/// against the largest inter-observation gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityLimits {
    pub durations: Vec<f64>,
    pub span: LimitCurve,
    pub gap: LimitCurve,
}

/// Closed tagged-variant dispatch over the four light-curve families.
#[derive(Debug, Clone)]
pub enum LightcurveModel {
    Tophat(Tophat),
    Fred(Fred),
    Gaussian(Gaussian),
    Sbpl(Sbpl),
}

impl LightcurveModel {
    /// Instantiate the selected family; SBPL takes its profile parameters
    /// from the configuration, the closed-form families need none.
    pub fn from_kind(kind: LightcurveKind, sbpl: &SbplConfig) -> Self {
        match kind {
            LightcurveKind::Tophat => LightcurveModel::Tophat(Tophat),
            LightcurveKind::Fred => LightcurveModel::Fred(Fred),
            LightcurveKind::Gaussian => LightcurveModel::Gaussian(Gaussian),
            LightcurveKind::Sbpl => LightcurveModel::Sbpl(Sbpl::new(*sbpl)),
        }
    }

    pub fn kind(&self) -> LightcurveKind {
        match self {
            LightcurveModel::Tophat(_) => LightcurveKind::Tophat,
            LightcurveModel::Fred(_) => LightcurveKind::Fred,
            LightcurveModel::Gaussian(_) => LightcurveKind::Gaussian,
            LightcurveModel::Sbpl(_) => LightcurveKind::Sbpl,
        }
    }

    pub fn edge_policy(&self) -> EdgePolicy {
        match self {
            LightcurveModel::Tophat(_) => EdgePolicy::Both,
            LightcurveModel::Fred(_) => EdgePolicy::StartOnly,
            LightcurveModel::Gaussian(_) => EdgePolicy::None,
            LightcurveModel::Sbpl(_) => EdgePolicy::StartOnly,
        }
    }

    /// Window-averaged flux observed in `[obs_start, obs_end]` for a source
    /// of characteristic flux `charflux` (Jy), onset `chartime` (MJD) and
    /// duration `chardur` (days). Always `>= 0`; `+inf` on degenerate domains.
    pub fn integrated_flux(
        &self,
        charflux: f64,
        chartime: f64,
        chardur: f64,
        obs_start: f64,
        obs_end: f64,
    ) -> f64 {
        match self {
            LightcurveModel::Tophat(m) => {
                m.integrated_flux(charflux, chartime, chardur, obs_start, obs_end)
            }
            LightcurveModel::Fred(m) => {
                m.integrated_flux(charflux, chartime, chardur, obs_start, obs_end)
            }
            LightcurveModel::Gaussian(m) => {
                m.integrated_flux(charflux, chartime, chardur, obs_start, obs_end)
            }
            LightcurveModel::Sbpl(m) => {
                m.integrated_flux(charflux, chartime, chardur, obs_start, obs_end)
            }
        }
    }

    /// The padded onset-sampling window for a source of duration `chardur`:
    /// sources may begin before the survey (all families) and, for families
    /// without a sharp start, end after it.
    pub fn onset_window(&self, survey_start: f64, survey_end: f64, chardur: f64) -> (f64, f64) {
        match self {
            LightcurveModel::Gaussian(_) => (survey_start - chardur, survey_end + chardur),
            _ => (survey_start - chardur, survey_end),
        }
    }

    /// Inverse design curves over a grid of trial durations (diagnostic
    /// overlays; detection itself never consults these).
    pub fn sensitivity_limits(
        &self,
        schedule: &ObservationSchedule,
        flux_err: f64,
        durations: &[f64],
    ) -> SensitivityLimits {
        match self {
            LightcurveModel::Tophat(m) => m.sensitivity_limits(schedule, durations),
            LightcurveModel::Fred(m) => m.sensitivity_limits(schedule, flux_err, durations),
            LightcurveModel::Gaussian(m) => m.sensitivity_limits(schedule, flux_err, durations),
            LightcurveModel::Sbpl(m) => m.sensitivity_limits(schedule, flux_err, durations),
        }
    }
}
