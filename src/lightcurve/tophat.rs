use crate::lightcurve::{LimitCurve, SensitivityLimits};
use crate::models::observation::ObservationSchedule;

/// Flat emission at `charflux` during `[chartime, chartime + chardur]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tophat;

impl Tophat {
    /// `charflux` scaled by the duty cycle of the source within the window.
    pub fn integrated_flux(
        &self,
        charflux: f64,
        chartime: f64,
        chardur: f64,
        obs_start: f64,
        obs_end: f64,
    ) -> f64 {
        let window = obs_end - obs_start;
        if window <= 0.0 {
            return f64::INFINITY;
        }
        let on = chartime.max(obs_start);
        let off = (chartime + chardur).min(obs_end);
        charflux * (off - on).max(0.0) / window
    }

    /// A top-hat burst either fits inside the span/gap or it does not, so the
    /// design curves are vertical lines at those two durations.
    pub fn sensitivity_limits(
        &self,
        schedule: &ObservationSchedule,
        durations: &[f64],
    ) -> SensitivityLimits {
        SensitivityLimits {
            durations: durations.to_vec(),
            span: LimitCurve::Vertical(schedule.survey_span_days()),
            gap: LimitCurve::Vertical(schedule.max_gap()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_duty_cycle_recovers_charflux() {
        // source fully contains the observation window
        let flux = Tophat.integrated_flux(2.5, 0.0, 10.0, 3.0, 4.0);
        assert_eq!(flux, 2.5);
    }

    #[test]
    fn test_zero_overlap_is_exactly_zero() {
        assert_eq!(Tophat.integrated_flux(2.5, 0.0, 1.0, 5.0, 6.0), 0.0);
        assert_eq!(Tophat.integrated_flux(2.5, 10.0, 1.0, 5.0, 6.0), 0.0);
    }

    #[test]
    fn test_partial_overlap_scales_linearly() {
        // source covers half of the window
        let flux = Tophat.integrated_flux(4.0, 0.0, 1.0, 0.5, 2.5);
        assert!((flux - 4.0 * 0.5 / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_in_charflux() {
        let lo = Tophat.integrated_flux(1.0, 0.0, 1.0, 0.25, 0.75);
        let hi = Tophat.integrated_flux(2.0, 0.0, 1.0, 0.25, 0.75);
        assert!(hi >= lo);
    }

    #[test]
    fn test_degenerate_window_is_infinite() {
        assert!(Tophat.integrated_flux(1.0, 0.0, 1.0, 5.0, 5.0).is_infinite());
    }
}
