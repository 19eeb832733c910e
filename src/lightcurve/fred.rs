use crate::lightcurve::{LimitCurve, SensitivityLimits};
use crate::models::observation::ObservationSchedule;

/// Denominators below this are treated as total non-detection in the design
/// curves (the exponential tail has underflowed).
const UNDERFLOW_FLOOR: f64 = 1e-50;

/// Fast-rise exponential-decay: instantaneous onset at `chartime`, then
/// `charflux * exp(-(t - chartime)/chardur)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fred;

impl Fred {
    /// Closed-form definite integral of the decay over the window, normalized
    /// by window length. `chardur -> 0` is delta-like and reported as `+inf`.
    pub fn integrated_flux(
        &self,
        charflux: f64,
        chartime: f64,
        chardur: f64,
        obs_start: f64,
        obs_end: f64,
    ) -> f64 {
        let window = obs_end - obs_start;
        if window <= 0.0 || chardur <= 0.0 {
            return f64::INFINITY;
        }
        if chartime >= obs_end {
            // emission has not started by the end of the window
            return 0.0;
        }
        // elapsed emission time at the window bounds
        let t_lo = chartime.max(obs_start) - chartime;
        let t_hi = obs_end - chartime;
        let flux =
            charflux * chardur * ((-t_lo / chardur).exp() - (-t_hi / chardur).exp()) / window;
        if flux.is_finite() {
            flux.max(0.0)
        } else {
            f64::INFINITY
        }
    }

    pub fn sensitivity_limits(
        &self,
        schedule: &ObservationSchedule,
        flux_err: f64,
        durations: &[f64],
    ) -> SensitivityLimits {
        let durmax = schedule.survey_span_days();
        let day1 = schedule.first_duration();
        let max_gap = schedule.max_gap();
        let sens_last = schedule.last_sensitivity();
        let sens_gap = schedule.sensitivity_after_max_gap();

        let span = durations
            .iter()
            .map(|&x| {
                let denom = (-(durmax - day1 + x) / x).exp() - (-(durmax + x) / x).exp();
                if denom > UNDERFLOW_FLOOR {
                    (1.0 + flux_err) * sens_last * day1 / x / denom
                } else {
                    f64::INFINITY
                }
            })
            .collect();
        let gap = durations
            .iter()
            .map(|&x| {
                let denom = (-max_gap / x).exp() - (-(max_gap + day1) / x).exp();
                if denom > UNDERFLOW_FLOOR {
                    (1.0 + flux_err) * sens_gap * day1 / x / denom
                } else {
                    f64::INFINITY
                }
            })
            .collect();

        SensitivityLimits {
            durations: durations.to_vec(),
            span: LimitCurve::Curve(span),
            gap: LimitCurve::Curve(gap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_onset_after_window_is_exactly_zero() {
        assert_eq!(Fred.integrated_flux(3.0, 10.0, 1.0, 4.0, 6.0), 0.0);
    }

    #[test]
    fn test_onset_at_window_start_full_decay() {
        // integral of exp(-t/tau) over [0, w] is tau * (1 - exp(-w/tau))
        let (tau, w) = (2.0, 1.0);
        let flux = Fred.integrated_flux(1.0, 0.0, tau, 0.0, w);
        let expected = tau * (1.0 - (-w / tau).exp()) / w;
        assert_abs_diff_eq!(flux, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_monotone_in_charflux() {
        let lo = Fred.integrated_flux(1.0, 0.0, 1.0, 0.5, 1.5);
        let hi = Fred.integrated_flux(5.0, 0.0, 1.0, 0.5, 1.5);
        assert!(hi > lo);
    }

    #[test]
    fn test_degenerate_duration_is_delta_like() {
        assert!(Fred.integrated_flux(1.0, 0.5, 0.0, 0.0, 1.0).is_infinite());
    }

    #[test]
    fn test_long_dead_time_decays_toward_zero() {
        // window far into the exponential tail sees almost nothing
        let flux = Fred.integrated_flux(1.0, 0.0, 0.01, 1000.0, 1001.0);
        assert!(flux >= 0.0 && flux < 1e-30);
    }
}
