use crate::lightcurve::{LimitCurve, SensitivityLimits};
use crate::models::observation::ObservationSchedule;
use statrs::function::erf::erf;
use std::f64::consts::{PI, SQRT_2};

const UNDERFLOW_FLOOR: f64 = 1e-50;

/// Standard normal CDF.
fn phi(x: f64, mean: f64, sigma: f64) -> f64 {
    0.5 * (1.0 + erf((x - mean) / (sigma * SQRT_2)))
}

/// Gaussian pulse centred at `chartime + chardur/2` with width `chardur/10`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gaussian;

impl Gaussian {
    /// Normal-CDF difference at the window bounds, scaled by
    /// `sqrt(2*pi) * chardur / (10 * window)`.
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
        let mean = chartime + chardur / 2.0;
        let sigma = chardur / 10.0;
        let cdf_span = phi(obs_end, mean, sigma) - phi(obs_start, mean, sigma);
        let flux = (2.0 * PI).sqrt() * (chardur / (10.0 * window)) * charflux * cdf_span;
        if flux.is_finite() {
            flux.max(0.0)
        } else {
            f64::INFINITY
        }
    }

    /// CDF helper shared with the design curves; matches the pulse
    /// normalization used by `integrated_flux` for a unit-flux source.
    fn pulse_cdf(&self, chardur: f64, t: f64) -> f64 {
        (chardur / 10.0) * (PI / 2.0).sqrt() * phi(t, chardur / 2.0, chardur / 10.0)
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
                let denom = self.pulse_cdf(x, durmax + x) - self.pulse_cdf(x, durmax - day1 + x);
                if denom > UNDERFLOW_FLOOR {
                    (1.0 + flux_err) * sens_last * day1 / denom
                } else {
                    f64::INFINITY
                }
            })
            .collect();
        let gap = durations
            .iter()
            .map(|&x| {
                let denom = self.pulse_cdf(x, max_gap + day1) - self.pulse_cdf(x, max_gap);
                if denom > UNDERFLOW_FLOOR {
                    (1.0 + flux_err) * sens_gap * day1 / denom
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
    fn test_window_covering_pulse_captures_total_flux() {
        // window much wider than the pulse: CDF difference saturates at 1 and
        // the integrated flux approaches sqrt(2*pi) * tau * F0 / (10 * window)
        let (tau, f0) = (1.0, 3.0);
        let flux = Gaussian.integrated_flux(f0, 0.0, tau, -50.0, 50.0);
        let expected = (2.0 * PI).sqrt() * tau * f0 / (10.0 * 100.0);
        assert_abs_diff_eq!(flux, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_far_window_is_zero() {
        // many sigma away the CDF difference underflows to exactly zero
        let flux = Gaussian.integrated_flux(3.0, 0.0, 1.0, 100.0, 101.0);
        assert_eq!(flux, 0.0);
    }

    #[test]
    fn test_monotone_in_charflux() {
        let lo = Gaussian.integrated_flux(1.0, 0.0, 1.0, 0.0, 1.0);
        let hi = Gaussian.integrated_flux(2.0, 0.0, 1.0, 0.0, 1.0);
        assert!(hi > lo);
    }

    #[test]
    fn test_symmetric_windows_match() {
        // the pulse is symmetric about chartime + chardur/2
        let (tau, mid) = (2.0, 1.0);
        let left = Gaussian.integrated_flux(1.0, 0.0, tau, mid - 0.5, mid);
        let right = Gaussian.integrated_flux(1.0, 0.0, tau, mid, mid + 0.5);
        assert_abs_diff_eq!(left, right, epsilon = 1e-12);
    }
}
