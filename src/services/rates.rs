//! Transient occurrence-rate estimation from a survey's temporal structure.
//!
//! Two estimators over a 10-point geometric grid of candidate transient
//! timescales (shortest usable integration up to the full survey span):
//!
//! - the gap-corrected rate weights the effective exposure by the probability
//!   that a transient of timescale T falls entirely inside an observing gap;
//! - the uncorrected rate normalizes by the number of T-wide snapshot pairs
//!   the survey supports, counted by binning the campaign into T-wide bins.
//!
//! With zero real detections the result is a one-sided upper limit; with N
//! detections it is a two-sided Poisson interval from the inverse regularized
//! incomplete gamma function. Rates are per sky per day.

use crate::config::StatisticsConfig;
use crate::models::observation::ObservationSchedule;
use crate::services::statistics::geomspace;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Gamma};

/// Whole-sky solid angle in square degrees.
const FULL_SKY_SQDEG: f64 = 41252.96;
const TIMESCALE_SAMPLES: usize = 10;

/// Rate bounds at one timescale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RateBounds {
    /// One-sided limit, used when the survey has zero real detections.
    UpperLimit(f64),
    /// Two-sided Poisson confidence interval for N > 0 detections.
    Interval { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub timescale_days: f64,
    pub bounds: RateBounds,
}

/// Both estimator series over the timescale grid. The uncorrected series may
/// be shorter: timescales with one or fewer snapshot pairs are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSeries {
    pub corrected: Vec<RatePoint>,
    pub uncorrected: Vec<RatePoint>,
}

/// Probability that a transient of duration `timescale` days is entirely
/// swallowed by inter-observation gaps (eqn 3.12, Carbone 2017).
pub fn prob_gaps(schedule: &ObservationSchedule, timescale: f64) -> f64 {
    let span = schedule.survey_span_days();
    if span <= 0.0 {
        return 0.0;
    }
    schedule
        .gaps()
        .iter()
        .map(|gap| (gap - timescale).max(0.0))
        .sum::<f64>()
        / span
}

/// Number of independent T-wide snapshot pairs the campaign supports.
///
/// For T below the shortest observation this is just the on-source time in
/// units of T. Otherwise the campaign is cut into T-wide bins from the first
/// start and a bin counts when some observation overlaps it by more than
/// `tsnap` days. Pair counting subtracts one either way, so the result can
/// reach -1 for an unusable timescale.
pub fn npairs_per_timescale(schedule: &ObservationSchedule, timescale: f64, tsnap: f64) -> i64 {
    if timescale < schedule.min_duration() {
        return (schedule.on_source_days() / timescale).round() as i64 - 1;
    }
    let start = schedule.survey_start();
    let stop = schedule.survey_stop() + timescale;
    let total_bins = ((stop - start) / timescale).round() as i64;
    let mut hits = 0i64;
    for j in 0..total_bins {
        let bin_lo = start + j as f64 * timescale;
        let bin_hi = start + (j + 1) as f64 * timescale;
        let observed = schedule.observations().iter().any(|obs| {
            let lo = bin_lo.max(obs.start.value());
            let hi = bin_hi.min(obs.stop());
            lo < hi && (hi - lo) > tsnap
        });
        if observed {
            hits += 1;
        }
    }
    hits - 1
}

/// Inverse of the regularized lower incomplete gamma function in its first
/// argument, via the unit-rate gamma distribution quantile.
fn gammainc_inv(shape: f64, p: f64) -> Result<f64> {
    let dist = Gamma::new(shape, 1.0)
        .with_context(|| format!("invalid gamma shape {shape} for rate interval"))?;
    Ok(dist.inverse_cdf(p))
}

/// Compute both rate series for the survey.
pub fn estimate_rates(
    schedule: &ObservationSchedule,
    stats: &StatisticsConfig,
    n_regions: usize,
) -> Result<RateSeries> {
    let tsnap = stats.min_integration_secs / 86400.0;
    let span = schedule.survey_span_days();
    let omega = std::f64::consts::PI * stats.extract_radius.powi(2);
    let n_regions = n_regions.max(1) as f64;
    let timescales = geomspace(tsnap, span, TIMESCALE_SAMPLES);

    // Poisson numerators shared by every timescale
    let alpha = 1.0 - stats.confidence;
    let numerators = if stats.detections == 0 {
        None
    } else {
        let n = stats.detections as f64;
        Some((
            gammainc_inv(n, alpha / 2.0)?,
            gammainc_inv(n + 1.0, 1.0 - alpha / 2.0)?,
        ))
    };

    let bounds_for = |normalization: f64| match numerators {
        None => RateBounds::UpperLimit(
            -FULL_SKY_SQDEG * (1.0 - stats.confidence).ln() / normalization,
        ),
        Some((lower, upper)) => RateBounds::Interval {
            lower: FULL_SKY_SQDEG * lower / normalization,
            upper: FULL_SKY_SQDEG * upper / normalization,
        },
    };

    let corrected = timescales
        .iter()
        .map(|&t| {
            let normalization = n_regions * omega * (span + t) * (1.0 - prob_gaps(schedule, t));
            RatePoint {
                timescale_days: t,
                bounds: bounds_for(normalization),
            }
        })
        .collect();

    let uncorrected = timescales
        .iter()
        .filter_map(|&t| {
            let npairs = npairs_per_timescale(schedule, t, tsnap);
            if npairs <= 1 {
                log::debug!("Timescale {t:.4} d has {npairs} snapshot pairs; skipped");
                return None;
            }
            let normalization = n_regions * omega * npairs as f64 * t;
            Some(RatePoint {
                timescale_days: t,
                bounds: bounds_for(normalization),
            })
        })
        .collect();

    Ok(RateSeries {
        corrected,
        uncorrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::observation::Observation;
    use crate::models::time::ModifiedJulianDate;

    fn obs(start: f64, duration: f64) -> Observation {
        Observation {
            start: ModifiedJulianDate::new(start),
            duration: qtty::Days::new(duration),
            sensitivity: 1.0,
            pointing: None,
        }
    }

    fn weekly_schedule(n: usize) -> ObservationSchedule {
        ObservationSchedule::new((0..n).map(|i| obs(i as f64 * 7.0, 0.01)).collect()).unwrap()
    }

    fn stats_config(detections: u64) -> StatisticsConfig {
        StatisticsConfig {
            confidence: 0.95,
            extract_radius: 1.5,
            detections,
            min_integration_secs: 600.0,
            grid_dex: 0.05,
        }
    }

    #[test]
    fn test_prob_gaps_limits() {
        let schedule = weekly_schedule(5);
        // instantaneous transient: all gap time counts
        let p0 = prob_gaps(&schedule, 0.0);
        let expected = 4.0 * 6.99 / schedule.survey_span_days();
        assert!((p0 - expected).abs() < 1e-12);
        // longer than every gap: no transient fits inside one
        assert_eq!(prob_gaps(&schedule, 7.0), 0.0);
        // monotone nonincreasing in timescale
        assert!(prob_gaps(&schedule, 3.0) <= p0);
    }

    #[test]
    fn test_npairs_short_timescale_counts_on_source_time() {
        let schedule = weekly_schedule(5);
        // T below the shortest observation: on-source time in units of T
        let t = 0.001;
        let expected = (schedule.on_source_days() / t).round() as i64 - 1;
        assert_eq!(npairs_per_timescale(&schedule, t, 1e-6), expected);
    }

    #[test]
    fn test_npairs_long_timescale_counts_occupied_bins() {
        let schedule = weekly_schedule(5);
        // T = 7 d puts each observation in its own bin
        assert_eq!(npairs_per_timescale(&schedule, 7.0, 1e-6), 4);
        // T spanning the whole survey leaves a single occupied bin
        assert_eq!(
            npairs_per_timescale(&schedule, schedule.survey_span_days(), 1e-6),
            0
        );
    }

    #[test]
    fn test_zero_detection_upper_limit_decreases_with_timescale() {
        let schedule = weekly_schedule(8);
        let series = estimate_rates(&schedule, &stats_config(0), 1).unwrap();
        assert_eq!(series.corrected.len(), 10);
        let mut previous = f64::INFINITY;
        for point in &series.corrected {
            match point.bounds {
                RateBounds::UpperLimit(limit) => {
                    assert!(limit.is_finite() && limit > 0.0);
                    assert!(limit <= previous);
                    previous = limit;
                }
                RateBounds::Interval { .. } => panic!("expected upper limits"),
            }
        }
    }

    #[test]
    fn test_nonzero_detections_give_ordered_interval() {
        let schedule = weekly_schedule(8);
        let series = estimate_rates(&schedule, &stats_config(3), 1).unwrap();
        for point in &series.corrected {
            match point.bounds {
                RateBounds::Interval { lower, upper } => {
                    assert!(lower > 0.0);
                    assert!(lower < upper);
                }
                RateBounds::UpperLimit(_) => panic!("expected intervals"),
            }
        }
    }

    #[test]
    fn test_uncorrected_series_drops_sparse_timescales() {
        let schedule = weekly_schedule(3);
        let series = estimate_rates(&schedule, &stats_config(0), 1).unwrap();
        assert!(series.uncorrected.len() < series.corrected.len());
        for point in &series.uncorrected {
            assert!(npairs_per_timescale(&schedule, point.timescale_days, 600.0 / 86400.0) > 1);
        }
    }

    #[test]
    fn test_longer_survey_tightens_upper_limit() {
        // same cadence, more weeks: the extra exposure must lower the
        // zero-detection limit at the shared shortest timescale
        let short = estimate_rates(&weekly_schedule(4), &stats_config(0), 1).unwrap();
        let long = estimate_rates(&weekly_schedule(12), &stats_config(0), 1).unwrap();
        let (RateBounds::UpperLimit(limit_short), RateBounds::UpperLimit(limit_long)) =
            (short.corrected[0].bounds, long.corrected[0].bounds)
        else {
            panic!("expected upper limits");
        };
        assert!(limit_short.is_finite() && limit_long.is_finite());
        assert!(limit_long < limit_short);
    }

    #[test]
    fn test_more_regions_lower_rate() {
        let schedule = weekly_schedule(5);
        let one = estimate_rates(&schedule, &stats_config(0), 1).unwrap();
        let four = estimate_rates(&schedule, &stats_config(0), 4).unwrap();
        for (a, b) in one.corrected.iter().zip(&four.corrected) {
            let (RateBounds::UpperLimit(la), RateBounds::UpperLimit(lb)) = (a.bounds, b.bounds)
            else {
                panic!("expected upper limits");
            };
            assert!((la / lb - 4.0).abs() < 1e-9);
        }
    }
}
