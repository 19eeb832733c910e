//! Observation windows and the observing campaign schedule.
//!
//! A schedule is either parsed from an externally supplied observation list
//! (one row per window) or synthesized in "trial mode" at a fixed cadence.
//! Either way the schedule is sorted by start time ascending and immutable
//! once built; every downstream stage reads it, none mutate it.

use crate::config::TrialModeConfig;
use crate::models::time::ModifiedJulianDate;
use anyhow::{bail, Result};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Sky pointing of a single observation: field centre and field-of-view radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pointing {
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub radius: qtty::Degrees,
}

/// One observation window on the continuous MJD timeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Observation {
    pub start: ModifiedJulianDate,
    pub duration: qtty::Days,
    /// Detection sensitivity in Jy, already scaled by the detection threshold.
    pub sensitivity: f64,
    pub pointing: Option<Pointing>,
}

impl Observation {
    /// End of the window (start + duration) in MJD days.
    pub fn stop(&self) -> f64 {
        self.start.value() + self.duration.value()
    }
}

/// Ordered collection of observation windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSchedule {
    observations: Vec<Observation>,
}

impl ObservationSchedule {
    /// Build a schedule from pre-constructed observations, sorting by start.
    ///
    /// Negative durations are rejected; the schedule must be non-empty.
    pub fn new(mut observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            bail!("Observation schedule must contain at least one observation");
        }
        if let Some(bad) = observations.iter().find(|o| o.duration.value() < 0.0) {
            bail!(
                "Observation at MJD {} has negative duration {}",
                bad.start,
                bad.duration.value()
            );
        }
        observations.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(Self { observations })
    }

    /// Parse a schedule from observation-list text.
    ///
    /// Each row is `timestamp,duration_seconds,sensitivity[,ra,dec,fov]` with
    /// the timestamp in ISO-8601 with fractional seconds. Rows starting with
    /// `#` and blank rows are ignored. Malformed rows are skipped with a
    /// warning rather than aborting the whole schedule. Sensitivities are
    /// scaled by `det_threshold` on ingest.
    pub fn parse(text: &str, det_threshold: f64) -> Result<Self> {
        let mut observations = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_row(line, det_threshold) {
                Ok(obs) => observations.push(obs),
                Err(e) => {
                    log::warn!("Skipping malformed observation row {}: {e:#}", lineno + 1);
                }
            }
        }
        Self::new(observations)
    }

    /// Synthesize a schedule in trial mode: `nobs` windows at a fixed cadence
    /// with sensitivities drawn from a normal distribution around the
    /// configured mean, scaled by the detection threshold.
    pub fn trial_mode<R: Rng>(
        trial: &TrialModeConfig,
        det_threshold: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let first_start = ModifiedJulianDate::parse(&trial.first_start)?;
        let pointing = Pointing {
            ra: qtty::Degrees::new(trial.pointing_ra_deg),
            dec: qtty::Degrees::new(trial.pointing_dec_deg),
            radius: qtty::Degrees::new(trial.field_radius_deg),
        };
        let observations = (0..trial.nobs)
            .map(|i| {
                let noise: f64 = rng.sample(StandardNormal);
                let sensitivity = (trial.obs_sensitivity + trial.obs_sigma * noise) * det_threshold;
                Observation {
                    start: ModifiedJulianDate::new(
                        first_start.value() + i as f64 * trial.interval_days,
                    ),
                    duration: qtty::Days::new(trial.duration_days),
                    sensitivity,
                    pointing: Some(pointing),
                }
            })
            .collect();
        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Start of the first observation (MJD days).
    pub fn survey_start(&self) -> f64 {
        self.observations[0].start.value()
    }

    /// End of the last observation (MJD days).
    pub fn survey_stop(&self) -> f64 {
        self.observations
            .iter()
            .map(Observation::stop)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Total survey span in days: first start to last stop.
    pub fn survey_span_days(&self) -> f64 {
        self.survey_stop() - self.survey_start()
    }

    /// Total on-source time in days.
    pub fn on_source_days(&self) -> f64 {
        self.observations.iter().map(|o| o.duration.value()).sum()
    }

    /// Inter-observation gaps in days: end of window `i` to start of window
    /// `i+1`, clamped at zero for overlapping windows.
    pub fn gaps(&self) -> Vec<f64> {
        self.observations
            .windows(2)
            .map(|pair| (pair[1].start.value() - pair[0].stop()).max(0.0))
            .collect()
    }

    /// Largest inter-observation gap in days (0 for a single observation).
    pub fn max_gap(&self) -> f64 {
        self.gaps().into_iter().fold(0.0, f64::max)
    }

    /// Index `i` such that the largest gap lies between observations `i` and
    /// `i + 1`; `None` for a single-observation schedule.
    pub fn max_gap_index(&self) -> Option<usize> {
        self.gaps()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    /// Sensitivity of the observation immediately after the largest gap.
    /// Falls back to the last observation's sensitivity for a gapless schedule.
    pub fn sensitivity_after_max_gap(&self) -> f64 {
        match self.max_gap_index() {
            Some(i) => self.observations[i + 1].sensitivity,
            None => self.last_sensitivity(),
        }
    }

    pub fn first_duration(&self) -> f64 {
        self.observations[0].duration.value()
    }

    pub fn min_duration(&self) -> f64 {
        self.observations
            .iter()
            .map(|o| o.duration.value())
            .fold(f64::INFINITY, f64::min)
    }

    pub fn min_sensitivity(&self) -> f64 {
        self.observations
            .iter()
            .map(|o| o.sensitivity)
            .fold(f64::INFINITY, f64::min)
    }

    pub fn max_sensitivity(&self) -> f64 {
        self.observations
            .iter()
            .map(|o| o.sensitivity)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn last_sensitivity(&self) -> f64 {
        self.observations[self.observations.len() - 1].sensitivity
    }
}

fn parse_row(line: &str, det_threshold: f64) -> Result<Observation> {
    let cols: Vec<&str> = line.split(',').map(str::trim).collect();
    if cols.len() != 3 && cols.len() != 6 {
        bail!("expected 3 or 6 comma-separated fields, got {}", cols.len());
    }
    let start = ModifiedJulianDate::parse(cols[0])?;
    let duration_secs: f64 = cols[1].parse()?;
    if duration_secs < 0.0 {
        bail!("negative duration {duration_secs}");
    }
    let sensitivity: f64 = cols[2].parse::<f64>()? * det_threshold;
    let pointing = if cols.len() == 6 {
        Some(Pointing {
            ra: qtty::Degrees::new(cols[3].parse()?),
            dec: qtty::Degrees::new(cols[4].parse()?),
            radius: qtty::Degrees::new(cols[5].parse()?),
        })
    } else {
        None
    };
    Ok(Observation {
        start,
        duration: qtty::Days::new(duration_secs / 86400.0),
        sensitivity,
        pointing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(start: f64, duration: f64, sensitivity: f64) -> Observation {
        Observation {
            start: ModifiedJulianDate::new(start),
            duration: qtty::Days::new(duration),
            sensitivity,
            pointing: None,
        }
    }

    #[test]
    fn test_schedule_sorts_by_start() {
        let schedule =
            ObservationSchedule::new(vec![obs(20.0, 0.1, 1.0), obs(10.0, 0.1, 2.0)]).unwrap();
        assert_eq!(schedule.observations()[0].start.value(), 10.0);
        assert_eq!(schedule.observations()[1].start.value(), 20.0);
    }

    #[test]
    fn test_schedule_rejects_empty_and_negative() {
        assert!(ObservationSchedule::new(vec![]).is_err());
        assert!(ObservationSchedule::new(vec![obs(10.0, -0.1, 1.0)]).is_err());
    }

    #[test]
    fn test_parse_skips_malformed_rows() {
        let text = "\
# start, duration (s), sensitivity (Jy)
2019-08-08T12:50:05.000000+00:00,864.0,0.5
not-a-timestamp,864.0,0.5
2019-08-15T12:50:05.000000+00:00,864.0,0.4
";
        let schedule = ObservationSchedule::parse(text, 5.0).unwrap();
        assert_eq!(schedule.len(), 2);
        // sensitivities scaled by det_threshold
        assert!((schedule.observations()[0].sensitivity - 2.5).abs() < 1e-12);
        // durations converted from seconds to days
        assert!((schedule.observations()[0].duration.value() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_parse_with_pointing() {
        let text = "2019-08-08T12:50:05.0,864.0,0.5,275.09,7.18,1.5\n";
        let schedule = ObservationSchedule::parse(text, 1.0).unwrap();
        let pointing = schedule.observations()[0].pointing.unwrap();
        assert!((pointing.ra.value() - 275.09).abs() < 1e-9);
        assert!((pointing.radius.value() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_gaps_and_span() {
        let schedule = ObservationSchedule::new(vec![
            obs(0.0, 0.5, 1.0),
            obs(7.0, 0.5, 1.0),
            obs(21.0, 0.5, 2.0),
        ])
        .unwrap();
        let gaps = schedule.gaps();
        assert_eq!(gaps.len(), 2);
        assert!((gaps[0] - 6.5).abs() < 1e-12);
        assert!((gaps[1] - 13.5).abs() < 1e-12);
        assert!((schedule.max_gap() - 13.5).abs() < 1e-12);
        assert!((schedule.survey_span_days() - 21.5).abs() < 1e-12);
        assert!((schedule.on_source_days() - 1.5).abs() < 1e-12);
        assert_eq!(schedule.sensitivity_after_max_gap(), 2.0);
    }

    #[test]
    fn test_trial_mode_cadence() {
        use rand::SeedableRng;
        let trial = TrialModeConfig {
            nobs: 5,
            first_start: "2019-08-08T12:50:05.0".into(),
            interval_days: 7.0,
            duration_days: 0.01,
            obs_sensitivity: 1.0,
            obs_sigma: 0.0,
            pointing_ra_deg: 275.0913169,
            pointing_dec_deg: 7.185135679,
            field_radius_deg: 1.5,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let schedule = ObservationSchedule::trial_mode(&trial, 5.0, &mut rng).unwrap();
        assert_eq!(schedule.len(), 5);
        let starts: Vec<f64> = schedule
            .observations()
            .iter()
            .map(|o| o.start.value())
            .collect();
        assert!((starts[1] - starts[0] - 7.0).abs() < 1e-9);
        // zero sigma: all sensitivities exactly mean * det_threshold
        assert!(schedule
            .observations()
            .iter()
            .all(|o| (o.sensitivity - 5.0).abs() < 1e-12));
    }
}
