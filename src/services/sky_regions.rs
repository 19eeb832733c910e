//! Sky-region bookkeeping for multi-pointing surveys.
//!
//! Each unique pointing of the schedule becomes a circular base region; every
//! pair of base regions whose centres are closer than the sum of their radii
//! additionally yields a spherical-lens intersection region. The catalog is
//! built once from the schedule and is read-only afterwards.

use crate::models::observation::{ObservationSchedule, Pointing};
use serde::{Deserialize, Serialize};

const SQDEG_PER_SR: f64 = (180.0 / std::f64::consts::PI) * (180.0 / std::f64::consts::PI);

/// A circular (or lens-shaped) patch of sky with its observed time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyRegion {
    /// `"i"` for a base pointing, `"i&j"` for the intersection of two.
    pub identity: String,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub area_sqdeg: f64,
    /// First observed MJD.
    pub start: f64,
    /// Last observed MJD.
    pub stop: f64,
    /// Observed span in days. For intersection regions this is the sum of the
    /// constituent spans, an approximation that overcounts simultaneous
    /// coverage.
    pub timespan_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkyRegionCatalog {
    regions: Vec<SkyRegion>,
    base_count: usize,
}

impl SkyRegionCatalog {
    /// Build the catalog from the schedule's pointings. Observations without
    /// a pointing are ignored; a schedule with none yields an empty catalog.
    pub fn from_schedule(schedule: &ObservationSchedule) -> Self {
        let mut unique: Vec<Pointing> = Vec::new();
        for obs in schedule.observations() {
            if let Some(p) = obs.pointing {
                if !unique.contains(&p) {
                    unique.push(p);
                }
            }
        }

        let mut regions: Vec<SkyRegion> = unique
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (start, stop) = pointing_time_range(schedule, p);
                SkyRegion {
                    identity: i.to_string(),
                    ra: p.ra,
                    dec: p.dec,
                    area_sqdeg: cap_area_sr(p.radius.value().to_radians()) * SQDEG_PER_SR,
                    start,
                    stop,
                    timespan_days: stop - start,
                }
            })
            .collect();

        let base_count = regions.len();
        for i in 0..base_count {
            for j in (i + 1)..base_count {
                let (pi, pj) = (&unique[i], &unique[j]);
                let d = angular_separation(pi, pj);
                let r1 = pi.radius.value().to_radians();
                let r2 = pj.radius.value().to_radians();
                if d.to_degrees() > pi.radius.value() + pj.radius.value() {
                    continue;
                }
                let (area_sr, offset) = lens_area_sr(d, r1, r2);
                let (ra, dec) = offset_along_arc(pi, pj, d, offset);
                let lens = SkyRegion {
                    identity: format!("{i}&{j}"),
                    ra: qtty::Degrees::new(ra),
                    dec: qtty::Degrees::new(dec),
                    area_sqdeg: area_sr * SQDEG_PER_SR,
                    start: regions[i].start.min(regions[j].start),
                    stop: regions[i].stop.max(regions[j].stop),
                    timespan_days: regions[i].timespan_days + regions[j].timespan_days,
                };
                regions.push(lens);
            }
        }

        log::debug!(
            "Sky catalog: {} base regions, {} intersection regions",
            base_count,
            regions.len() - base_count
        );

        Self {
            regions,
            base_count,
        }
    }

    pub fn regions(&self) -> &[SkyRegion] {
        &self.regions
    }

    /// Number of unique pointings, the normalization used by the rate
    /// estimator.
    pub fn base_region_count(&self) -> usize {
        self.base_count
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }
}

/// First start and last stop among observations carrying this pointing.
fn pointing_time_range(schedule: &ObservationSchedule, pointing: &Pointing) -> (f64, f64) {
    let mut start = f64::INFINITY;
    let mut stop = f64::NEG_INFINITY;
    for obs in schedule.observations() {
        if obs.pointing.as_ref() == Some(pointing) {
            start = start.min(obs.start.value());
            stop = stop.max(obs.stop());
        }
    }
    (start, stop)
}

/// Solid angle of a spherical cap of angular radius `r`, in steradians.
fn cap_area_sr(r: f64) -> f64 {
    4.0 * std::f64::consts::PI * (r / 2.0).sin().powi(2)
}

/// Great-circle separation of two pointing centres, in radians.
fn angular_separation(a: &Pointing, b: &Pointing) -> f64 {
    let (ra1, dec1) = (a.ra.value().to_radians(), a.dec.value().to_radians());
    let (ra2, dec2) = (b.ra.value().to_radians(), b.dec.value().to_radians());
    // haversine, stable at small separations
    let sd = ((dec2 - dec1) / 2.0).sin();
    let sr = ((ra2 - ra1) / 2.0).sin();
    let h = sd * sd + dec1.cos() * dec2.cos() * sr * sr;
    2.0 * h.sqrt().min(1.0).asin()
}

/// Area of a spherical lens formed by caps of radii `r1`, `r2` whose centres
/// are `d` apart, plus the dividing angle measured from the first centre.
///
/// The lens is the sum of two cap chords cut at the dividing circle: one of
/// cap 1 at angle `gamma`, one of cap 2 at `d - gamma`. If one cap contains
/// the other entirely, the lens is the smaller cap.
fn lens_area_sr(d: f64, r1: f64, r2: f64) -> (f64, f64) {
    if d + r1.min(r2) <= r1.max(r2) {
        let small = r1.min(r2);
        let offset = if r1 <= r2 { 0.0 } else { d };
        return (cap_area_sr(small), offset);
    }
    let gamma = ((r2.cos() / (r1.cos() * d.sin())) - 1.0 / d.tan()).atan();
    let area = cap_chord_sr(r1, gamma) + cap_chord_sr(r2, d - gamma);
    (area, gamma)
}

/// Solid angle of the chord of a cap of radius `r` cut at dividing angle
/// `gamma` from its centre (arXiv:1205.1396 eq. for the lune piece).
fn cap_chord_sr(r: f64, gamma: f64) -> f64 {
    let a = (gamma.sin() / r.sin()).clamp(-1.0, 1.0).acos();
    let b = (gamma.tan() / r.tan()).clamp(-1.0, 1.0).acos();
    2.0 * (a - r.cos() * b)
}

/// Point on the great circle from `a` towards `b` at angle `offset` from `a`,
/// as (ra, dec) in degrees.
fn offset_along_arc(a: &Pointing, b: &Pointing, d: f64, offset: f64) -> (f64, f64) {
    let va = unit_vector(a);
    let vb = unit_vector(b);
    if d.sin().abs() < 1e-12 {
        return (a.ra.value(), a.dec.value());
    }
    let (wa, wb) = ((d - offset).sin() / d.sin(), offset.sin() / d.sin());
    let v = [
        wa * va[0] + wb * vb[0],
        wa * va[1] + wb * vb[1],
        wa * va[2] + wb * vb[2],
    ];
    let ra = v[1].atan2(v[0]).to_degrees().rem_euclid(360.0);
    let dec = v[2].clamp(-1.0, 1.0).asin().to_degrees();
    (ra, dec)
}

fn unit_vector(p: &Pointing) -> [f64; 3] {
    let (ra, dec) = (p.ra.value().to_radians(), p.dec.value().to_radians());
    [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()]
}
