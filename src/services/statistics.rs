//! Detection-probability aggregation over the (duration, flux) plane.
//!
//! Simulated and detected populations are histogrammed onto the same
//! geometric 2-D grid; each cell reports `detections / total` with the empty
//! cell defined as probability zero, never NaN. Grids from independent trials
//! merge by summing counts, after which probabilities are recomputed.

use crate::config::PopulationConfig;
use crate::models::source::SimulatedSource;
use serde::{Deserialize, Serialize};

/// One output row of the probability table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityGridCell {
    pub duration_center: f64,
    pub flux_center: f64,
    pub probability: f64,
    pub detections: u64,
    pub total: u64,
}

/// 2-D histogram pair (simulated and detected counts) over geometric bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbabilityGrid {
    duration_edges: Vec<f64>,
    flux_edges: Vec<f64>,
    /// Row-major, duration rows by flux columns.
    detections: Vec<u64>,
    total: Vec<u64>,
}

/// Geometric sequence of `num` points from `start` to `stop` inclusive.
pub(crate) fn geomspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    let num = num.max(2);
    let (lo, hi) = (start.log10(), stop.log10());
    let step = (hi - lo) / (num - 1) as f64;
    (0..num)
        .map(|i| 10f64.powf(lo + step * i as f64))
        .collect()
}

/// Number of grid edges giving roughly `dex` decades per bin.
fn edge_count(min: f64, max: f64, dex: f64) -> usize {
    ((max.log10() - min.log10()) / dex).round() as usize
}

/// Bin index for `x` against sorted `edges`; the last bin is right-inclusive.
fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let last = edges.len() - 1;
    if x < edges[0] || x > edges[last] {
        return None;
    }
    if x == edges[last] {
        return Some(last - 1);
    }
    match edges.partition_point(|&e| e <= x) {
        0 => None,
        k => Some(k - 1),
    }
}

impl ProbabilityGrid {
    /// Empty grid over the population's prior bounds at `grid_dex` resolution.
    pub fn new(config: &PopulationConfig, grid_dex: f64) -> Self {
        let duration_edges = geomspace(
            config.dmin,
            config.dmax,
            edge_count(config.dmin, config.dmax, grid_dex),
        );
        let flux_edges = geomspace(
            config.fl_min,
            config.fl_max,
            edge_count(config.fl_min, config.fl_max, grid_dex),
        );
        let cells = (duration_edges.len() - 1) * (flux_edges.len() - 1);
        Self {
            duration_edges,
            flux_edges,
            detections: vec![0; cells],
            total: vec![0; cells],
        }
    }

    fn accumulate(&mut self, source: &SimulatedSource, detected: bool) {
        let (di, fi) = match (
            bin_index(&self.duration_edges, source.chardur),
            bin_index(&self.flux_edges, source.charflux),
        ) {
            (Some(d), Some(f)) => (d, f),
            _ => return,
        };
        let idx = di * (self.flux_edges.len() - 1) + fi;
        self.total[idx] += 1;
        if detected {
            self.detections[idx] += 1;
        }
    }

    /// Fold another trial's grid into this one by summing counts. The grids
    /// must share bin edges, which holds for trials run off one config.
    pub fn merge(&mut self, other: &ProbabilityGrid) {
        debug_assert_eq!(self.total.len(), other.total.len());
        for (t, o) in self.total.iter_mut().zip(&other.total) {
            *t += o;
        }
        for (d, o) in self.detections.iter_mut().zip(&other.detections) {
            *d += o;
        }
    }

    /// Table rows in duration-major order: durations repeated, flux centers
    /// tiled. Centers are arithmetic midpoints of the geometric edges.
    pub fn cells(&self) -> Vec<ProbabilityGridCell> {
        let duration_centers: Vec<f64> = self
            .duration_edges
            .windows(2)
            .map(|e| (e[0] + e[1]) / 2.0)
            .collect();
        let flux_centers: Vec<f64> = self
            .flux_edges
            .windows(2)
            .map(|e| (e[0] + e[1]) / 2.0)
            .collect();
        let mut rows = Vec::with_capacity(self.total.len());
        for (di, &duration_center) in duration_centers.iter().enumerate() {
            for (fi, &flux_center) in flux_centers.iter().enumerate() {
                let idx = di * flux_centers.len() + fi;
                let (det, total) = (self.detections[idx], self.total[idx]);
                let probability = if total == 0 {
                    0.0
                } else {
                    det as f64 / total as f64
                };
                rows.push(ProbabilityGridCell {
                    duration_center,
                    flux_center,
                    probability,
                    detections: det,
                    total,
                });
            }
        }
        rows
    }

    pub fn total_simulated(&self) -> u64 {
        self.total.iter().sum()
    }

    pub fn total_detected(&self) -> u64 {
        self.detections.iter().sum()
    }
}

/// Histogram the full population and its detected subset onto one grid.
pub fn aggregate_probability_grid(
    population: &[SimulatedSource],
    detected_mask: &[bool],
    config: &PopulationConfig,
    grid_dex: f64,
) -> ProbabilityGrid {
    let mut grid = ProbabilityGrid::new(config, grid_dex);
    for (source, &detected) in population.iter().zip(detected_mask) {
        grid.accumulate(source, detected);
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population_config() -> PopulationConfig {
        PopulationConfig {
            n_sources: 100,
            fl_min: 0.1,
            fl_max: 10.0,
            dmin: 0.001,
            dmax: 10.0,
            burst_length: None,
        }
    }

    #[test]
    fn test_empty_cells_have_zero_probability() {
        let grid = aggregate_probability_grid(&[], &[], &population_config(), 0.05);
        for cell in grid.cells() {
            assert_eq!(cell.probability, 0.0);
            assert_eq!(cell.total, 0);
        }
    }

    #[test]
    fn test_detections_never_exceed_totals() {
        let population: Vec<SimulatedSource> = (0..50)
            .map(|i| SimulatedSource::new(0.0, 0.002 * (i + 1) as f64, 0.15 * (i + 1) as f64))
            .collect();
        let mask: Vec<bool> = (0..50).map(|i| i % 3 == 0).collect();
        let grid = aggregate_probability_grid(&population, &mask, &population_config(), 0.05);
        for cell in grid.cells() {
            assert!(cell.detections <= cell.total);
            assert!((0.0..=1.0).contains(&cell.probability));
        }
    }

    #[test]
    fn test_all_detected_gives_probability_one() {
        let population = vec![
            SimulatedSource::new(0.0, 0.01, 1.0),
            SimulatedSource::new(0.0, 0.01, 1.0),
        ];
        let grid =
            aggregate_probability_grid(&population, &[true, true], &population_config(), 0.05);
        for cell in grid.cells() {
            if cell.total > 0 {
                assert_eq!(cell.probability, 1.0);
                assert_eq!(cell.total, 2);
            }
        }
        assert_eq!(grid.total_simulated(), 2);
        assert_eq!(grid.total_detected(), 2);
    }

    #[test]
    fn test_upper_bound_is_right_inclusive() {
        let config = population_config();
        let edge_source = SimulatedSource::new(0.0, config.dmax, config.fl_max);
        let grid = aggregate_probability_grid(&[edge_source], &[true], &config, 0.05);
        assert_eq!(grid.total_simulated(), 1);
    }

    #[test]
    fn test_merge_sums_counts() {
        let config = population_config();
        let population = vec![SimulatedSource::new(0.0, 0.01, 1.0)];
        let mut a = aggregate_probability_grid(&population, &[true], &config, 0.05);
        let b = aggregate_probability_grid(&population, &[false], &config, 0.05);
        a.merge(&b);
        assert_eq!(a.total_simulated(), 2);
        assert_eq!(a.total_detected(), 1);
        let occupied: Vec<_> = a.cells().into_iter().filter(|c| c.total > 0).collect();
        assert_eq!(occupied.len(), 1);
        assert!((occupied[0].probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_row_order_is_duration_major() {
        let grid = ProbabilityGrid::new(&population_config(), 0.05);
        let cells = grid.cells();
        let n_flux = cells
            .iter()
            .take_while(|c| c.duration_center == cells[0].duration_center)
            .count();
        assert!(n_flux > 1);
        // flux centers repeat per duration row
        assert_eq!(cells[0].flux_center, cells[n_flux].flux_center);
        assert!(cells[n_flux].duration_center > cells[0].duration_center);
    }
}
