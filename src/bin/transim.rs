use anyhow::{Context, Result};
use clap::Parser;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use transim::services::{estimate_rates, run_trials, RateBounds, SimulationRun};
use transim::{ObservationSchedule, SimulationConfig, SkyRegionCatalog};

/// Monte-Carlo transient detection simulation and rate estimation.
#[derive(Debug, Parser)]
#[command(name = "transim", version, about)]
struct Cli {
    /// TOML simulation configuration.
    #[arg(short, long)]
    config: PathBuf,

    /// Observation list (timestamp,duration_s,sensitivity[,ra,dec,fov] per
    /// row). Omitted: synthesize the configured trial-mode campaign.
    #[arg(short, long)]
    observations: Option<PathBuf>,

    /// Also write the per-trial simulated and detected source tables.
    #[arg(long)]
    dump_intermediate: bool,

    /// Override the configured number of trials.
    #[arg(long)]
    trials: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config_text = fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read configuration {}", cli.config.display()))?;
    let mut config = SimulationConfig::from_toml_str(&config_text)?;
    if let Some(trials) = cli.trials {
        config.trials = trials;
    }

    let schedule = load_schedule(&cli, &config)?;
    log::info!(
        "Campaign: {} observations over {:.2} days ({:.3} days on source)",
        schedule.len(),
        schedule.survey_span_days(),
        schedule.on_source_days()
    );

    let catalog = SkyRegionCatalog::from_schedule(&schedule);
    for region in catalog.regions() {
        log::info!(
            "Region {}: {:.4} deg^2 observed {:.2} days",
            region.identity,
            region.area_sqdeg,
            region.timespan_days
        );
    }

    let run = run_trials(&schedule, &config)?;
    let rates = estimate_rates(
        &schedule,
        &config.statistics,
        catalog.base_region_count().max(1),
    )?;

    let prefix = output_prefix(&cli, &config);
    write_outputs(&prefix, &run, &rates, cli.dump_intermediate)?;
    log::info!(
        "Wrote {prefix}_Stat and {prefix}_Rates ({} simulated, {} detected)",
        run.grid.total_simulated(),
        run.grid.total_detected()
    );
    Ok(())
}

fn load_schedule(cli: &Cli, config: &SimulationConfig) -> Result<ObservationSchedule> {
    match &cli.observations {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read observation list {}", path.display()))?;
            ObservationSchedule::parse(&text, config.detection.det_threshold)
        }
        None => {
            log::info!(
                "No observation list supplied; synthesizing {} trial-mode observations",
                config.trial_mode.nobs
            );
            use rand::SeedableRng;
            let seed = schedule_seed(config.seed.unwrap_or_else(rand::random));
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            ObservationSchedule::trial_mode(
                &config.trial_mode,
                config.detection.det_threshold,
                &mut rng,
            )
        }
    }
}

/// Schedule synthesis draws from its own stream: trial RNGs are seeded
/// `master..master+trials`, so the master seed itself must not be reused for
/// the sensitivity draws.
fn schedule_seed(master: u64) -> u64 {
    master ^ 0x9E37_79B9_7F4A_7C15
}

/// Output file prefix: observation-list stem (or "trial") plus the
/// light-curve key.
fn output_prefix(cli: &Cli, config: &SimulationConfig) -> String {
    let stem = cli
        .observations
        .as_deref()
        .and_then(Path::file_stem)
        .and_then(|s| s.to_str())
        .unwrap_or("trial");
    format!("{stem}_{}", config.detection.lightcurve)
}

fn write_outputs(
    prefix: &str,
    run: &SimulationRun,
    rates: &transim::RateSeries,
    dump_intermediate: bool,
) -> Result<()> {
    let mut stat = String::from("# duration_days\tflux_jy\tprobability\tdetections\ttotal\n");
    for cell in run.grid.cells() {
        writeln!(
            stat,
            "{:.6e}\t{:.6e}\t{:.6}\t{}\t{}",
            cell.duration_center, cell.flux_center, cell.probability, cell.detections, cell.total
        )?;
    }
    write_table(&format!("{prefix}_Stat"), &stat)?;

    let mut rate_table =
        String::from("# timescale_days\tseries\trate_lower\trate_upper (per sky per day)\n");
    for (label, series) in [("corrected", &rates.corrected), ("uncorrected", &rates.uncorrected)] {
        for point in series {
            let (lower, upper) = match point.bounds {
                RateBounds::UpperLimit(limit) => (0.0, limit),
                RateBounds::Interval { lower, upper } => (lower, upper),
            };
            writeln!(
                rate_table,
                "{:.6e}\t{label}\t{:.6e}\t{:.6e}",
                point.timescale_days, lower, upper
            )?;
        }
    }
    write_table(&format!("{prefix}_Rates"), &rate_table)?;

    if dump_intermediate {
        for trial in &run.trials {
            let suffix = if run.trials.len() > 1 {
                format!("_{}", trial.seed.wrapping_sub(run.base_seed))
            } else {
                String::new()
            };
            let mut sim = String::from("# chartime_mjd\tchardur_days\tcharflux_jy\n");
            let mut det = sim.clone();
            for source in &trial.population {
                writeln!(
                    sim,
                    "{:.6}\t{:.6e}\t{:.6e}",
                    source.chartime, source.chardur, source.charflux
                )?;
            }
            for source in &trial.detection.detected {
                writeln!(
                    det,
                    "{:.6}\t{:.6e}\t{:.6e}",
                    source.chartime, source.chardur, source.charflux
                )?;
            }
            write_table(&format!("{prefix}_SimTrans{suffix}"), &sim)?;
            write_table(&format!("{prefix}_DetTrans{suffix}"), &det)?;
        }
    }
    Ok(())
}

fn write_table(path: &str, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("Failed to write {path}"))
}
