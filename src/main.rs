use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, trace, warn};
use physarum_engine::common::{EngineConfig, SettingsError, SimulationSettings, Snapshot};
use physarum_engine::{PhysarumSimulation, SharedSimulation};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Command-line arguments for the headless driver
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Physarum simulation driver", long_about = None)]
struct Args {
    /// Run configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Settings JSON as exported by the settings panel, applied over the config's settings
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Number of steps to run (overrides timing.total_steps)
    #[arg(long)]
    steps: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Physarum Engine (CPU Parallel)...");

    // --- Load Configuration ---
    let config = EngineConfig::load(&args.config)?;
    let settings = match &args.settings {
        Some(path) => import_settings(path, &config.settings)?,
        None => config.settings,
    };

    info!("Using {} Rayon threads.", rayon::current_num_threads());

    // --- Initialize Simulation ---
    let sim = PhysarumSimulation::with_params(settings, config.get_sim_params())?;
    debug!("Simulation Parameters: {:#?}", sim.params());
    debug!("Settings: {:#?}", sim.settings());
    let sim = SharedSimulation::new(sim);

    // --- Simulation Loop ---
    let total_steps = args.steps.unwrap_or(config.timing.total_steps);
    let record_interval_steps = if config.timing.record_interval_steps == 0 {
        warn!("record_interval_steps is 0; recording every step.");
        1
    } else {
        config.timing.record_interval_steps
    };
    let tick_interval = Duration::from_millis(config.timing.tick_interval_ms);
    let include_field = config.output.save_field_in_snapshot;
    let include_positions = config.output.save_positions_in_snapshot;

    info!(
        "Running {} steps, snapshot every {} steps{}.",
        total_steps,
        record_interval_steps,
        if config.timing.realtime {
            format!(", paced at {} ms", tick_interval.as_millis())
        } else {
            String::new()
        }
    );

    sim.with(|s| s.record_snapshot(include_field, include_positions));
    sim.start();

    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    let mut next_tick = start_time + tick_interval;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        if !sim.tick() {
            error!("Simulation stopped unexpectedly at step {}.", step);
            break;
        }
        let step_duration = step_start_time.elapsed();

        let is_record_step = (step + 1) % record_interval_steps == 0;
        let is_last_step = step + 1 == total_steps;
        if is_record_step || is_last_step {
            sim.with(|s| s.record_snapshot(include_field, include_positions));
        }

        // Print status periodically
        let now = Instant::now();
        if now.duration_since(previous_print_time).as_secs_f64() >= 5.0 || is_last_step {
            let status = sim.status();
            let field_total = sim.with(|s| s.field().total());
            info!(
                "Step [{}/{}] | Agents: {} | Pheromone: {:.2} | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                status.step,
                total_steps,
                status.agent_count,
                field_total,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = now;
        } else {
            trace!("Step [{}/{}] completed in {:.2} ms", step + 1, total_steps, step_duration.as_secs_f64() * 1000.0);
        }

        if config.timing.realtime {
            let now = Instant::now();
            if next_tick > now {
                std::thread::sleep(next_tick - now);
            }
            next_tick += tick_interval;
        }
    }
    sim.stop();

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let base = &config.output.base_filename;
    let final_settings = sim.with(|s| *s.settings());
    let settings_file = format!("{}_settings.json", base);
    std::fs::write(&settings_file, final_settings.to_json()?)
        .with_context(|| format!("Failed to write settings to '{}'", settings_file))?;
    info!("Settings exported to {}", settings_file);

    if config.output.save_snapshots {
        let format = config.output.format.as_deref().unwrap_or("json");
        sim.with(|s| save_snapshots(s.recorded_snapshots(), base, format))?;
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    // Save final positions if requested (separate from full snapshots)
    if config.output.save_positions {
        let filename = format!("{}_final_positions.csv", base);
        let mut writer = csv::Writer::from_path(&filename)
            .with_context(|| format!("Failed to create '{}'", filename))?;
        writer.write_record(["x", "y", "heading"])?;
        for p in sim.agent_positions() {
            writer.write_record(&[format!("{:.4}", p.x), format!("{:.4}", p.y), format!("{:.2}", p.heading)])?;
        }
        writer.flush()?;
        info!("Final positions saved to {}", filename);
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}

/// Reads exported settings JSON leniently on top of `prior`. Unusable fields
/// keep their prior values; text that is not JSON at all is reported and ignored.
fn import_settings(path: &Path, prior: &SimulationSettings) -> Result<SimulationSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file '{}'", path.display()))?;
    match SimulationSettings::import_lenient(&text, prior) {
        Ok(report) => {
            for rejected in &report.rejected {
                warn!("Kept configured value for {}: {}", rejected.field, rejected.reason);
            }
            info!(
                "Imported settings from {}{}",
                path.display(),
                if report.is_complete() { "" } else { " (partially)" }
            );
            Ok(report.settings)
        }
        Err(SettingsError::Parse(e)) => {
            error!("Settings file '{}' is not valid JSON ({}); using configured settings.", path.display(), e);
            Ok(*prior)
        }
        Err(e) => Err(e.into()),
    }
}

fn save_snapshots(snapshots: &[Snapshot], base: &str, format: &str) -> Result<()> {
    let (extension, format) = match format {
        "json" => ("json", "json"),
        "bincode" => ("bin", "bincode"),
        "messagepack" => ("msgpack", "messagepack"),
        other => {
            error!("Unknown output format: {}. Using JSON instead.", other);
            ("json", "json")
        }
    };
    let filename = format!("{}_snapshots.{}", base, extension);
    let mut file = File::create(&filename)
        .with_context(|| format!("Failed to create snapshot file '{}'", filename))?;

    match format {
        "bincode" => bincode::serialize_into(&mut file, snapshots)?,
        "messagepack" => rmp_serde::encode::write(&mut file, snapshots)?,
        _ => {
            let json_string = serde_json::to_string(snapshots)?;
            file.write_all(json_string.as_bytes())?;
        }
    }
    info!("{} snapshots saved to {} ({} format)", snapshots.len(), filename, format);
    Ok(())
}
