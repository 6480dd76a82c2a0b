use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, trace, warn};
use std::path::PathBuf;
use std::time::Instant;

use vicsek_common::{write_snapshots, SimulationConfig, SnapshotFormat};
use vicsek_engine::output::save_final_positions;
use vicsek_engine::{FrameSink, SnapshotRecorder, VicsekSimulation};

/// Runs a Vicsek flocking simulation and records its snapshots.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration; defaults are used for missing sections
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the random seed from the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of steps to simulate
    #[arg(long)]
    steps: Option<u32>,

    /// Override the snapshot format (json, bincode, messagepack)
    #[arg(long)]
    format: Option<SnapshotFormat>,

    /// Override the base filename of the output files
    #[arg(short, long)]
    output: Option<String>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting Vicsek Flocking Engine...");

    // --- Load Configuration ---
    let mut config = if args.config.exists() {
        SimulationConfig::load(&args.config)
            .with_context(|| format!("Failed to load config file '{}'", args.config.display()))?
    } else {
        warn!("Config file '{}' not found, using the default run.", args.config.display());
        SimulationConfig::default()
    };
    if let Some(seed) = args.seed {
        config.initial_conditions.seed = Some(seed);
    }
    if let Some(steps) = args.steps {
        config.timing.total_steps = steps;
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(base) = args.output {
        config.output.base_filename = base;
    }

    if config.execution.parallel {
        info!("Using {} Rayon threads.", rayon::current_num_threads());
    }

    // --- Initialize Simulation ---
    let mut sim = VicsekSimulation::new(config).context("Failed to initialize simulation")?;
    info!(
        "Flock initialized: {} particles, v = {}, R = {}, eta = {:.4}, domain {}x{}",
        sim.current_particle_count(),
        sim.params().speed,
        sim.params().radius,
        sim.params().eta,
        sim.params().world_width,
        sim.params().world_height
    );
    debug!("Simulation Parameters: {:#?}", sim.params());

    let total_steps = sim.config().timing.total_steps;
    let mut record_interval_steps = sim.config().timing.record_interval_steps;
    if record_interval_steps == 0 {
        warn!("Record interval is 0 steps. Recording every step.");
        record_interval_steps = 1;
    }
    info!("Recording a snapshot every {} steps.", record_interval_steps);
    let mut recorder = SnapshotRecorder::new(record_interval_steps, total_steps);

    // --- Initial Snapshot (step 0) ---
    if sim.config().output.record_initial_state {
        info!("Recording initial snapshot (step 0)...");
        recorder.accept(&sim.snapshot())?;
    }

    // --- Simulation Loop ---
    info!("Starting simulation loop for {} steps...", total_steps);
    let start_time = Instant::now();
    let mut previous_print_time = start_time;
    let print_interval_secs = 5.0;

    for step in 0..total_steps {
        let step_start_time = Instant::now();
        if let Err(e) = sim.step() {
            error!("Error during simulation step {}: {}", step + 1, e);
            anyhow::bail!("Simulation step failed.");
        }
        let step_duration = step_start_time.elapsed();

        let snapshot = sim.snapshot();
        recorder.accept(&snapshot)?;

        let current_time = Instant::now();
        let should_print_status =
            current_time.duration_since(previous_print_time).as_secs_f64() >= print_interval_secs;
        let is_record_step = recorder.should_record(step + 1);
        let is_last_step = step + 1 == total_steps;

        if should_print_status || is_last_step || (is_record_step && record_interval_steps > 1) {
            info!(
                "Step [{}/{}] | Order: {:.4} | Mean neighbors: {:.2} | Step Time: {:6.3} ms | Elapsed: {:.2} s",
                step + 1,
                total_steps,
                snapshot.order_parameter,
                snapshot.mean_neighbor_count,
                step_duration.as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );
            previous_print_time = current_time;
        } else {
            trace!(
                "Step [{}/{}] completed in {:.3} ms",
                step + 1,
                total_steps,
                step_duration.as_secs_f64() * 1000.0
            );
        }
    }
    recorder.finish()?;

    let total_duration = start_time.elapsed();
    info!("Simulation finished in {:.3} seconds.", total_duration.as_secs_f64());

    // --- Save Recorded Data ---
    let output = sim.config().output.clone();
    if output.save_snapshots {
        let filename = format!("{}_snapshots.{}", output.base_filename, output.format.extension());
        let snapshots = recorder.snapshots();
        match write_snapshots(&filename, output.format, snapshots) {
            Ok(()) => info!("{} snapshots saved to {} ({:?})", snapshots.len(), filename, output.format),
            Err(e) => error!("Error saving snapshots to '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving snapshots as per config (save_snapshots is false).");
    }

    if output.save_final_positions {
        let filename = format!("{}_final_positions.csv", output.base_filename);
        match save_final_positions(&filename, &sim) {
            Ok(()) => info!("Final positions saved to {}", filename),
            Err(e) => error!("Error saving CSV file '{}': {}", filename, e),
        }
    } else {
        info!("Skipping saving final positions as per config.");
    }

    info!("Simulation Complete.");
    Ok(())
}
