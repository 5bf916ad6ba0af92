//! Headless runner for the FieldSense sensor network simulation.
//!
//! Loads a scene, spawns the simulation task on an Embassy executor thread,
//! and consumes boundary events on the main thread: status logging, the
//! end-of-run summary, and CSV export of the collector log. A renderer
//! would consume the same event stream; none is linked here.

use embassy_executor::Executor;
use env_logger::Builder;
use log::{LevelFilter, error, info, warn};
use std::path::Path;
use std::thread;

use crate::common::config::{Mode, SimulatorConfig};
use crate::common::scene::load_scene;
use crate::csv_log::{export_log, import_log, latest_row};
use crate::simulation::types::{
    FinishReason, LogRecord, NodeSnapshot, Readings, SimEvent, SimEventQueue, SimEventQueueReceiver,
};

mod common;
mod csv_log;
mod simulation;
mod time_driver;

struct CliArgs {
    scene_path: String,
    mode: Option<Mode>,
    speed_percent: Option<u32>,
}

fn print_usage() {
    eprintln!("Usage: fieldsense-simulator <scene.json> [--mode discrete|continuous] [--speed <percent>]");
}

fn parse_args() -> Option<CliArgs> {
    let mut args = std::env::args().skip(1);
    let scene_path = args.next()?;
    let mut mode = None;
    let mut speed_percent = None;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--mode" => match args.next()?.as_str() {
                "discrete" => mode = Some(Mode::Discrete),
                "continuous" => mode = Some(Mode::Continuous),
                other => {
                    eprintln!("Unknown mode: {other}");
                    return None;
                }
            },
            "--speed" => {
                speed_percent = Some(args.next()?.parse().ok()?);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                return None;
            }
        }
    }
    Some(CliArgs { scene_path, mode, speed_percent })
}

fn format_readings(readings: &Readings) -> String {
    readings
        .iter()
        .map(|(key, value)| format!("{key}: {value:.1}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// End-of-run summary in the boundary log: totals, dead nodes, last records.
fn log_summary(reason: FinishReason, log: &[LogRecord], nodes: &[NodeSnapshot]) {
    match reason {
        FinishReason::Completed => info!("Simulation completed"),
        FinishReason::Depleted => info!("All nodes depleted"),
        FinishReason::DurationElapsed => info!("Run duration elapsed"),
    }
    info!("Total data points collected: {}", log.len());
    if !nodes.is_empty() {
        let dead = nodes.iter().filter(|n| !n.active).count();
        info!("Dead nodes: {}/{}", dead, nodes.len());
    }
    for record in log.iter().rev().take(5).rev() {
        info!(
            "Node {} at {}: {}",
            record.node_id,
            record.timestamp.format(csv_log::TIMESTAMP_FORMAT),
            format_readings(&record.readings)
        );
    }
}

/// Export the collector log and read it back the way the external
/// "latest readings" viewer does.
fn persist_log(csv_output: &str, log: &[LogRecord]) {
    if log.is_empty() {
        return;
    }
    let path = Path::new(csv_output);
    match export_log(path, log) {
        Ok(()) => info!("Exported {} records to {}", log.len(), csv_output),
        Err(err) => {
            warn!("Failed to export collector log to {csv_output}: {err}");
            return;
        }
    }
    match import_log(path) {
        Ok(rows) => {
            if let Some(latest) = latest_row(&rows) {
                let fields = latest
                    .values
                    .iter()
                    .map(|(key, value)| format!("{key}: {value:.1}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!("Latest field conditions ({}): {}", latest.timestamp.format(csv_log::TIMESTAMP_FORMAT), fields);
            }
        }
        Err(err) => warn!("Could not read back {csv_output}: {err}"),
    }
}

fn main() {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("fieldsense_simulator"), LevelFilter::Debug)
        .init();

    let Some(args) = parse_args() else {
        print_usage();
        std::process::exit(2);
    };

    if let Some(percent) = args.speed_percent {
        time_driver::set_simulation_speed_percent(percent);
        info!("Simulation speed set to {}%", time_driver::get_simulation_speed_percent());
    }

    let scene = match load_scene(&args.scene_path) {
        Ok(scene) => scene,
        Err(err) => {
            error!("Cannot load scene {}: {}", args.scene_path, err);
            std::process::exit(1);
        }
    };
    info!("Loaded scene with {} nodes from {}", scene.nodes.len(), args.scene_path);

    // The core never touches the image; warn early so a renderer's fallback
    // to a plain background is no surprise.
    if let Some(bg_image) = &scene.background_image {
        if !Path::new(bg_image).exists() {
            warn!("Background image {bg_image} not found, a renderer would fall back to a plain background");
        }
    }

    let config_path = SimulatorConfig::config_path_from_scene(&args.scene_path);
    let mut config = if config_path.exists() {
        match SimulatorConfig::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{err}; using default settings");
                SimulatorConfig::default()
            }
        }
    } else {
        info!("No config.toml next to the scene, using default settings");
        SimulatorConfig::default()
    };
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    let csv_output = config.csv_output.clone();

    let event_channel: &'static SimEventQueue = Box::leak(Box::new(SimEventQueue::new()));
    let event_tx = event_channel.sender();
    let event_rx: SimEventQueueReceiver = event_channel.receiver();

    // Spawn the Embassy executor on a dedicated background thread
    let _sim_handle = thread::Builder::new()
        .name("sim-executor".to_string())
        .spawn(move || {
            // Leak the executor to satisfy the 'static lifetime required by run()
            let executor: &'static mut Executor = Box::leak(Box::new(Executor::new()));
            executor.run(|spawner| {
                let _ = spawner.spawn(simulation::simulation_task(scene, config, event_tx));
            });
        })
        .expect("failed to spawn simulation thread");

    // Consume boundary events until the run finishes
    let mut latest_nodes: Vec<NodeSnapshot> = Vec::new();
    loop {
        match futures::executor::block_on(event_rx.receive()) {
            SimEvent::Alert(message) => warn!("{message}"),
            SimEvent::NodesUpdated(nodes) => {
                latest_nodes = nodes;
            }
            SimEvent::Transmission { node_id, readings, battery, data_type, .. } => {
                info!(
                    "Node {node_id} ({}) transmitted [{}], battery {battery:.1}%",
                    data_type.as_str(),
                    format_readings(&readings)
                );
            }
            SimEvent::TransmitFailed { node_id, cycle } => {
                info!("Node {node_id} failed to transmit (cycle {cycle})");
            }
            SimEvent::CycleFinished { cycle, max_cycles } => {
                info!("Cycle {cycle}/{max_cycles}");
            }
            SimEvent::PacketsUpdated(packets) => {
                log::debug!("{} packets in flight", packets.len());
            }
            SimEvent::CoordinatorUpdated(entries) => {
                for (node_id, readings) in &entries {
                    log::debug!("Coordinator holds node {node_id}: [{}]", format_readings(readings));
                }
            }
            SimEvent::Finished { reason, log } => {
                log_summary(reason, &log, &latest_nodes);
                persist_log(&csv_output, &log);
                break;
            }
        }
    }
}
