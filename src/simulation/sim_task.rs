//! Central simulation task driving the scheduler and boundary updates.
//!
//! One task per run, spawned on the Embassy executor. Depending on the
//! configured mode it either ticks the discrete cycle scheduler at the
//! cycle interval, or steps the continuous frame scheduler at the frame
//! rate. All scheduler work happens synchronously inside the tick; the
//! task only sleeps between ticks and forwards reports as `SimEvent`s.

use chrono::Local;
use embassy_time::{Duration, Instant, Ticker};

use crate::common::config::{Mode, SimulatorConfig};
use crate::common::scene::Scene;

use super::collector::{Collector, Coordinator};
use super::continuous::FrameScheduler;
use super::cycle::{CycleOutcome, CycleScheduler};
use super::readings::ReadingProfile;
use super::types::{FinishReason, SimEvent, SimEventQueueSender};

/// Entry point for the simulation. Runs until the scheduler reaches a
/// terminal state, then emits `SimEvent::Finished` and returns.
#[embassy_executor::task]
pub async fn simulation_task(scene: Scene, config: SimulatorConfig, event_tx: SimEventQueueSender) {
    log::info!("Simulation starting in {:?} mode with {} nodes", config.mode, scene.nodes.len());
    match config.mode {
        Mode::Discrete => run_discrete(scene, config, event_tx).await,
        Mode::Continuous => run_continuous(scene, config, event_tx).await,
    }
    log::info!("Simulation task finished");
}

/// Discrete variant: one full cycle per tick, fixed tick interval.
async fn run_discrete(scene: Scene, config: SimulatorConfig, event_tx: SimEventQueueSender) {
    let profile = ReadingProfile::default();
    let created_at = Instant::now();
    let nodes = scene.nodes.iter().map(|n| n.build(&profile, created_at)).collect();
    let collector = Collector::new(scene.collector_position);
    let mut scheduler = CycleScheduler::new(nodes, collector, profile, config.max_cycles);

    event_tx.send(SimEvent::NodesUpdated(scheduler.node_snapshots())).await;

    let mut ticker = Ticker::every(Duration::from_millis(config.cycle_interval_ms));
    let mut rng = rand::thread_rng();

    loop {
        ticker.next().await;
        let timestamp = Local::now().naive_local();
        let report = scheduler.run_cycle(&mut rng, timestamp);

        for notice in report.transmissions {
            event_tx
                .send(SimEvent::Transmission {
                    node_id: notice.node_id,
                    position: notice.position,
                    readings: notice.readings,
                    battery: notice.battery,
                    data_type: notice.data_type,
                })
                .await;
        }
        for node_id in report.failed {
            log::info!("Node {node_id} failed to transmit in cycle {}", report.cycle);
            event_tx.send(SimEvent::TransmitFailed { node_id, cycle: report.cycle }).await;
        }
        event_tx.send(SimEvent::NodesUpdated(scheduler.node_snapshots())).await;

        match report.outcome {
            CycleOutcome::Running => {
                event_tx
                    .send(SimEvent::CycleFinished {
                        cycle: report.cycle,
                        max_cycles: scheduler.max_cycles(),
                    })
                    .await;
            }
            CycleOutcome::Completed => {
                event_tx
                    .send(SimEvent::Finished {
                        reason: FinishReason::Completed,
                        log: scheduler.collector().snapshot().to_vec(),
                    })
                    .await;
                break;
            }
            CycleOutcome::Depleted => {
                event_tx
                    .send(SimEvent::Finished {
                        reason: FinishReason::Depleted,
                        log: scheduler.collector().snapshot().to_vec(),
                    })
                    .await;
                break;
            }
        }
    }
}

/// Continuous variant: fixed-rate frame loop until the configured duration
/// elapses. The frame delta is measured, not assumed, so a stalled frame
/// advances packets by the actual elapsed time.
async fn run_continuous(scene: Scene, config: SimulatorConfig, event_tx: SimEventQueueSender) {
    let profile = ReadingProfile::default();
    let started = Instant::now();
    let nodes = scene.nodes.iter().map(|n| n.build(&profile, started)).collect();
    let coordinator = Coordinator::new(scene.collector_position);
    let mut scheduler = FrameScheduler::new(
        nodes,
        coordinator,
        profile,
        Duration::from_millis(config.refresh_interval_ms),
        config.comm_radius,
        config.packet_speed,
    );

    event_tx.send(SimEvent::NodesUpdated(scheduler.node_snapshots())).await;

    let run_duration = Duration::from_secs(config.run_duration_secs);
    let mut ticker = Ticker::every(Duration::from_millis(1000 / config.frame_rate as u64));
    let mut rng = rand::thread_rng();
    let mut last_frame = started;

    loop {
        ticker.next().await;
        let now = Instant::now();
        let dt = now.duration_since(last_frame).as_micros() as f64 / 1_000_000.0;
        last_frame = now;

        let report = scheduler.step(now, dt, &mut rng);

        if !report.refreshed.is_empty() {
            event_tx.send(SimEvent::NodesUpdated(scheduler.node_snapshots())).await;
            event_tx
                .send(SimEvent::CoordinatorUpdated(
                    scheduler
                        .coordinator()
                        .latest()
                        .iter()
                        .map(|(id, readings)| (*id, readings.clone()))
                        .collect(),
                ))
                .await;
        }
        if report.spawned > 0 || report.arrived > 0 || !scheduler.packets().is_empty() {
            event_tx.send(SimEvent::PacketsUpdated(scheduler.packet_snapshots())).await;
        }

        if now.duration_since(started) >= run_duration {
            event_tx
                .send(SimEvent::Finished {
                    reason: FinishReason::DurationElapsed,
                    log: Vec::new(),
                })
                .await;
            break;
        }
    }
}
