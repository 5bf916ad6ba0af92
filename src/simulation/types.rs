//! Type definitions for the simulation.
//!
//! Contains the data structures shared across the simulation core and the
//! boundary layer:
//! - Positions and reading maps
//! - Collector log records
//! - Snapshot types consumed by a renderer/reporting layer
//! - Boundary events and the channel that carries them

use chrono::NaiveDateTime;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::readings::DataType;

/// Default battery charge for a freshly deployed node (percent).
pub const DEFAULT_BATTERY: f64 = 100.0;
/// Default sensing range in field units.
pub const DEFAULT_SENSING_RANGE: f64 = 10.0;
/// Default communication range in field units.
pub const DEFAULT_COMM_RANGE: f64 = 50.0;
/// Battery cost of one sensing pass.
pub const DEFAULT_ENERGY_PER_SENSE: f64 = 0.05;
/// Battery cost of one full-range transmission. Shorter transmissions cost
/// proportionally less (see `Node::transmit`).
pub const DEFAULT_ENERGY_PER_TRANSMIT: f64 = 0.1;

/// Depth of the boundary event channel (simulation task → consumer).
/// Small to avoid unbounded buffering; the consumer drains continuously.
pub const SIM_EVENT_QUEUE_SIZE: usize = 100;
/// Bounded channel carrying boundary events out of the simulation task.
pub type SimEventQueue = embassy_sync::channel::Channel<CriticalSectionRawMutex, SimEvent, SIM_EVENT_QUEUE_SIZE>;
/// Receiver side of the boundary event channel.
pub type SimEventQueueReceiver = embassy_sync::channel::Receiver<'static, CriticalSectionRawMutex, SimEvent, SIM_EVENT_QUEUE_SIZE>;
/// Sender side of the boundary event channel.
pub type SimEventQueueSender = embassy_sync::channel::Sender<'static, CriticalSectionRawMutex, SimEvent, SIM_EVENT_QUEUE_SIZE>;

/// Simple 2D point in field coordinates
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Most recent reading values of a node, keyed by reading name.
/// Keys are stable per data type; values are overwritten in place.
pub type Readings = BTreeMap<&'static str, f64>;

/// One received reading in the collector's append-only log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Sender node ID.
    pub node_id: u32,
    /// Time the collector received the reading.
    pub timestamp: NaiveDateTime,
    /// The reading values as transmitted.
    pub readings: Readings,
}

/// Read-only view of one node, consumed once per rendered frame/cycle.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub node_id: u32,
    pub position: Point,
    pub data_type: DataType,
    pub battery: f64,
    pub active: bool,
    pub readings: Readings,
}

/// Read-only view of one in-flight packet.
#[derive(Debug, Clone)]
pub struct PacketSnapshot {
    /// Interpolated position between source and destination.
    pub position: Point,
    /// Flight progress in [0, 1].
    pub progress: f64,
}

/// Why a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The discrete scheduler exhausted its cycle budget.
    Completed,
    /// Every node went inactive before the cycle budget ran out.
    Depleted,
    /// The continuous run reached its configured duration.
    DurationElapsed,
}

/// Events published by the simulation task for the boundary layer.
///
/// The core never renders; a renderer consumes these to draw nodes,
/// transmission indicators and packets, and a reporting layer consumes the
/// terminal `Finished` event to persist the collector log.
#[derive(Debug)]
pub enum SimEvent {
    /// Environment problem reported to the boundary (never fatal to the core).
    Alert(String),
    /// Fresh snapshot of all nodes.
    NodesUpdated(Vec<NodeSnapshot>),
    /// A node transmitted successfully; carries everything an indicator needs.
    Transmission {
        node_id: u32,
        position: Point,
        readings: Readings,
        battery: f64,
        data_type: DataType,
    },
    /// A node sensed but could not reach the collector. Display-only, no retry.
    TransmitFailed { node_id: u32, cycle: u32 },
    /// A discrete cycle finished and the scheduler keeps running.
    CycleFinished { cycle: u32, max_cycles: u32 },
    /// Positions of all live packets this frame.
    PacketsUpdated(Vec<PacketSnapshot>),
    /// Per-node latest readings held by the continuous coordinator.
    CoordinatorUpdated(Vec<(u32, Readings)>),
    /// Terminal event. Carries the collector log for persistence; empty for
    /// continuous runs, which keep no log.
    Finished {
        reason: FinishReason,
        log: Vec<LogRecord>,
    },
}
