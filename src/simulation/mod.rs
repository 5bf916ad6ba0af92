//! Energy-aware sensor network simulation core.
//!
//! This module provides the complete simulation engine for a field of
//! wireless sensor nodes reporting to a base station. It integrates:
//! - The node model with energy-depletion and range-gating rules
//! - The collector's append-only reception log
//! - The discrete cycle scheduler (sense → transmit → log rounds)
//! - The continuous frame scheduler with the in-flight packet model
//!
//! ## Module Organization
//!
//! - `types`: Core data structures (points, records, snapshots, events)
//! - `readings`: Data types and injectable reading-generation profiles
//! - `node`: Sensor node state machine
//! - `collector`: Collector log and continuous coordinator
//! - `geometry`: Distance and interpolation helpers
//! - `cycle`: Discrete cycle scheduler
//! - `continuous`: Frame scheduler and packets
//! - `sim_task`: Embassy task driving either scheduler variant
//!
//! ## Public API
//!
//! The main entry point is `simulation_task`, spawned on the Embassy
//! executor. It publishes `SimEvent`s over the channel defined in `types`;
//! rendering and persistence live entirely on the consumer side.

pub mod collector;
pub mod continuous;
pub mod cycle;
pub mod geometry;
pub mod node;
pub mod readings;
pub mod sim_task;
pub mod types;

// Re-export the main simulation task for convenience
pub use sim_task::simulation_task;

// Re-export commonly used types
pub use types::{Point, SimEvent};
