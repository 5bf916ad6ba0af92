//! Collector (base station) and the continuous coordinator.
//!
//! Both are intentionally dumb sinks: all business logic lives in the node
//! and scheduler layers. The discrete [`Collector`] keeps an append-only log
//! of received readings; the continuous [`Coordinator`] keeps only the
//! latest readings per node, overwritten every frame.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::node::Node;
use super::types::{LogRecord, Point, Readings};

/// Base station with an append-only reception log.
#[derive(Debug)]
pub struct Collector {
    pub position: Point,
    log: Vec<LogRecord>,
}

impl Collector {
    pub fn new(position: Point) -> Self {
        Self { position, log: Vec::new() }
    }

    /// Append one received reading. No validation beyond structural shape.
    pub fn receive(&mut self, node_id: u32, readings: Readings, timestamp: NaiveDateTime) {
        self.log.push(LogRecord { node_id, timestamp, readings });
    }

    /// Read-only view of the log, in reception order.
    pub fn snapshot(&self) -> &[LogRecord] {
        &self.log
    }
}

/// Coordinator of the continuous variant: last-write-wins per-node view,
/// not log-based.
#[derive(Debug)]
pub struct Coordinator {
    pub position: Point,
    latest: BTreeMap<u32, Readings>,
}

impl Coordinator {
    pub fn new(position: Point) -> Self {
        Self { position, latest: BTreeMap::new() }
    }

    /// Overwrite the stored readings with each node's current map.
    pub fn update_data(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.latest.insert(node.id, node.readings.clone());
        }
    }

    /// Latest readings per node id.
    pub fn latest(&self) -> &BTreeMap<u32, Readings> {
        &self.latest
    }
}
