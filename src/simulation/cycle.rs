//! Discrete cycle scheduler: sense → transmit → log rounds.
//!
//! One call to [`CycleScheduler::run_cycle`] runs one full round across all
//! nodes synchronously; the caller decides the pacing (the simulation task
//! ticks it at a fixed interval, tests call it directly). Termination is
//! driven by two independent conditions (cycle budget exceeded, or total
//! exhaustion), whichever occurs first. Both are terminal and idempotent:
//! further calls are no-ops returning the same outcome.

use chrono::NaiveDateTime;
use rand::Rng;

use super::collector::Collector;
use super::node::Node;
use super::readings::{DataType, ReadingProfile};
use super::types::{NodeSnapshot, Point, Readings};

/// Outcome of one scheduler step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran and at least one node produced a reading.
    Running,
    /// The cycle budget is exhausted. Terminal.
    Completed,
    /// No node produced a reading this cycle. Terminal.
    Depleted,
}

/// Everything the boundary needs to draw one successful transmission.
#[derive(Debug, Clone)]
pub struct TransmissionNotice {
    pub node_id: u32,
    pub position: Point,
    pub readings: Readings,
    pub battery: f64,
    pub data_type: DataType,
}

/// Result of one `run_cycle` call.
#[derive(Debug)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// 1-indexed cycle number this report belongs to.
    pub cycle: u32,
    pub transmissions: Vec<TransmissionNotice>,
    /// Nodes that sensed but could not reach the collector. Display-only.
    pub failed: Vec<u32>,
}

/// Owns the nodes and the collector for the whole simulation lifetime.
pub struct CycleScheduler {
    nodes: Vec<Node>,
    collector: Collector,
    profile: ReadingProfile,
    cycle: u32,
    max_cycles: u32,
    terminal: Option<CycleOutcome>,
}

impl CycleScheduler {
    pub fn new(nodes: Vec<Node>, collector: Collector, profile: ReadingProfile, max_cycles: u32) -> Self {
        Self {
            nodes,
            collector,
            profile,
            cycle: 0,
            max_cycles,
            terminal: None,
        }
    }

    /// Run one cycle: every active node senses, then transmits; successful
    /// transmissions are logged by the collector.
    ///
    /// `timestamp` stamps the collector records; injecting it keeps the
    /// scheduler free of clock access.
    pub fn run_cycle(&mut self, rng: &mut impl Rng, timestamp: NaiveDateTime) -> CycleReport {
        if let Some(outcome) = self.terminal {
            return CycleReport {
                outcome,
                cycle: self.cycle,
                transmissions: Vec::new(),
                failed: Vec::new(),
            };
        }

        self.cycle += 1;
        if self.cycle > self.max_cycles {
            self.terminal = Some(CycleOutcome::Completed);
            return CycleReport {
                outcome: CycleOutcome::Completed,
                cycle: self.cycle,
                transmissions: Vec::new(),
                failed: Vec::new(),
            };
        }

        let mut transmissions = Vec::new();
        let mut failed = Vec::new();
        let mut produced = 0u32;
        let collector_pos = self.collector.position;

        for node in &mut self.nodes {
            if !node.active {
                continue;
            }
            let Some(readings) = node.sense(&self.profile, rng) else {
                continue;
            };
            produced += 1;
            if node.transmit(&collector_pos) {
                self.collector.receive(node.id, readings.clone(), timestamp);
                transmissions.push(TransmissionNotice {
                    node_id: node.id,
                    position: node.position,
                    readings,
                    battery: node.battery,
                    data_type: node.data_type,
                });
            } else {
                failed.push(node.id);
            }
        }

        let outcome = if produced == 0 {
            self.terminal = Some(CycleOutcome::Depleted);
            CycleOutcome::Depleted
        } else {
            CycleOutcome::Running
        };

        CycleReport {
            outcome,
            cycle: self.cycle,
            transmissions,
            failed,
        }
    }

    pub fn max_cycles(&self) -> u32 {
        self.max_cycles
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    pub fn node_snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(Node::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use embassy_time::Instant;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap().and_hms_opt(8, 30, 0).unwrap()
    }

    fn node_at(id: u32, x: f64, y: f64, data_type: DataType) -> Node {
        Node::new(id, Point { x, y }, data_type, &ReadingProfile::default(), Instant::from_ticks(0))
    }

    fn ring_scheduler(max_cycles: u32) -> CycleScheduler {
        let types = [
            DataType::Moisture,
            DataType::Temperature,
            DataType::Humidity,
            DataType::Light,
            DataType::Ph,
        ];
        let nodes = types
            .iter()
            .enumerate()
            .map(|(i, &dt)| node_at(i as u32, 50.0 + (i as f64), 50.0, dt))
            .collect();
        let collector = Collector::new(Point { x: 50.0, y: 50.0 });
        CycleScheduler::new(nodes, collector, ReadingProfile::default(), max_cycles)
    }

    #[test]
    fn runs_exactly_max_cycles_then_completes() {
        let mut scheduler = ring_scheduler(5);
        // Infinite energy: no node can deplete before the budget runs out
        for node in &mut scheduler.nodes {
            node.energy_per_sense = 0.0;
            node.energy_per_transmit = 0.0;
        }
        let mut rng = StdRng::seed_from_u64(3);
        for expected in 1..=5 {
            let report = scheduler.run_cycle(&mut rng, ts());
            assert_eq!(report.outcome, CycleOutcome::Running);
            assert_eq!(report.cycle, expected);
            assert_eq!(report.transmissions.len(), 5);
        }
        let report = scheduler.run_cycle(&mut rng, ts());
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.cycle, 6);
        assert!(report.transmissions.is_empty());
        // Terminal outcomes are idempotent no-ops
        let log_len = scheduler.collector().snapshot().len();
        let again = scheduler.run_cycle(&mut rng, ts());
        assert_eq!(again.outcome, CycleOutcome::Completed);
        assert_eq!(again.cycle, 6);
        assert_eq!(scheduler.collector().snapshot().len(), log_len);
        assert_eq!(log_len, 25);
    }

    #[test]
    fn depletes_when_no_node_produces_a_reading() {
        let mut scheduler = ring_scheduler(100);
        for node in &mut scheduler.nodes {
            node.battery = 0.04; // one sense at 0.05 drains it
        }
        let mut rng = StdRng::seed_from_u64(3);
        let first = scheduler.run_cycle(&mut rng, ts());
        // Every node still yields its final reading while draining, but the
        // drained node can no longer transmit it
        assert_eq!(first.outcome, CycleOutcome::Running);
        assert!(first.transmissions.is_empty());
        assert_eq!(first.failed.len(), 5);
        let second = scheduler.run_cycle(&mut rng, ts());
        assert_eq!(second.outcome, CycleOutcome::Depleted);
        assert!(second.transmissions.is_empty());
        // Still terminal on further ticks
        assert_eq!(scheduler.run_cycle(&mut rng, ts()).outcome, CycleOutcome::Depleted);
    }

    #[test]
    fn out_of_range_node_surfaces_failure_without_log_entry() {
        let collector = Collector::new(Point { x: 0.0, y: 0.0 });
        let mut far = node_at(7, 90.0, 0.0, DataType::Light);
        far.comm_range = 50.0;
        let mut scheduler = CycleScheduler::new(vec![far], collector, ReadingProfile::default(), 3);
        let mut rng = StdRng::seed_from_u64(3);
        let report = scheduler.run_cycle(&mut rng, ts());
        // Sensing happened, so the scheduler keeps running
        assert_eq!(report.outcome, CycleOutcome::Running);
        assert_eq!(report.failed, vec![7]);
        assert!(report.transmissions.is_empty());
        assert!(scheduler.collector().snapshot().is_empty());
        // Out-of-range transmission costs nothing beyond the sense
        assert_eq!(scheduler.nodes()[0].battery, 100.0 - 0.05);
    }

    #[test]
    fn battery_stays_in_bounds_over_long_runs() {
        let mut scheduler = ring_scheduler(10_000);
        let mut rng = StdRng::seed_from_u64(3);
        loop {
            let report = scheduler.run_cycle(&mut rng, ts());
            for node in scheduler.nodes() {
                assert!((0.0..=100.0).contains(&node.battery), "battery out of bounds");
            }
            if report.outcome != CycleOutcome::Running {
                break;
            }
        }
        // Default budget drains before 10k cycles: all nodes end dead
        assert!(scheduler.nodes().iter().all(|n| !n.active));
    }

    #[test]
    fn log_records_carry_node_id_and_timestamp() {
        let mut scheduler = ring_scheduler(1);
        let mut rng = StdRng::seed_from_u64(3);
        let stamp = ts();
        scheduler.run_cycle(&mut rng, stamp);
        let log = scheduler.collector().snapshot();
        assert_eq!(log.len(), 5);
        let ids: Vec<u32> = log.iter().map(|r| r.node_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert!(log.iter().all(|r| r.timestamp == stamp));
    }
}
