//! Continuous frame scheduler and the in-flight packet model.
//!
//! The animated-loop variant: a fixed-rate frame loop advances per-node
//! refresh timers and packet positions using the elapsed frame delta. There
//! is no energy model here: nodes never deactivate. Update order per frame:
//! refresh readings → evaluate send triggers and spawn packets → advance all
//! live packets → overwrite the coordinator snapshot.

use embassy_time::{Duration, Instant};
use rand::Rng;

use super::collector::Coordinator;
use super::geometry::{distance, lerp};
use super::node::Node;
use super::readings::ReadingProfile;
use super::types::{NodeSnapshot, PacketSnapshot, Point};

/// A reading in flight between a node and the coordinator.
///
/// Purely an arrival-timing model: `progress` runs monotonically from 0 at
/// the source to 1 at the destination, and the position is derived by linear
/// interpolation. Packets are transient values owned by the scheduler's
/// live set only while in flight.
#[derive(Debug, Clone)]
pub struct Packet {
    source: Point,
    dest: Point,
    progress: f64,
}

impl Packet {
    pub fn new(source: Point, dest: Point) -> Self {
        Self { source, dest, progress: 0.0 }
    }

    /// Advance by `(speed * dt) / flight_distance`, clamped to 1.0.
    ///
    /// A zero-length flight arrives immediately instead of dividing by zero.
    pub fn update(&mut self, dt: f64, speed: f64) {
        let dist = distance(&self.source, &self.dest);
        if dist > 0.0 {
            self.progress += (speed * dt) / dist;
        } else {
            self.progress = 1.0;
        }
        if self.progress >= 1.0 {
            self.progress = 1.0;
        }
    }

    pub fn is_arrived(&self) -> bool {
        self.progress >= 1.0
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Current position, interpolated between source and destination.
    pub fn position(&self) -> Point {
        lerp(&self.source, &self.dest, self.progress)
    }
}

/// Result of one frame step.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Nodes whose readings were regenerated this frame.
    pub refreshed: Vec<u32>,
    /// Packets spawned this frame.
    pub spawned: usize,
    /// Packets that arrived and were removed this frame.
    pub arrived: usize,
}

/// Drives independent per-node refresh intervals and the packet live set.
pub struct FrameScheduler {
    nodes: Vec<Node>,
    coordinator: Coordinator,
    packets: Vec<Packet>,
    profile: ReadingProfile,
    /// Gate for both reading refresh and the packet-send edge trigger.
    refresh_interval: Duration,
    /// Fixed communication radius for packet sends (strictly-below check).
    comm_radius: f64,
    /// Packet flight speed in field units per second.
    packet_speed: f64,
}

impl FrameScheduler {
    pub fn new(
        nodes: Vec<Node>,
        coordinator: Coordinator,
        profile: ReadingProfile,
        refresh_interval: Duration,
        comm_radius: f64,
        packet_speed: f64,
    ) -> Self {
        Self {
            nodes,
            coordinator,
            packets: Vec::new(),
            profile,
            refresh_interval,
            comm_radius,
            packet_speed,
        }
    }

    /// Advance the simulation by one frame.
    ///
    /// `now` is the frame's virtual timestamp, `dt` the elapsed time since
    /// the previous frame in seconds. Both are injected so tests can step
    /// frames without real delays.
    pub fn step(&mut self, now: Instant, dt: f64, rng: &mut impl Rng) -> FrameReport {
        let mut report = FrameReport::default();

        for node in &mut self.nodes {
            if node.update_readings(&self.profile, rng, now, self.refresh_interval) {
                report.refreshed.push(node.id);
            }
        }

        let coordinator_pos = self.coordinator.position;
        for node in &mut self.nodes {
            if node.should_send_packet(now, self.refresh_interval)
                && distance(&node.position, &coordinator_pos) < self.comm_radius
            {
                self.packets.push(Packet::new(node.position, coordinator_pos));
                report.spawned += 1;
            }
        }

        for packet in &mut self.packets {
            packet.update(dt, self.packet_speed);
        }
        // Arrivals leave the live set the same step they reach 1.0
        self.packets.retain(|packet| {
            if packet.is_arrived() {
                report.arrived += 1;
                false
            } else {
                true
            }
        });

        self.coordinator.update_data(&self.nodes);
        report
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn node_snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(Node::snapshot).collect()
    }

    pub fn packet_snapshots(&self) -> Vec<PacketSnapshot> {
        self.packets
            .iter()
            .map(|p| PacketSnapshot { position: p.position(), progress: p.progress() })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::readings::DataType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const REFRESH: Duration = Duration::from_millis(3000);

    fn p(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    fn field_scheduler(comm_radius: f64, packet_speed: f64) -> FrameScheduler {
        let profile = ReadingProfile::default();
        let t0 = Instant::from_ticks(0);
        let nodes = vec![
            Node::new(1, p(150.0, 100.0), DataType::Env, &profile, t0),
            Node::new(2, p(150.0, 500.0), DataType::Soil, &profile, t0),
            Node::new(3, p(750.0, 100.0), DataType::Relay, &profile, t0),
        ];
        let coordinator = Coordinator::new(p(750.0, 500.0));
        FrameScheduler::new(nodes, coordinator, profile, REFRESH, comm_radius, packet_speed)
    }

    #[test]
    fn packet_progress_is_monotone_and_removed_on_arrival() {
        // Node 3 sits 400 units from the coordinator, inside a 450 radius.
        // Speed 200 finishes the flight before the next send trigger.
        let mut scheduler = field_scheduler(450.0, 200.0);
        let mut rng = StdRng::seed_from_u64(11);

        // First frame past the interval: node 3 spawns, nodes 1/2 are out of range
        let report = scheduler.step(Instant::from_millis(3000), 1.0 / 30.0, &mut rng);
        assert_eq!(report.spawned, 1);
        assert_eq!(scheduler.packets().len(), 1);

        let mut last_progress = 0.0;
        let mut arrivals = 0;
        let mut frame = 1;
        while !scheduler.packets().is_empty() {
            let now = Instant::from_millis(3000 + frame * 33);
            let report = scheduler.step(now, 0.033, &mut rng);
            arrivals += report.arrived;
            if let Some(packet) = scheduler.packets().first() {
                assert!(packet.progress() >= last_progress, "progress went backwards");
                assert!(packet.progress() < 1.0, "arrived packet still live");
                last_progress = packet.progress();
            }
            frame += 1;
            assert!(frame < 90, "packet never arrived");
        }
        assert_eq!(arrivals, 1);
        assert!(scheduler.packets().is_empty());
    }

    #[test]
    fn zero_length_flight_arrives_in_one_step() {
        let mut packet = Packet::new(p(10.0, 10.0), p(10.0, 10.0));
        packet.update(0.033, 100.0);
        assert!(packet.is_arrived());
        assert!(!packet.progress().is_nan());
        assert_eq!(packet.position(), p(10.0, 10.0));
    }

    #[test]
    fn out_of_radius_nodes_never_spawn_packets() {
        // Radius smaller than every node-coordinator distance
        let mut scheduler = field_scheduler(100.0, 100.0);
        let mut rng = StdRng::seed_from_u64(11);
        for frame in 0..300u64 {
            scheduler.step(Instant::from_millis(frame * 33), 0.033, &mut rng);
            assert!(scheduler.packets().is_empty());
        }
    }

    #[test]
    fn send_trigger_fires_once_per_interval_even_out_of_range() {
        let mut scheduler = field_scheduler(450.0, 100.0);
        let mut rng = StdRng::seed_from_u64(11);
        // One spawn at the 3 s mark, none on the frames right after
        let report = scheduler.step(Instant::from_millis(3000), 0.033, &mut rng);
        assert_eq!(report.spawned, 1);
        let report = scheduler.step(Instant::from_millis(3033), 0.033, &mut rng);
        assert_eq!(report.spawned, 0);
        // Next interval boundary fires again
        let report = scheduler.step(Instant::from_millis(6000), 0.033, &mut rng);
        assert_eq!(report.spawned, 1);
    }

    #[test]
    fn readings_refresh_on_interval_and_persist_between() {
        let mut scheduler = field_scheduler(450.0, 100.0);
        let mut rng = StdRng::seed_from_u64(11);

        let report = scheduler.step(Instant::from_millis(100), 0.033, &mut rng);
        assert!(report.refreshed.is_empty());
        assert_eq!(scheduler.nodes()[0].readings["luminosity"], 0.0);

        let report = scheduler.step(Instant::from_millis(3000), 0.033, &mut rng);
        assert_eq!(report.refreshed, vec![1, 2, 3]);
        let luminosity = scheduler.nodes()[0].readings["luminosity"];
        assert!(luminosity >= 200.0);

        // No regeneration between intervals; values persist
        let report = scheduler.step(Instant::from_millis(3033), 0.033, &mut rng);
        assert!(report.refreshed.is_empty());
        assert_eq!(scheduler.nodes()[0].readings["luminosity"], luminosity);
        // Nodes never deactivate in this variant
        assert!(scheduler.nodes().iter().all(|n| n.active));
    }

    #[test]
    fn coordinator_snapshot_is_last_write_wins() {
        let mut scheduler = field_scheduler(450.0, 100.0);
        let mut rng = StdRng::seed_from_u64(11);
        scheduler.step(Instant::from_millis(3000), 0.033, &mut rng);
        let first = scheduler.coordinator().latest()[&3].clone();
        scheduler.step(Instant::from_millis(6000), 0.033, &mut rng);
        let second = &scheduler.coordinator().latest()[&3];
        assert_eq!(second["rssi"], scheduler.nodes()[2].readings["rssi"]);
        assert_eq!(scheduler.coordinator().latest().len(), 3);
        // Overwritten, not appended
        assert_ne!(first["rssi"], second["rssi"]);
    }
}
