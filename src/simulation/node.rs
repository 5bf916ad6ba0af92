//! Sensor node model: energy balance, range gating and reading refresh.
//!
//! One `Node` type serves both scheduler variants. The discrete cycle
//! scheduler exercises the energy rules (`sense`/`transmit`), the continuous
//! frame scheduler exercises the wall-clock-gated refresh path
//! (`update_readings`/`should_send_packet`), which has no energy model.
//!
//! Invariants:
//! - `battery` stays in [0, 100] and never increases. The moment a deduction
//!   would push it below zero it is clamped to exactly 0 and the node
//!   deactivates in the same step.
//! - `active` transitions true→false at most once and never back.
//! - After deactivation no operation mutates `readings` or `battery`.

use embassy_time::{Duration, Instant};
use rand::Rng;

use super::geometry::distance;
use super::readings::{DataType, ReadingProfile};
use super::types::{
    DEFAULT_BATTERY, DEFAULT_COMM_RANGE, DEFAULT_ENERGY_PER_SENSE, DEFAULT_ENERGY_PER_TRANSMIT,
    DEFAULT_SENSING_RANGE, NodeSnapshot, Point, Readings,
};

/// A simulated sensor node.
///
/// Identity and position are fixed at creation. The reading map is seeded
/// with a zero for every key of the node's data type so the key set is
/// stable for the node's whole lifetime.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: u32,
    pub position: Point,
    pub data_type: DataType,
    pub battery: f64,
    pub sensing_range: f64,
    pub comm_range: f64,
    pub active: bool,
    pub readings: Readings,
    pub energy_per_sense: f64,
    pub energy_per_transmit: f64,
    /// When the readings were last regenerated (continuous variant).
    last_refresh: Instant,
    /// When the send trigger last fired (continuous variant).
    last_packet_send: Instant,
}

impl Node {
    /// Create a node with default energy budget and ranges.
    ///
    /// `created_at` anchors the continuous-variant timers; the discrete
    /// scheduler never reads them, so any instant works there.
    pub fn new(id: u32, position: Point, data_type: DataType, profile: &ReadingProfile, created_at: Instant) -> Self {
        let mut readings = Readings::new();
        profile.seed_zeroes(data_type, &mut readings);
        Self {
            id,
            position,
            data_type,
            battery: DEFAULT_BATTERY,
            sensing_range: DEFAULT_SENSING_RANGE,
            comm_range: DEFAULT_COMM_RANGE,
            active: true,
            readings,
            energy_per_sense: DEFAULT_ENERGY_PER_SENSE,
            energy_per_transmit: DEFAULT_ENERGY_PER_TRANSMIT,
            last_refresh: created_at,
            last_packet_send: created_at,
        }
    }

    /// Sense the environment, spending `energy_per_sense`.
    ///
    /// Soft-fails with `None` if the node is inactive or drained (forcing
    /// deactivation on the latter). On success every reading key of the
    /// node's data type is resampled from its profile interval and the
    /// updated readings are returned, including when this very sense
    /// empties the battery.
    pub fn sense(&mut self, profile: &ReadingProfile, rng: &mut impl Rng) -> Option<Readings> {
        if !self.active || self.battery <= 0.0 {
            self.active = false;
            return None;
        }
        profile.sample_into(self.data_type, &mut self.readings, rng);
        self.battery -= self.energy_per_sense;
        if self.battery <= 0.0 {
            self.battery = 0.0;
            self.active = false;
        }
        Some(self.readings.clone())
    }

    /// Attempt to transmit to a collector at `collector_pos`.
    ///
    /// Soft-fails (false, no state change) when inactive or drained, and
    /// when the collector is beyond `comm_range`: out-of-range is not a
    /// battery-consuming failure. In range, the cost scales with normalized
    /// distance: `energy_per_transmit * (distance / comm_range)`, exactly 0
    /// at distance 0 and the full cost at the edge of range.
    pub fn transmit(&mut self, collector_pos: &Point) -> bool {
        if !self.active || self.battery <= 0.0 {
            self.active = false;
            return false;
        }
        let dist = distance(&self.position, collector_pos);
        if dist > self.comm_range {
            return false;
        }
        self.battery -= self.energy_per_transmit * (dist / self.comm_range);
        if self.battery <= 0.0 {
            self.battery = 0.0;
            self.active = false;
        }
        true
    }

    /// Regenerate readings if at least `interval` has passed since the last
    /// refresh. No energy is spent; this path never deactivates a node.
    ///
    /// Returns true when the readings were regenerated.
    pub fn update_readings(
        &mut self,
        profile: &ReadingProfile,
        rng: &mut impl Rng,
        now: Instant,
        interval: Duration,
    ) -> bool {
        if now.duration_since(self.last_refresh) < interval {
            return false;
        }
        profile.sample_into(self.data_type, &mut self.readings, rng);
        self.last_refresh = now;
        true
    }

    /// Edge trigger for packet sends: fires true at most once per `interval`,
    /// independently of the reading refresh. The caller still applies the
    /// communication-radius gate before actually spawning a packet.
    pub fn should_send_packet(&mut self, now: Instant, interval: Duration) -> bool {
        if now.duration_since(self.last_packet_send) < interval {
            return false;
        }
        self.last_packet_send = now;
        true
    }

    /// Read-only view for the boundary layer.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            node_id: self.id,
            position: self.position,
            data_type: self.data_type,
            battery: self.battery,
            active: self.active,
            readings: self.readings.clone(),
        }
    }
}
