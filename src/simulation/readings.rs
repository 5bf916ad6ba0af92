//! Data types and reading-generation profiles.
//!
//! Every node carries a [`DataType`] tag that determines which reading keys
//! it produces and the interval each value is sampled from. The intervals
//! live in a [`ReadingProfile`] table rather than in the node itself, so
//! tests can substitute deterministic ranges without touching node logic.

use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

use super::types::Readings;

/// What a node measures.
///
/// The first five are single-reading agricultural sensors; `Env`, `Soil` and
/// `Relay` are the multi-reading station types used by the continuous field
/// demo. `Relay` only reports link strength: it does no routing.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Moisture,
    Temperature,
    Humidity,
    Light,
    Ph,
    Env,
    Soil,
    Relay,
}

impl DataType {
    /// Lower-case label used in log lines and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Moisture => "moisture",
            DataType::Temperature => "temperature",
            DataType::Humidity => "humidity",
            DataType::Light => "light",
            DataType::Ph => "ph",
            DataType::Env => "env",
            DataType::Soil => "soil",
            DataType::Relay => "relay",
        }
    }
}

/// One reading a data type produces: key plus its sampling interval.
#[derive(Debug, Clone, Copy)]
pub struct ReadingSpec {
    pub key: &'static str,
    pub lo: f64,
    pub hi: f64,
}

const MOISTURE_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "moisture", lo: 20.0, hi: 80.0 }];
const TEMPERATURE_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "temperature", lo: 15.0, hi: 35.0 }];
const HUMIDITY_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "humidity", lo: 20.0, hi: 80.0 }];
const LIGHT_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "light", lo: 100.0, hi: 1000.0 }];
const PH_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "ph", lo: 5.5, hi: 7.5 }];
const ENV_SPECS: &[ReadingSpec] = &[
    ReadingSpec { key: "luminosity", lo: 200.0, hi: 1000.0 },
    ReadingSpec { key: "uv", lo: 0.5, hi: 5.0 },
    ReadingSpec { key: "pressure", lo: 72000.0, hi: 73000.0 },
];
const SOIL_SPECS: &[ReadingSpec] = &[
    ReadingSpec { key: "soil_humidity", lo: 30.0, hi: 70.0 },
    ReadingSpec { key: "air_temp", lo: 15.0, hi: 35.0 },
    ReadingSpec { key: "air_humidity", lo: 40.0, hi: 80.0 },
];
const RELAY_SPECS: &[ReadingSpec] = &[ReadingSpec { key: "rssi", lo: -90.0, hi: -30.0 }];

fn default_specs(data_type: DataType) -> &'static [ReadingSpec] {
    match data_type {
        DataType::Moisture => MOISTURE_SPECS,
        DataType::Temperature => TEMPERATURE_SPECS,
        DataType::Humidity => HUMIDITY_SPECS,
        DataType::Light => LIGHT_SPECS,
        DataType::Ph => PH_SPECS,
        DataType::Env => ENV_SPECS,
        DataType::Soil => SOIL_SPECS,
        DataType::Relay => RELAY_SPECS,
    }
}

/// Table mapping each data type to its reading specs.
///
/// `Default` yields the built-in intervals above; `set` replaces the specs
/// for a type, which tests use to pin values (a degenerate interval with
/// `lo == hi` samples deterministically).
#[derive(Debug, Clone, Default)]
pub struct ReadingProfile {
    overrides: HashMap<DataType, Vec<ReadingSpec>>,
}

impl ReadingProfile {
    pub fn specs(&self, data_type: DataType) -> &[ReadingSpec] {
        match self.overrides.get(&data_type) {
            Some(specs) => specs,
            None => default_specs(data_type),
        }
    }

    /// Replace the specs for one data type.
    pub fn set(&mut self, data_type: DataType, specs: Vec<ReadingSpec>) {
        self.overrides.insert(data_type, specs);
    }

    /// Sample a fresh value for every key of `data_type` into `readings`.
    pub fn sample_into(&self, data_type: DataType, readings: &mut Readings, rng: &mut impl Rng) {
        for spec in self.specs(data_type) {
            readings.insert(spec.key, rng.gen_range(spec.lo..=spec.hi));
        }
    }

    /// Seed every key of `data_type` with 0.0 so the key set is stable from
    /// node construction onward.
    pub fn seed_zeroes(&self, data_type: DataType, readings: &mut Readings) {
        for spec in self.specs(data_type) {
            readings.insert(spec.key, 0.0);
        }
    }
}
