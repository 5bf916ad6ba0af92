//! Scene loading, parsing, and validation logic.
//!
//! A scene JSON file describes the field: its dimensions, the collector
//! position, and every deployed node. Loading validates the layout before
//! the simulation ever sees it, so the core can assume positive ranges and
//! in-bounds positions.

use anyhow::Context;
use embassy_time::Instant;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

use crate::simulation::node::Node;
use crate::simulation::readings::{DataType, ReadingProfile};
use crate::simulation::types::{
    DEFAULT_BATTERY, DEFAULT_COMM_RANGE, DEFAULT_ENERGY_PER_SENSE, DEFAULT_ENERGY_PER_TRANSMIT,
    DEFAULT_SENSING_RANGE, Point,
};

/// Error type for scene loading failures.
#[derive(Debug)]
pub enum SceneLoadError {
    FileReadError(String),
    ParseError(String),
    ValidationError(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::FileReadError(msg) => write!(f, "Failed to read file: {}", msg),
            SceneLoadError::ParseError(msg) => write!(f, "Failed to parse JSON: {}", msg),
            SceneLoadError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for SceneLoadError {}

fn default_battery() -> f64 {
    DEFAULT_BATTERY
}

fn default_sensing_range() -> f64 {
    DEFAULT_SENSING_RANGE
}

fn default_comm_range() -> f64 {
    DEFAULT_COMM_RANGE
}

fn default_energy_per_sense() -> f64 {
    DEFAULT_ENERGY_PER_SENSE
}

fn default_energy_per_transmit() -> f64 {
    DEFAULT_ENERGY_PER_TRANSMIT
}

/// One deployed node as described by the scene file.
#[derive(Deserialize, Clone)]
pub struct SceneNode {
    pub node_id: u32,
    pub position: Point,
    pub data_type: DataType,
    #[serde(default = "default_battery")]
    pub battery: f64,
    #[serde(default = "default_sensing_range")]
    pub sensing_range: f64,
    #[serde(default = "default_comm_range")]
    pub comm_range: f64,
    #[serde(default = "default_energy_per_sense")]
    pub energy_per_sense: f64,
    #[serde(default = "default_energy_per_transmit")]
    pub energy_per_transmit: f64,
}

impl SceneNode {
    /// Build the runtime node for this scene entry.
    pub fn build(&self, profile: &ReadingProfile, created_at: Instant) -> Node {
        let mut node = Node::new(self.node_id, self.position, self.data_type, profile, created_at);
        node.battery = self.battery;
        node.sensing_range = self.sensing_range;
        node.comm_range = self.comm_range;
        node.energy_per_sense = self.energy_per_sense;
        node.energy_per_transmit = self.energy_per_transmit;
        node
    }
}

/// Root structure representing the entire scene.
#[derive(Deserialize, Clone)]
pub struct Scene {
    /// Width of the field in field units.
    pub field_width: f64,
    /// Height of the field in field units.
    pub field_height: f64,
    /// Fixed position of the collector / base station.
    pub collector_position: Point,
    /// All nodes deployed in the field.
    pub nodes: Vec<SceneNode>,
    /// Optional path to a background image. The core never loads it; the
    /// boundary layer may, and falls back to a plain background if missing.
    #[serde(default)]
    pub background_image: Option<String>,
}

/// Load and parse a scene from a file.
///
/// # Parameters
///
/// * `path` - Path to the scene JSON file
///
/// # Returns
///
/// Parsed and validated Scene or an error.
pub fn load_scene(path: &str) -> Result<Scene, SceneLoadError> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path))
        .map_err(|e| SceneLoadError::FileReadError(e.to_string()))?;

    let mut scene: Scene = serde_json::from_str(&data)
        .context("Invalid JSON format")
        .map_err(|e| SceneLoadError::ParseError(e.to_string()))?;

    // If background_image is specified, prepend the scene file's directory
    if let Some(ref bg_image) = scene.background_image {
        use std::path::Path;
        if let Some(parent_dir) = Path::new(path).parent() {
            let full_path = parent_dir.join(bg_image);
            scene.background_image = Some(full_path.to_string_lossy().to_string());
        }
    }

    validate_scene(&scene).map_err(SceneLoadError::ValidationError)?;

    Ok(scene)
}

/// Validate scene configuration to reject malformed inputs.
///
/// Checks for issues that would cause runtime problems:
/// - Empty field or excessive node count
/// - Duplicate node IDs
/// - Node or collector positions outside the field
/// - Battery outside [0, 100]
/// - Non-positive sensing/communication ranges
/// - Negative energy costs
///
/// # Returns
///
/// `Ok(())` if validation passes, `Err(String)` with a description otherwise.
pub fn validate_scene(scene: &Scene) -> Result<(), String> {
    const MAX_NODES: usize = 1000;

    if scene.field_width <= 0.0 || scene.field_height <= 0.0 {
        return Err(format!(
            "Field dimensions {}x{} must be positive",
            scene.field_width, scene.field_height
        ));
    }

    if scene.nodes.is_empty() {
        return Err("Scene must contain at least one node".to_string());
    }
    if scene.nodes.len() > MAX_NODES {
        return Err(format!("Node count {} exceeds maximum of {}", scene.nodes.len(), MAX_NODES));
    }

    let in_field = |p: &Point| p.x >= 0.0 && p.x <= scene.field_width && p.y >= 0.0 && p.y <= scene.field_height;

    if !in_field(&scene.collector_position) {
        return Err(format!(
            "Collector position ({}, {}) lies outside the field",
            scene.collector_position.x, scene.collector_position.y
        ));
    }

    let mut node_ids = HashSet::new();
    for node in &scene.nodes {
        if !node_ids.insert(node.node_id) {
            return Err(format!("Duplicate node_id found: {}", node.node_id));
        }

        if !in_field(&node.position) {
            return Err(format!(
                "Node {} position ({}, {}) lies outside the field",
                node.node_id, node.position.x, node.position.y
            ));
        }
        if !(0.0..=100.0).contains(&node.battery) {
            return Err(format!(
                "Node {} battery {} outside valid range (0-100)",
                node.node_id, node.battery
            ));
        }
        if node.sensing_range <= 0.0 || node.comm_range <= 0.0 {
            return Err(format!(
                "Node {} ranges (sensing {}, comm {}) must be positive",
                node.node_id, node.sensing_range, node.comm_range
            ));
        }
        if node.energy_per_sense < 0.0 || node.energy_per_transmit < 0.0 {
            return Err(format!(
                "Node {} energy costs must be non-negative",
                node.node_id
            ));
        }
    }

    Ok(())
}
