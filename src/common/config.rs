//! Runner configuration loading.
//!
//! Settings that pace the simulation (intervals, budgets, output paths) live
//! in a `config.toml` next to the scene file. Every field has a default, so
//! a missing file just means "run the stock demo timings".

use serde::Deserialize;
use std::path::Path;

/// Which scheduler variant drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Event-driven rounds: one full sense→transmit→log cycle per tick.
    Discrete,
    /// Animated loop: fixed-rate frames with in-flight packets.
    Continuous,
}

/// Configuration for the simulation runner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SimulatorConfig {
    /// Scheduler variant to run.
    pub mode: Mode,
    /// Wall-clock interval between discrete cycles (ms).
    pub cycle_interval_ms: u64,
    /// Cycle budget for the discrete scheduler.
    pub max_cycles: u32,
    /// Frame rate of the continuous loop (Hz).
    pub frame_rate: u32,
    /// Reading refresh / packet send interval of the continuous loop (ms).
    pub refresh_interval_ms: u64,
    /// Packet flight speed in field units per second.
    pub packet_speed: f64,
    /// Fixed communication radius for continuous packet sends.
    pub comm_radius: f64,
    /// How long a continuous run lasts before finishing (virtual seconds).
    pub run_duration_secs: u64,
    /// Where the collector log is exported after a discrete run.
    pub csv_output: String,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Discrete,
            cycle_interval_ms: 2000,
            max_cycles: 5,
            frame_rate: 30,
            refresh_interval_ms: 3000,
            packet_speed: 100.0,
            comm_radius: 300.0,
            run_duration_secs: 30,
            csv_output: "wsn_data.csv".to_string(),
        }
    }
}

impl SimulatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(SimulatorConfig)` if the file was successfully loaded and parsed
    /// * `Err(String)` with a descriptive error message otherwise
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: SimulatorConfig = toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &str) -> std::path::PathBuf {
        let scene = Path::new(scene_path);
        scene.parent().unwrap_or(Path::new(".")).join("config.toml")
    }

    fn validate(&self) -> Result<(), String> {
        if self.cycle_interval_ms == 0 {
            return Err("cycle-interval-ms must be positive".to_string());
        }
        if self.frame_rate == 0 || self.frame_rate > 240 {
            return Err(format!("frame-rate {} outside supported range (1-240)", self.frame_rate));
        }
        if self.refresh_interval_ms == 0 {
            return Err("refresh-interval-ms must be positive".to_string());
        }
        if self.packet_speed <= 0.0 || self.comm_radius <= 0.0 {
            return Err("packet-speed and comm-radius must be positive".to_string());
        }
        if self.run_duration_secs == 0 {
            return Err("run-duration-secs must be positive".to_string());
        }
        Ok(())
    }
}
