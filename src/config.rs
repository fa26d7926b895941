//! # Machine Configuration
//!
//! Geometry, segmentation, sign convention, soft limits and validation are
//! all chosen here at load time.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [machine]
//! name = "wall plotter"
//! kinematics = "wall_plotter"
//! segment_length = 10.0
//!
//! [wall_plotter]
//! left_anchor = [-267.0, 250.0]
//! right_anchor = [267.0, 250.0]
//! root = "below"
//!
//! [actuators]
//! reversed = [true, false, false]
//!
//! [limits]
//! enabled = true
//! x = [-250.0, 250.0]
//! y = [-300.0, 200.0]
//! z = [-20.0, 20.0]
//!
//! [validator]
//! enabled = true
//! tolerance = 0.1
//! ```
//!
//! Arm machines use `kinematics = "polar_arm"` with a `[polar_arm]` table
//! (`arm_length`, `straight_y_position`) or `kinematics = "scara"` with a
//! `[scara]` table (`upper_arm`, `forearm`, `elbow_motor`, `min_reach`,
//! `home`).
//!
//! Missing tables and fields fall back to their defaults.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motion::kinematics::{Direction, GeometryError, KinematicsType, RootSelection, WorkEnvelope};
use crate::motion::validator::DEFAULT_TOLERANCE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub machine: MachineConfig,
    #[serde(default)]
    pub wall_plotter: WallPlotterConfig,
    #[serde(default)]
    pub corexy: CoreXYConfig,
    #[serde(default)]
    pub polar_arm: PolarArmConfig,
    #[serde(default)]
    pub scara: ScaraConfig,
    #[serde(default)]
    pub actuators: ActuatorConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
}

/// Machine-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MachineConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_kinematics")]
    pub kinematics: KinematicsType,
    /// Longest Cartesian XY distance covered by one segment.
    #[serde(default = "default_segment_length")]
    pub segment_length: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            name: None,
            kinematics: default_kinematics(),
            segment_length: default_segment_length(),
        }
    }
}

/// Two-cable plotter geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WallPlotterConfig {
    #[serde(default = "default_left_anchor")]
    pub left_anchor: [f64; 2],
    #[serde(default = "default_right_anchor")]
    pub right_anchor: [f64; 2],
    #[serde(default)]
    pub root: RootSelection,
}

impl Default for WallPlotterConfig {
    fn default() -> Self {
        Self {
            left_anchor: default_left_anchor(),
            right_anchor: default_right_anchor(),
            root: RootSelection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoreXYConfig {
    #[serde(default = "default_x_scaler")]
    pub x_scaler: f64,
}

impl Default for CoreXYConfig {
    fn default() -> Self {
        Self { x_scaler: default_x_scaler() }
    }
}

/// Arm on a Y carriage, perpendicular to X at `straight_y_position`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolarArmConfig {
    #[serde(default = "default_arm_length")]
    pub arm_length: f64,
    #[serde(default = "default_straight_y_position")]
    pub straight_y_position: f64,
}

impl Default for PolarArmConfig {
    fn default() -> Self {
        Self {
            arm_length: default_arm_length(),
            straight_y_position: default_straight_y_position(),
        }
    }
}

/// Two-link arm. `elbow_motor = false` means the elbow is belt driven
/// from the base. `home` defaults to the arm stretched out along +X.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScaraConfig {
    #[serde(default = "default_upper_arm")]
    pub upper_arm: f64,
    #[serde(default = "default_forearm")]
    pub forearm: f64,
    #[serde(default = "default_elbow_motor")]
    pub elbow_motor: bool,
    #[serde(default = "default_min_reach")]
    pub min_reach: f64,
    #[serde(default)]
    pub home: Option<[f64; 2]>,
}

impl Default for ScaraConfig {
    fn default() -> Self {
        Self {
            upper_arm: default_upper_arm(),
            forearm: default_forearm(),
            elbow_motor: default_elbow_motor(),
            min_reach: default_min_reach(),
            home: None,
        }
    }
}

/// Per-actuator mounting sense. When `reversed` is absent the geometry's
/// own convention applies.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActuatorConfig {
    #[serde(default)]
    pub reversed: Option<[bool; 3]>,
}

impl ActuatorConfig {
    pub fn directions(&self) -> Option<[Direction; 3]> {
        self.reversed.map(|r| r.map(Direction::from_reversed))
    }
}

/// Soft limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_travel")]
    pub x: [f64; 2],
    #[serde(default = "default_travel")]
    pub y: [f64; 2],
    #[serde(default = "default_travel")]
    pub z: [f64; 2],
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            x: default_travel(),
            y: default_travel(),
            z: default_travel(),
        }
    }
}

impl LimitsConfig {
    pub fn envelope(&self) -> Option<WorkEnvelope> {
        self.enabled.then_some(WorkEnvelope { x: self.x, y: self.y, z: self.z })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tolerance: default_tolerance(),
        }
    }
}

impl Config {
    /// Validate values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let segment_length = self.machine.segment_length;
        if !segment_length.is_finite() || segment_length <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "segment_length must be > 0, got {}",
                segment_length
            )));
        }
        if self.machine.kinematics == KinematicsType::WallPlotter
            && self.wall_plotter.left_anchor == self.wall_plotter.right_anchor
        {
            return Err(ConfigError::Invalid("wall_plotter anchors must be distinct".to_string()));
        }
        if self.machine.kinematics == KinematicsType::CoreXY && self.corexy.x_scaler == 0.0 {
            return Err(ConfigError::Invalid("corexy x_scaler must be non-zero".to_string()));
        }
        if self.machine.kinematics == KinematicsType::PolarArm && !(self.polar_arm.arm_length > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "polar_arm arm_length must be > 0, got {}",
                self.polar_arm.arm_length
            )));
        }
        if self.machine.kinematics == KinematicsType::SingleArmScara {
            let scara = &self.scara;
            if !(scara.upper_arm > 0.0 && scara.forearm > 0.0) {
                return Err(ConfigError::Invalid("scara arm lengths must be > 0".to_string()));
            }
            if !(scara.min_reach < scara.upper_arm + scara.forearm) {
                return Err(ConfigError::Invalid(format!(
                    "scara min_reach {} leaves no reachable area",
                    scara.min_reach
                )));
            }
        }
        if self.limits.enabled {
            for (axis, [min, max]) in [('x', self.limits.x), ('y', self.limits.y), ('z', self.limits.z)] {
                if !(min <= max) {
                    return Err(ConfigError::Invalid(format!(
                        "limits.{} min {} exceeds max {}",
                        axis, min, max
                    )));
                }
            }
        }
        if self.validator.enabled && !(self.validator.tolerance > 0.0) {
            return Err(ConfigError::Invalid("validator tolerance must be > 0".to_string()));
        }
        Ok(())
    }
}

// Default value functions
fn default_kinematics() -> KinematicsType { KinematicsType::WallPlotter }
fn default_segment_length() -> f64 { 10.0 }
fn default_left_anchor() -> [f64; 2] { [-267.0, 250.0] }
fn default_right_anchor() -> [f64; 2] { [267.0, 250.0] }
fn default_x_scaler() -> f64 { 1.0 }
fn default_arm_length() -> f64 { 803.275 }
fn default_straight_y_position() -> f64 { 228.6 }
fn default_upper_arm() -> f64 { 65.0 }
fn default_forearm() -> f64 { 50.0 }
fn default_elbow_motor() -> bool { true }
fn default_min_reach() -> f64 { 20.0 }
fn default_travel() -> [f64; 2] { [-1000.0, 1000.0] }
fn default_tolerance() -> f64 { DEFAULT_TOLERANCE }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                Err(ConfigError::Toml(e))
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            Err(ConfigError::Io(e))
        }
    }
}
