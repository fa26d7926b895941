// src/lib.rs - Kinematics engine for non-Cartesian CNC machines

pub mod alarm;
pub mod config;
pub mod motion;

pub use alarm::{AlarmKind, AlarmLog, AlarmSink};
pub use config::{Config, ConfigError, load_config};
pub use motion::{CartesianPoint, MotionDispatcher, MotionRequest};
