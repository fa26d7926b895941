// src/motion/types.rs - Value types shared by the kinematics engine
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of actuators driven by every geometry: two planar actuators plus Z.
pub const ACTUATOR_COUNT: usize = 3;

/// Index of the Z actuator. Z is never transformed by any geometry.
pub const Z_ACTUATOR: usize = 2;

/// A toolpath position in the machine frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub const ORIGIN: CartesianPoint = CartesianPoint { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Distance in the XY plane only.
    pub fn planar_distance(&self, other: &CartesianPoint) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn distance(&self, other: &CartesianPoint) -> f64 {
        let dz = other.z - self.z;
        (self.planar_distance(other).powi(2) + dz * dz).sqrt()
    }

    /// Linear interpolation of every axis, `t` in `[0, 1]`.
    pub fn lerp(&self, other: &CartesianPoint, t: f64) -> CartesianPoint {
        CartesianPoint {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for CartesianPoint {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for CartesianPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X{:.3} Y{:.3} Z{:.3}", self.x, self.y, self.z)
    }
}

/// Per-actuator positions, ordered `[a0, a1, z]`.
///
/// Depending on context the values are absolute lengths (the output of
/// inverse kinematics) or signed motor positions relative to the
/// calibration origin (what the planner receives).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActuatorVector(pub [f64; ACTUATOR_COUNT]);

impl ActuatorVector {
    pub const ZERO: ActuatorVector = ActuatorVector([0.0; ACTUATOR_COUNT]);

    pub const fn new(a0: f64, a1: f64, z: f64) -> Self {
        Self([a0, a1, z])
    }

    pub fn as_array(&self) -> [f64; ACTUATOR_COUNT] {
        self.0
    }

    pub fn z(&self) -> f64 {
        self.0[Z_ACTUATOR]
    }

    /// Euclidean distance between two actuator vectors.
    pub fn distance(&self, other: &ActuatorVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (b - a) * (b - a))
            .sum::<f64>()
            .sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl std::ops::Index<usize> for ActuatorVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl fmt::Display for ActuatorVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.4}, {:.4}, {:.4}]", self.0[0], self.0[1], self.0[2])
    }
}

/// Motion flags of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotionFlags {
    /// Non-cutting repositioning (G0). Never segmented.
    pub rapid: bool,
    /// Operator jog; the only kind of motion a planner normally cancels.
    pub jog: bool,
}

/// Planner metadata. The engine only rescales `feed_rate`; everything
/// else is passed through to the planner untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    pub feed_rate: f64,
    pub flags: MotionFlags,
    pub line_number: Option<u32>,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            feed_rate: 1000.0,
            flags: MotionFlags::default(),
            line_number: None,
        }
    }
}

/// One requested linear move in Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionRequest {
    pub current: CartesianPoint,
    pub target: CartesianPoint,
    pub params: MotionParams,
}

impl MotionRequest {
    pub fn new(current: CartesianPoint, target: CartesianPoint, params: MotionParams) -> Self {
        Self { current, target, params }
    }

    /// Feed-controlled move at `feed_rate`.
    pub fn linear(current: CartesianPoint, target: CartesianPoint, feed_rate: f64) -> Self {
        Self::new(
            current,
            target,
            MotionParams {
                feed_rate,
                ..MotionParams::default()
            },
        )
    }

    /// Rapid (non-cutting) move.
    pub fn rapid(current: CartesianPoint, target: CartesianPoint) -> Self {
        Self::new(
            current,
            target,
            MotionParams {
                flags: MotionFlags { rapid: true, jog: false },
                ..MotionParams::default()
            },
        )
    }

    pub fn is_rapid(&self) -> bool {
        self.params.flags.rapid
    }

    pub fn planar_distance(&self) -> f64 {
        self.current.planar_distance(&self.target)
    }
}
