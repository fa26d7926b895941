// src/motion/kinematics.rs
//! Machine geometries.
//!
//! Every geometry maps between Cartesian space and actuator space through
//! the [`KinematicsModel`] trait. The model is chosen when the
//! configuration is loaded (see [`create_kinematics`]) and shared by the
//! dispatcher, the validator and status reporting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::motion::types::{ActuatorVector, CartesianPoint};

/// Raised by forward kinematics when the actuator values describe no point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("cable circles do not intersect (left {left:.3}, right {right:.3}, anchor separation {separation:.3})")]
    NoIntersection { left: f64, right: f64, separation: f64 },
    #[error("anchors must be distinct points")]
    CoincidentAnchors,
    #[error("actuator {index} has negative length {value:.3}")]
    NegativeLength { index: usize, value: f64 },
    #[error("non-finite coordinate")]
    NonFinite,
    #[error("x_scaler must be non-zero")]
    DegenerateScaler,
    #[error("{name} must be > 0, got {value}")]
    NonPositiveLength { name: &'static str, value: f64 },
    #[error("reach {distance:.3} outside [{min:.3}, {max:.3}]")]
    OutOfReach { distance: f64, min: f64, max: f64 },
    #[error("calibration point unreachable: {0}")]
    Unreachable(LimitViolation),
}

/// A target outside the reachable work envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LimitViolation {
    #[error("{axis} = {value:.3} outside travel [{min:.3}, {max:.3}]")]
    OutOfTravel { axis: char, value: f64, min: f64, max: f64 },
    #[error("X{x:.3} Y{y:.3} is not on the reachable side of the anchor line")]
    AnchorSide { x: f64, y: f64 },
    #[error("X{x:.3} Y{y:.3} is {distance:.3} from the pivot, reach is [{min:.3}, {max:.3}]")]
    OutOfReach { x: f64, y: f64, distance: f64, min: f64, max: f64 },
    #[error("move of {distance:.3} needs more than {max} segments of {segment_length}")]
    TooManySegments { distance: f64, segment_length: f64, max: u32 },
}

/// Supported machine geometries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KinematicsType {
    Cartesian,
    CoreXY,
    WallPlotter,
    PolarArm,
    SingleArmScara,
}

impl FromStr for KinematicsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cartesian" => Ok(KinematicsType::Cartesian),
            "corexy" | "core_xy" => Ok(KinematicsType::CoreXY),
            "wall_plotter" | "wallplotter" => Ok(KinematicsType::WallPlotter),
            "polar_arm" | "polararm" => Ok(KinematicsType::PolarArm),
            "single_arm_scara" | "singlearmscara" | "scara" => Ok(KinematicsType::SingleArmScara),
            other => Err(format!("unknown kinematics '{}'", other)),
        }
    }
}

impl TryFrom<String> for KinematicsType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KinematicsType> for String {
    fn from(t: KinematicsType) -> String {
        t.to_string()
    }
}

impl fmt::Display for KinematicsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KinematicsType::Cartesian => "cartesian",
            KinematicsType::CoreXY => "corexy",
            KinematicsType::WallPlotter => "wall_plotter",
            KinematicsType::PolarArm => "polar_arm",
            KinematicsType::SingleArmScara => "single_arm_scara",
        };
        f.write_str(name)
    }
}

/// Mounting sense of an actuator relative to the geometric model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Normal,
    Reversed,
}

impl Direction {
    pub fn from_reversed(reversed: bool) -> Self {
        if reversed { Direction::Reversed } else { Direction::Normal }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Normal => 1.0,
            Direction::Reversed => -1.0,
        }
    }
}

/// Which of the two circle-circle intersections forward kinematics returns.
///
/// Sides are taken relative to the directed line from the left anchor to
/// the right anchor: `Below` is the clockwise side (where a hanging puck
/// is when the left anchor is to the left), `Above` the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootSelection {
    #[default]
    Below,
    Above,
}

impl RootSelection {
    fn side(self) -> f64 {
        match self {
            RootSelection::Below => -1.0,
            RootSelection::Above => 1.0,
        }
    }
}

/// Soft-limit box, `[min, max]` per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkEnvelope {
    pub x: [f64; 2],
    pub y: [f64; 2],
    pub z: [f64; 2],
}

impl WorkEnvelope {
    pub fn check(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        for (axis, value, [min, max]) in [('X', p.x, self.x), ('Y', p.y, self.y), ('Z', p.z, self.z)] {
            if !(min..=max).contains(&value) {
                return Err(LimitViolation::OutOfTravel { axis, value, min, max });
            }
        }
        Ok(())
    }
}

/// Geometry strategy. Implementations are pure and cheap to clone.
pub trait KinematicsModel: KinematicsClone + fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Cartesian -> absolute actuator values. Total over finite input.
    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector;

    /// Absolute actuator values -> Cartesian.
    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError>;

    /// Rejects targets outside the reachable envelope.
    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation>;

    fn is_valid_position(&self, p: &CartesianPoint) -> bool {
        self.check_position(p).is_ok()
    }

    /// Linear geometries map straight lines to straight lines and never
    /// need segmenting.
    fn is_linear(&self) -> bool {
        false
    }

    /// Sign convention used when the configuration does not give one.
    fn default_directions(&self) -> [Direction; 3] {
        [Direction::Normal; 3]
    }

    /// Where the machine rests after homing, and where it is calibrated.
    fn home_position(&self) -> CartesianPoint {
        CartesianPoint::ORIGIN
    }

    /// Returns true when the geometry performs homing itself, in which
    /// case the regular homing cycle is skipped.
    fn kinematics_homing(&self) -> bool {
        false
    }
}

pub trait KinematicsClone {
    fn clone_box(&self) -> Box<dyn KinematicsModel>;
}

impl<T> KinematicsClone for T
where
    T: 'static + KinematicsModel + Clone,
{
    fn clone_box(&self) -> Box<dyn KinematicsModel> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn KinematicsModel> {
    fn clone(&self) -> Box<dyn KinematicsModel> {
        self.clone_box()
    }
}

fn check_envelope(envelope: &Option<WorkEnvelope>, p: &CartesianPoint) -> Result<(), LimitViolation> {
    match envelope {
        Some(envelope) => envelope.check(p),
        None => Ok(()),
    }
}

/// Actuators move along the machine axes.
#[derive(Debug, Clone, Default)]
pub struct CartesianKinematics {
    envelope: Option<WorkEnvelope>,
}

impl CartesianKinematics {
    pub fn new(envelope: Option<WorkEnvelope>) -> Self {
        Self { envelope }
    }
}

impl KinematicsModel for CartesianKinematics {
    fn name(&self) -> &'static str {
        "Cartesian"
    }

    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector {
        ActuatorVector::new(p.x, p.y, p.z)
    }

    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError> {
        if !a.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        Ok(CartesianPoint::new(a[0], a[1], a[2]))
    }

    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        check_envelope(&self.envelope, p)
    }

    fn is_linear(&self) -> bool {
        true
    }
}

/// CoreXY belt geometry, `a = s*x + y`, `b = s*x - y`.
#[derive(Debug, Clone)]
pub struct CoreXYKinematics {
    x_scaler: f64,
    envelope: Option<WorkEnvelope>,
}

impl CoreXYKinematics {
    pub fn new(x_scaler: f64, envelope: Option<WorkEnvelope>) -> Result<Self, GeometryError> {
        if !x_scaler.is_finite() || x_scaler == 0.0 {
            return Err(GeometryError::DegenerateScaler);
        }
        Ok(Self { x_scaler, envelope })
    }
}

impl KinematicsModel for CoreXYKinematics {
    fn name(&self) -> &'static str {
        "CoreXY"
    }

    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector {
        ActuatorVector::new(self.x_scaler * p.x + p.y, self.x_scaler * p.x - p.y, p.z)
    }

    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError> {
        if !a.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        Ok(CartesianPoint::new(
            0.5 * (a[0] + a[1]) / self.x_scaler,
            0.5 * (a[0] - a[1]),
            a[2],
        ))
    }

    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        check_envelope(&self.envelope, p)
    }

    fn is_linear(&self) -> bool {
        true
    }
}

/// Two-cable hanging plotter.
///
/// Each cable runs from a fixed anchor to the pen, so actuator `i` is the
/// distance from anchor `i` to the pen. The pen position is recovered by
/// intersecting the two circles centred on the anchors:
///
/// ```text
///   along = (r0^2 - r1^2 + d^2) / (2d)
///   h     = sqrt(r0^2 - along^2)
/// ```
///
/// where `d` is the anchor separation, `along` the distance from the left
/// anchor to the chord and `h` the offset from the anchor line. The sign of
/// `h` comes from [`RootSelection`].
#[derive(Debug, Clone)]
pub struct WallPlotterKinematics {
    left_anchor: [f64; 2],
    right_anchor: [f64; 2],
    separation: f64,
    // unit vector from left to right anchor
    direction: [f64; 2],
    root: RootSelection,
    envelope: Option<WorkEnvelope>,
}

impl WallPlotterKinematics {
    pub fn new(
        left_anchor: [f64; 2],
        right_anchor: [f64; 2],
        root: RootSelection,
    ) -> Result<Self, GeometryError> {
        if !left_anchor.iter().chain(right_anchor.iter()).all(|v| v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        let dx = right_anchor[0] - left_anchor[0];
        let dy = right_anchor[1] - left_anchor[1];
        let separation = dx.hypot(dy);
        if separation < f64::EPSILON {
            return Err(GeometryError::CoincidentAnchors);
        }
        Ok(Self {
            left_anchor,
            right_anchor,
            separation,
            direction: [dx / separation, dy / separation],
            root,
            envelope: None,
        })
    }

    pub fn with_envelope(mut self, envelope: Option<WorkEnvelope>) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn separation(&self) -> f64 {
        self.separation
    }

    pub fn root(&self) -> RootSelection {
        self.root
    }

    // Signed offset of (x, y) from the anchor line, positive on the Above side.
    fn side_offset(&self, x: f64, y: f64) -> f64 {
        let [ux, uy] = self.direction;
        ux * (y - self.left_anchor[1]) - uy * (x - self.left_anchor[0])
    }
}

impl KinematicsModel for WallPlotterKinematics {
    fn name(&self) -> &'static str {
        "WallPlotter"
    }

    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector {
        let left = (self.left_anchor[0] - p.x).hypot(self.left_anchor[1] - p.y);
        let right = (self.right_anchor[0] - p.x).hypot(self.right_anchor[1] - p.y);
        ActuatorVector::new(left, right, p.z)
    }

    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError> {
        if !a.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        for index in 0..2 {
            if a[index] < 0.0 {
                return Err(GeometryError::NegativeLength { index, value: a[index] });
            }
        }
        let (r0, r1, d) = (a[0], a[1], self.separation);
        let along = (r0 * r0 - r1 * r1 + d * d) / (2.0 * d);
        let h_squared = r0 * r0 - along * along;
        if h_squared < 0.0 {
            return Err(GeometryError::NoIntersection {
                left: r0,
                right: r1,
                separation: d,
            });
        }
        let h = self.root.side() * h_squared.sqrt();
        let [ux, uy] = self.direction;
        Ok(CartesianPoint::new(
            self.left_anchor[0] + along * ux - h * uy,
            self.left_anchor[1] + along * uy + h * ux,
            a.z(),
        ))
    }

    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        check_envelope(&self.envelope, p)?;
        // The chosen root is only reachable strictly on its own side.
        if self.side_offset(p.x, p.y) * self.root.side() <= 0.0 {
            return Err(LimitViolation::AnchorSide { x: p.x, y: p.y });
        }
        Ok(())
    }

    fn default_directions(&self) -> [Direction; 3] {
        // The left spool winds the other way.
        [Direction::Reversed, Direction::Normal, Direction::Normal]
    }
}

/// Swinging arm on a Y carriage.
///
/// Actuator 1 drives the arm pivot along Y, actuator 0 drives X. The arm
/// is perpendicular to X at `straight_y`; any other Y deflection `dy`
/// pulls the tip back by `L - sqrt(L^2 - dy^2)`, which the X actuator
/// makes up.
#[derive(Debug, Clone)]
pub struct PolarArmKinematics {
    arm_length: f64,
    straight_y: f64,
    envelope: Option<WorkEnvelope>,
}

impl PolarArmKinematics {
    pub fn new(arm_length: f64, straight_y: f64) -> Result<Self, GeometryError> {
        if !straight_y.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if !arm_length.is_finite() || arm_length <= 0.0 {
            return Err(GeometryError::NonPositiveLength { name: "arm_length", value: arm_length });
        }
        Ok(Self { arm_length, straight_y, envelope: None })
    }

    pub fn with_envelope(mut self, envelope: Option<WorkEnvelope>) -> Self {
        self.envelope = envelope;
        self
    }

    // X lost to the arm swing at deflection `dy`; clamped at full swing.
    fn x_offset(&self, dy: f64) -> f64 {
        self.arm_length - (self.arm_length * self.arm_length - dy * dy).max(0.0).sqrt()
    }
}

impl KinematicsModel for PolarArmKinematics {
    fn name(&self) -> &'static str {
        "PolarArm"
    }

    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector {
        let dy = p.y - self.straight_y;
        ActuatorVector::new(p.x - self.x_offset(dy), dy, p.z)
    }

    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError> {
        if !a.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let dy = a[1];
        if dy.abs() > self.arm_length {
            return Err(GeometryError::OutOfReach { distance: dy.abs(), min: 0.0, max: self.arm_length });
        }
        Ok(CartesianPoint::new(a[0] + self.x_offset(dy), dy + self.straight_y, a.z()))
    }

    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        check_envelope(&self.envelope, p)?;
        let distance = (p.y - self.straight_y).abs();
        if distance > self.arm_length {
            return Err(LimitViolation::OutOfReach { x: p.x, y: p.y, distance, min: 0.0, max: self.arm_length });
        }
        Ok(())
    }
}

/// Two-link planar arm with the shoulder at the Cartesian origin.
///
/// Actuator 0 is the shoulder angle, actuator 1 the elbow angle, both in
/// radians. For a tip at distance `D` and bearing `A3`:
///
/// ```text
///   A4       = acos((L1^2 + D^2 - L2^2) / (2 L1 D))
///   shoulder = A3 + A4
///   elbow    = acos((L1^2 + L2^2 - D^2) / (2 L1 L2))
/// ```
///
/// When the elbow is belt driven from a motor at the base, the elbow
/// actuator also turns with the shoulder and reads `elbow + shoulder`.
#[derive(Debug, Clone)]
pub struct SingleArmScaraKinematics {
    upper_arm: f64,
    forearm: f64,
    elbow_motor: bool,
    min_reach: f64,
    home: [f64; 2],
    envelope: Option<WorkEnvelope>,
}

impl SingleArmScaraKinematics {
    /// Home defaults to the arm stretched out along +X.
    pub fn new(upper_arm: f64, forearm: f64, elbow_motor: bool) -> Result<Self, GeometryError> {
        for (name, value) in [("upper_arm", upper_arm), ("forearm", forearm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::NonPositiveLength { name, value });
            }
        }
        Ok(Self {
            upper_arm,
            forearm,
            elbow_motor,
            min_reach: (upper_arm - forearm).abs(),
            home: [upper_arm + forearm, 0.0],
            envelope: None,
        })
    }

    /// Keep the tip at least `min_reach` from the shoulder. Never below
    /// what the links allow.
    pub fn with_min_reach(mut self, min_reach: f64) -> Self {
        self.min_reach = self.min_reach.max(min_reach);
        self
    }

    pub fn with_home(mut self, home: [f64; 2]) -> Self {
        self.home = home;
        self
    }

    pub fn with_envelope(mut self, envelope: Option<WorkEnvelope>) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn max_reach(&self) -> f64 {
        self.upper_arm + self.forearm
    }

    pub fn min_reach(&self) -> f64 {
        self.min_reach
    }

    // Angle at the shoulder between the bearing of the tip and the upper arm.
    fn shoulder_offset(&self, distance: f64) -> f64 {
        let (l1, l2) = (self.upper_arm, self.forearm);
        let d = distance.max(f64::MIN_POSITIVE);
        ((l1 * l1 + d * d - l2 * l2) / (2.0 * l1 * d)).clamp(-1.0, 1.0).acos()
    }
}

impl KinematicsModel for SingleArmScaraKinematics {
    fn name(&self) -> &'static str {
        "SingleArmScara"
    }

    fn inverse_kinematics(&self, p: &CartesianPoint) -> ActuatorVector {
        let (l1, l2) = (self.upper_arm, self.forearm);
        let distance = p.x.hypot(p.y);
        let shoulder = p.y.atan2(p.x) + self.shoulder_offset(distance);
        let mut elbow = ((l1 * l1 + l2 * l2 - distance * distance) / (2.0 * l1 * l2)).clamp(-1.0, 1.0).acos();
        if !self.elbow_motor {
            elbow += shoulder;
        }
        ActuatorVector::new(shoulder, elbow, p.z)
    }

    fn forward_kinematics(&self, a: &ActuatorVector) -> Result<CartesianPoint, GeometryError> {
        if !a.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        let (l1, l2) = (self.upper_arm, self.forearm);
        let shoulder = a[0];
        let elbow = if self.elbow_motor { a[1] } else { a[1] - shoulder };
        let distance = (l1 * l1 + l2 * l2 - 2.0 * l1 * l2 * elbow.cos()).max(0.0).sqrt();
        if distance < self.min_reach {
            return Err(GeometryError::OutOfReach { distance, min: self.min_reach, max: self.max_reach() });
        }
        let bearing = shoulder - self.shoulder_offset(distance);
        Ok(CartesianPoint::new(distance * bearing.cos(), distance * bearing.sin(), a.z()))
    }

    fn check_position(&self, p: &CartesianPoint) -> Result<(), LimitViolation> {
        check_envelope(&self.envelope, p)?;
        let distance = p.x.hypot(p.y);
        let (min, max) = (self.min_reach, self.max_reach());
        if distance < min || distance > max {
            return Err(LimitViolation::OutOfReach { x: p.x, y: p.y, distance, min, max });
        }
        Ok(())
    }

    fn home_position(&self) -> CartesianPoint {
        CartesianPoint::new(self.home[0], self.home[1], 0.0)
    }
}

/// Build the geometry named in the configuration.
pub fn create_kinematics(config: &Config) -> Result<Box<dyn KinematicsModel>, GeometryError> {
    let envelope = config.limits.envelope();
    let model: Box<dyn KinematicsModel> = match config.machine.kinematics {
        KinematicsType::Cartesian => Box::new(CartesianKinematics::new(envelope)),
        KinematicsType::CoreXY => Box::new(CoreXYKinematics::new(config.corexy.x_scaler, envelope)?),
        KinematicsType::WallPlotter => {
            let plotter = &config.wall_plotter;
            Box::new(
                WallPlotterKinematics::new(plotter.left_anchor, plotter.right_anchor, plotter.root)?
                    .with_envelope(envelope),
            )
        }
        KinematicsType::PolarArm => {
            let arm = &config.polar_arm;
            Box::new(PolarArmKinematics::new(arm.arm_length, arm.straight_y_position)?.with_envelope(envelope))
        }
        KinematicsType::SingleArmScara => {
            let scara = &config.scara;
            let mut model = SingleArmScaraKinematics::new(scara.upper_arm, scara.forearm, scara.elbow_motor)?
                .with_min_reach(scara.min_reach)
                .with_envelope(envelope);
            if let Some(home) = scara.home {
                model = model.with_home(home);
            }
            Box::new(model)
        }
    };
    tracing::info!("Kinematic system: {}", model.name());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-6;

    fn plotter() -> WallPlotterKinematics {
        WallPlotterKinematics::new([-267.0, 250.0], [267.0, 250.0], RootSelection::Below).unwrap()
    }

    fn assert_close(a: &CartesianPoint, b: &CartesianPoint, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol && (a.z - b.z).abs() < tol,
            "expected {}, got {}",
            b,
            a
        );
    }

    #[test]
    fn test_wall_plotter_origin_lengths() {
        let lengths = plotter().inverse_kinematics(&CartesianPoint::ORIGIN);
        let expected = (267.0f64 * 267.0 + 250.0 * 250.0).sqrt();
        assert!((lengths[0] - expected).abs() < TOL);
        assert!((lengths[1] - expected).abs() < TOL);
        assert!((expected - 366.27).abs() < 0.01);
        assert_eq!(lengths.z(), 0.0);
    }

    #[test]
    fn test_wall_plotter_forward_recovers_origin() {
        let model = plotter();
        let lengths = model.inverse_kinematics(&CartesianPoint::ORIGIN);
        let p = model.forward_kinematics(&lengths).unwrap();
        assert_close(&p, &CartesianPoint::ORIGIN, TOL);
    }

    #[test]
    fn test_wall_plotter_non_intersecting_circles() {
        let err = plotter().forward_kinematics(&ActuatorVector::new(1.0, 1.0, 0.0)).unwrap_err();
        assert!(matches!(err, GeometryError::NoIntersection { separation, .. } if separation == 534.0));
    }

    #[test]
    fn test_wall_plotter_nested_circles() {
        // One circle inside the other: |r0 - r1| > d.
        let err = plotter().forward_kinematics(&ActuatorVector::new(10.0, 900.0, 0.0));
        assert!(matches!(err, Err(GeometryError::NoIntersection { .. })));
    }

    #[test]
    fn test_wall_plotter_negative_length() {
        let err = plotter().forward_kinematics(&ActuatorVector::new(-5.0, 300.0, 0.0));
        assert_eq!(err, Err(GeometryError::NegativeLength { index: 0, value: -5.0 }));
    }

    #[test]
    fn test_root_selection_mirrors_across_anchor_line() {
        let below = plotter();
        let above = WallPlotterKinematics::new([-267.0, 250.0], [267.0, 250.0], RootSelection::Above).unwrap();
        let target = CartesianPoint::new(40.0, 100.0, 0.0);
        let lengths = below.inverse_kinematics(&target);
        assert_close(&below.forward_kinematics(&lengths).unwrap(), &target, TOL);
        // Same lengths, other root: reflection across y = 250.
        assert_close(
            &above.forward_kinematics(&lengths).unwrap(),
            &CartesianPoint::new(40.0, 400.0, 0.0),
            TOL,
        );
    }

    #[test]
    fn test_tilted_anchors_round_trip() {
        let model = WallPlotterKinematics::new([0.0, 300.0], [500.0, 350.0], RootSelection::Below).unwrap();
        let target = CartesianPoint::new(210.0, 20.0, 4.0);
        assert!(model.is_valid_position(&target));
        let back = model.forward_kinematics(&model.inverse_kinematics(&target)).unwrap();
        assert_close(&back, &target, TOL);
    }

    #[test]
    fn test_coincident_anchors_rejected() {
        let err = WallPlotterKinematics::new([1.0, 1.0], [1.0, 1.0], RootSelection::Below).unwrap_err();
        assert_eq!(err, GeometryError::CoincidentAnchors);
    }

    #[test]
    fn test_anchor_side_check() {
        let model = plotter();
        assert!(model.is_valid_position(&CartesianPoint::new(0.0, 0.0, 0.0)));
        assert!(matches!(
            model.check_position(&CartesianPoint::new(0.0, 260.0, 0.0)),
            Err(LimitViolation::AnchorSide { .. })
        ));
        // On the anchor line itself the two roots coincide.
        assert!(!model.is_valid_position(&CartesianPoint::new(0.0, 250.0, 0.0)));
    }

    #[test]
    fn test_envelope_violation_reports_axis() {
        let envelope = WorkEnvelope { x: [-100.0, 100.0], y: [-100.0, 100.0], z: [0.0, 10.0] };
        let model = plotter().with_envelope(Some(envelope));
        let err = model.check_position(&CartesianPoint::new(0.0, 0.0, 20.0)).unwrap_err();
        assert_eq!(err, LimitViolation::OutOfTravel { axis: 'Z', value: 20.0, min: 0.0, max: 10.0 });
    }

    #[test]
    fn test_corexy_round_trip() {
        let model = CoreXYKinematics::new(1.0, None).unwrap();
        let p = CartesianPoint::new(12.5, -3.0, 7.0);
        let motors = model.inverse_kinematics(&p);
        assert_eq!(motors, ActuatorVector::new(9.5, 15.5, 7.0));
        assert_close(&model.forward_kinematics(&motors).unwrap(), &p, TOL);
        assert!(model.is_linear());
    }

    #[test]
    fn test_corexy_zero_scaler_rejected() {
        assert_eq!(CoreXYKinematics::new(0.0, None).unwrap_err(), GeometryError::DegenerateScaler);
    }

    #[test]
    fn test_cartesian_is_identity() {
        let model = CartesianKinematics::default();
        let p = CartesianPoint::new(1.0, 2.0, 3.0);
        assert_eq!(model.inverse_kinematics(&p), ActuatorVector::new(1.0, 2.0, 3.0));
        assert_eq!(model.forward_kinematics(&ActuatorVector::new(1.0, 2.0, 3.0)).unwrap(), p);
        assert_eq!(
            model.forward_kinematics(&ActuatorVector::new(f64::NAN, 0.0, 0.0)),
            Err(GeometryError::NonFinite)
        );
    }

    #[test]
    fn test_polar_arm_straight_position() {
        let model = PolarArmKinematics::new(803.275, 228.6).unwrap();
        // at the straight position the arm adds no X offset
        let motors = model.inverse_kinematics(&CartesianPoint::new(100.0, 228.6, 2.0));
        assert_eq!(motors, ActuatorVector::new(100.0, 0.0, 2.0));
    }

    #[test]
    fn test_polar_arm_swing_pulls_tip_back() {
        let model = PolarArmKinematics::new(500.0, 0.0).unwrap();
        let target = CartesianPoint::new(50.0, 300.0, 0.0);
        let motors = model.inverse_kinematics(&target);
        // 500 - sqrt(500^2 - 300^2) = 100
        assert!((motors[0] - (-50.0)).abs() < TOL);
        assert!((motors[1] - 300.0).abs() < TOL);
        assert_close(&model.forward_kinematics(&motors).unwrap(), &target, TOL);
    }

    #[test]
    fn test_polar_arm_reach() {
        let model = PolarArmKinematics::new(500.0, 100.0).unwrap();
        assert!(model.is_valid_position(&CartesianPoint::new(0.0, -399.0, 0.0)));
        assert!(matches!(
            model.check_position(&CartesianPoint::new(0.0, 601.0, 0.0)),
            Err(LimitViolation::OutOfReach { .. })
        ));
        assert!(matches!(
            model.forward_kinematics(&ActuatorVector::new(0.0, 501.0, 0.0)),
            Err(GeometryError::OutOfReach { max, .. }) if max == 500.0
        ));
        assert!(matches!(
            PolarArmKinematics::new(0.0, 0.0),
            Err(GeometryError::NonPositiveLength { name: "arm_length", .. })
        ));
    }

    #[test]
    fn test_scara_home_is_arm_stretched_out() {
        let model = SingleArmScaraKinematics::new(65.0, 50.0, true).unwrap();
        let home = model.home_position();
        assert_eq!(home, CartesianPoint::new(115.0, 0.0, 0.0));
        let angles = model.inverse_kinematics(&home);
        assert!(angles[0].abs() < TOL);
        assert!((angles[1] - std::f64::consts::PI).abs() < TOL);
        assert_close(&model.forward_kinematics(&angles).unwrap(), &home, TOL);
    }

    #[test]
    fn test_scara_round_trip_both_elbow_drives() {
        let points = [(80.0, 20.0), (-30.0, 60.0), (10.0, -90.0), (-70.0, -40.0), (0.0, 35.0)];
        for elbow_motor in [true, false] {
            let model = SingleArmScaraKinematics::new(65.0, 50.0, elbow_motor).unwrap().with_min_reach(20.0);
            for (x, y) in points {
                let target = CartesianPoint::new(x, y, 1.0);
                assert!(model.is_valid_position(&target));
                let back = model.forward_kinematics(&model.inverse_kinematics(&target)).unwrap();
                assert_close(&back, &target, TOL);
            }
        }
    }

    #[test]
    fn test_scara_base_elbow_motor_turns_with_shoulder() {
        let elbow = SingleArmScaraKinematics::new(65.0, 50.0, true).unwrap();
        let base = SingleArmScaraKinematics::new(65.0, 50.0, false).unwrap();
        let target = CartesianPoint::new(40.0, 70.0, 0.0);
        let a = elbow.inverse_kinematics(&target);
        let b = base.inverse_kinematics(&target);
        assert_eq!(a[0], b[0]);
        assert!((b[1] - (a[1] + a[0])).abs() < TOL);
    }

    #[test]
    fn test_scara_reach_annulus() {
        let model = SingleArmScaraKinematics::new(65.0, 50.0, true).unwrap().with_min_reach(20.0);
        assert_eq!(model.min_reach(), 20.0);
        assert!(matches!(
            model.check_position(&CartesianPoint::new(116.0, 0.0, 0.0)),
            Err(LimitViolation::OutOfReach { max, .. }) if max == 115.0
        ));
        assert!(matches!(
            model.check_position(&CartesianPoint::new(5.0, 5.0, 0.0)),
            Err(LimitViolation::OutOfReach { min, .. }) if min == 20.0
        ));
        // links of 65 and 50 cannot fold closer than 15
        let loose = SingleArmScaraKinematics::new(65.0, 50.0, true).unwrap().with_min_reach(0.0);
        assert_eq!(loose.min_reach(), 15.0);
        // folded elbow puts the tip inside the dead zone
        assert!(matches!(
            model.forward_kinematics(&ActuatorVector::new(0.0, 0.0, 0.0)),
            Err(GeometryError::OutOfReach { .. })
        ));
    }

    #[test]
    fn test_kinematics_type_parsing() {
        assert_eq!("WallPlotter".parse::<KinematicsType>(), Ok(KinematicsType::WallPlotter));
        assert_eq!("corexy".parse::<KinematicsType>(), Ok(KinematicsType::CoreXY));
        assert!("delta".parse::<KinematicsType>().is_err());
        assert_eq!(KinematicsType::WallPlotter.to_string(), "wall_plotter");
        assert_eq!("scara".parse::<KinematicsType>(), Ok(KinematicsType::SingleArmScara));
        assert_eq!("polar_arm".parse::<KinematicsType>(), Ok(KinematicsType::PolarArm));
        assert_eq!(KinematicsType::SingleArmScara.to_string(), "single_arm_scara");
    }

    #[test]
    fn test_boxed_model_clones() {
        let model: Box<dyn KinematicsModel> = Box::new(plotter());
        let copy = model.clone();
        assert_eq!(copy.name(), "WallPlotter");
        assert_eq!(
            copy.inverse_kinematics(&CartesianPoint::ORIGIN),
            model.inverse_kinematics(&CartesianPoint::ORIGIN)
        );
    }
}
