// src/motion/calibration.rs - Actuator-space origin and the kinematics context
use crate::motion::dispatcher::MotionError;
use crate::motion::kinematics::{Direction, GeometryError, KinematicsModel};
use crate::motion::types::{ACTUATOR_COUNT, ActuatorVector, CartesianPoint, Z_ACTUATOR};

/// Actuator values at the calibration point, plus the per-actuator sign
/// convention. Motor positions are signed deltas from these values.
///
/// Built only by [`CalibrationOrigin::compute`]; there are no setters, so a
/// new calibration always replaces the whole value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationOrigin {
    cartesian: CartesianPoint,
    actuators: ActuatorVector,
    directions: [Direction; ACTUATOR_COUNT],
}

impl CalibrationOrigin {
    pub fn compute(
        model: &dyn KinematicsModel,
        at: CartesianPoint,
        directions: [Direction; ACTUATOR_COUNT],
    ) -> Result<Self, GeometryError> {
        if !at.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        model.check_position(&at).map_err(GeometryError::Unreachable)?;
        let actuators = model.inverse_kinematics(&at);
        if !actuators.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        Ok(Self { cartesian: at, actuators, directions })
    }

    pub fn cartesian(&self) -> CartesianPoint {
        self.cartesian
    }

    pub fn actuators(&self) -> ActuatorVector {
        self.actuators
    }

    pub fn directions(&self) -> [Direction; ACTUATOR_COUNT] {
        self.directions
    }

    /// Absolute value of one actuator -> its motor position.
    pub fn to_motor(&self, index: usize, absolute: f64) -> f64 {
        self.directions[index].sign() * (absolute - self.actuators[index])
    }

    /// Absolute actuator values -> motor positions.
    pub fn to_motors(&self, absolute: &ActuatorVector) -> ActuatorVector {
        let mut motors = [0.0; ACTUATOR_COUNT];
        for (i, m) in motors.iter_mut().enumerate() {
            *m = self.to_motor(i, absolute[i]);
        }
        ActuatorVector(motors)
    }

    /// Motor positions -> absolute actuator values.
    pub fn to_absolute(&self, motors: &ActuatorVector) -> ActuatorVector {
        let mut absolute = [0.0; ACTUATOR_COUNT];
        for (i, a) in absolute.iter_mut().enumerate() {
            *a = self.actuators[i] + self.directions[i].sign() * motors[i];
        }
        ActuatorVector(absolute)
    }
}

/// Everything the motion path needs to turn Cartesian targets into motor
/// positions: the geometry, the sign convention and the calibration.
///
/// Owned by the dispatcher. Cloning produces an independent snapshot that
/// can be handed to a reporting task.
#[derive(Debug, Clone)]
pub struct KinematicsContext {
    model: Box<dyn KinematicsModel>,
    directions: [Direction; ACTUATOR_COUNT],
    origin: Option<CalibrationOrigin>,
}

impl KinematicsContext {
    /// `directions` overrides the geometry's default sign convention.
    pub fn new(model: Box<dyn KinematicsModel>, directions: Option<[Direction; ACTUATOR_COUNT]>) -> Self {
        let directions = directions.unwrap_or_else(|| model.default_directions());
        Self { model, directions, origin: None }
    }

    pub fn model(&self) -> &dyn KinematicsModel {
        self.model.as_ref()
    }

    pub fn directions(&self) -> [Direction; ACTUATOR_COUNT] {
        self.directions
    }

    pub fn origin(&self) -> Option<&CalibrationOrigin> {
        self.origin.as_ref()
    }

    pub fn is_calibrated(&self) -> bool {
        self.origin.is_some()
    }

    /// Declare that the machine is at `at` with every motor counter at zero.
    pub fn calibrate(&mut self, at: CartesianPoint) -> Result<&CalibrationOrigin, GeometryError> {
        let origin = CalibrationOrigin::compute(self.model.as_ref(), at, self.directions)?;
        tracing::info!(
            "{} calibrated at {}: origin actuators {}",
            self.model.name(),
            at,
            origin.actuators()
        );
        Ok(self.origin.insert(origin))
    }

    /// Cartesian target -> motor positions.
    pub fn cartesian_to_motors(&self, p: &CartesianPoint) -> Result<ActuatorVector, MotionError> {
        let origin = self.origin.as_ref().ok_or(MotionError::NotCalibrated)?;
        Ok(origin.to_motors(&self.model.inverse_kinematics(p)))
    }

    /// Motor position of the Z actuator for height `z`. No geometry
    /// transforms Z, so this bypasses inverse kinematics.
    pub fn z_to_motor(&self, z: f64) -> Result<f64, MotionError> {
        let origin = self.origin.as_ref().ok_or(MotionError::NotCalibrated)?;
        Ok(origin.to_motor(Z_ACTUATOR, z))
    }

    /// Motor positions -> Cartesian, for status reports and validation.
    pub fn motors_to_cartesian(&self, motors: &ActuatorVector) -> Result<CartesianPoint, MotionError> {
        let origin = self.origin.as_ref().ok_or(MotionError::NotCalibrated)?;
        Ok(self.model.forward_kinematics(&origin.to_absolute(motors))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::kinematics::{CartesianKinematics, LimitViolation, RootSelection, WallPlotterKinematics};

    fn plotter_context() -> KinematicsContext {
        let model = WallPlotterKinematics::new([-267.0, 250.0], [267.0, 250.0], RootSelection::Below).unwrap();
        KinematicsContext::new(Box::new(model), None)
    }

    #[test]
    fn test_uncalibrated_context_rejects_conversion() {
        let ctx = plotter_context();
        assert!(!ctx.is_calibrated());
        assert!(matches!(
            ctx.cartesian_to_motors(&CartesianPoint::ORIGIN),
            Err(MotionError::NotCalibrated)
        ));
    }

    #[test]
    fn test_origin_maps_to_zero_motors() {
        let mut ctx = plotter_context();
        ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        let motors = ctx.cartesian_to_motors(&CartesianPoint::ORIGIN).unwrap();
        assert_eq!(motors, ActuatorVector::ZERO);
    }

    #[test]
    fn test_left_cable_runs_reversed() {
        let mut ctx = plotter_context();
        ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        // Moving right lengthens the left cable and shortens the right one.
        let motors = ctx.cartesian_to_motors(&CartesianPoint::new(50.0, 0.0, 0.0)).unwrap();
        assert!(motors[0] < 0.0, "reversed left motor should count down, got {}", motors);
        assert!(motors[1] < 0.0);
    }

    #[test]
    fn test_configured_directions_override_default() {
        let model = CartesianKinematics::default();
        let mut ctx = KinematicsContext::new(
            Box::new(model),
            Some([Direction::Normal, Direction::Reversed, Direction::Normal]),
        );
        ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        let motors = ctx.cartesian_to_motors(&CartesianPoint::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(motors, ActuatorVector::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_motor_round_trip_through_origin() {
        let mut ctx = plotter_context();
        ctx.calibrate(CartesianPoint::new(10.0, -20.0, 0.0)).unwrap();
        let target = CartesianPoint::new(-35.0, 40.0, 2.0);
        let motors = ctx.cartesian_to_motors(&target).unwrap();
        let back = ctx.motors_to_cartesian(&motors).unwrap();
        assert!((back.x - target.x).abs() < 1e-6);
        assert!((back.y - target.y).abs() < 1e-6);
        assert!((back.z - target.z).abs() < 1e-6);
    }

    #[test]
    fn test_calibration_is_idempotent() {
        let mut ctx = plotter_context();
        let first = *ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        let second = *ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_calibrate_rejects_non_finite_point() {
        let mut ctx = plotter_context();
        let err = ctx.calibrate(CartesianPoint::new(f64::NAN, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, GeometryError::NonFinite);
        assert!(!ctx.is_calibrated());
    }

    #[test]
    fn test_calibrate_rejects_unreachable_point() {
        let mut ctx = plotter_context();
        ctx.calibrate(CartesianPoint::ORIGIN).unwrap();
        // above the anchor line
        let err = ctx.calibrate(CartesianPoint::new(0.0, 300.0, 0.0)).unwrap_err();
        assert!(matches!(err, GeometryError::Unreachable(LimitViolation::AnchorSide { .. })));
        // the previous origin is kept
        assert_eq!(ctx.origin().unwrap().cartesian(), CartesianPoint::ORIGIN);
    }
}
