// src/motion/validator.rs - Round-trip check of computed motor positions
use thiserror::Error;

use crate::motion::calibration::KinematicsContext;
use crate::motion::kinematics::GeometryError;
use crate::motion::types::{ActuatorVector, CartesianPoint};

pub const DEFAULT_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("{axis} round trip mismatch: expected {expected:.4}, got {actual:.4} (tolerance {tolerance})")]
    Mismatch {
        axis: char,
        expected: f64,
        actual: f64,
        tolerance: f64,
    },
    #[error("round trip failed: {0}")]
    Geometry(#[from] GeometryError),
    #[error("kinematics not calibrated")]
    NotCalibrated,
}

/// Feeds every motor command back through forward kinematics and compares
/// the result with the Cartesian point it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Validator {
    tolerance: f64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl Validator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn check(
        &self,
        context: &KinematicsContext,
        expected: &CartesianPoint,
        motors: &ActuatorVector,
    ) -> Result<(), ConsistencyError> {
        let origin = context.origin().ok_or(ConsistencyError::NotCalibrated)?;
        let actual = context.model().forward_kinematics(&origin.to_absolute(motors))?;
        for (axis, expected, actual) in [
            ('X', expected.x, actual.x),
            ('Y', expected.y, actual.y),
            ('Z', expected.z, actual.z),
        ] {
            // written so that NaN fails the check
            if !((expected - actual).abs() <= self.tolerance) {
                return Err(ConsistencyError::Mismatch {
                    axis,
                    expected,
                    actual,
                    tolerance: self.tolerance,
                });
            }
        }
        Ok(())
    }
}
