// src/motion/dispatcher.rs - Segmenter -> kinematics -> validator -> planner
use thiserror::Error;

use crate::alarm::{AlarmKind, AlarmSink};
use crate::config::{Config, ConfigError};
use crate::motion::calibration::KinematicsContext;
use crate::motion::kinematics::{GeometryError, LimitViolation, create_kinematics};
use crate::motion::planner::MotionPlanner;
use crate::motion::segmenter::{SegmentKind, Segmenter};
use crate::motion::types::{ActuatorVector, CartesianPoint, MotionRequest, Z_ACTUATOR};
use crate::motion::validator::{ConsistencyError, Validator};

/// Why the dispatcher stopped the machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaultKind {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
    #[error("soft limit: {0}")]
    SoftLimit(#[from] LimitViolation),
}

impl FaultKind {
    pub fn alarm(&self) -> AlarmKind {
        match self {
            FaultKind::Geometry(_) => AlarmKind::KinematicsGeometry,
            FaultKind::Consistency(_) => AlarmKind::KinematicsConsistency,
            FaultKind::SoftLimit(_) => AlarmKind::SoftLimit,
        }
    }
}

/// Requests refused before any segment was considered.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    #[error("kinematics not calibrated")]
    NotCalibrated,
    #[error("motion halted until recalibration: {0}")]
    Faulted(FaultKind),
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

/// Outcome of one motion request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    /// Every segment was accepted by the planner.
    Completed { segments: u32 },
    /// The planner refused a segment; `submitted` segments were committed.
    Cancelled { submitted: u32 },
    /// Motion stopped and an alarm was raised.
    Faulted(FaultKind),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatcherState {
    Uninitialized,
    Calibrated,
    Active,
    Faulted(FaultKind),
}

/// Snapshot for status reports.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherStatus {
    pub state: DispatcherState,
    pub motors: ActuatorVector,
    pub position: Option<CartesianPoint>,
}

/// Hooks called by the homing controller around a homing cycle.
pub trait HomingHooks {
    /// Returns true when homing was handled here and the regular cycle
    /// must be skipped.
    fn pre_homing(&mut self) -> bool;
    fn post_homing(&mut self);
}

pub struct MotionDispatcher<P, A> {
    context: KinematicsContext,
    segmenter: Segmenter,
    validator: Option<Validator>,
    planner: P,
    alarms: A,
    state: DispatcherState,
    // last motor command accepted by the planner
    last_motors: ActuatorVector,
}

impl<P: MotionPlanner, A: AlarmSink> MotionDispatcher<P, A> {
    pub fn new(
        context: KinematicsContext,
        segment_length: f64,
        validator: Option<Validator>,
        planner: P,
        alarms: A,
    ) -> Result<Self, ConfigError> {
        let segmenter = Segmenter::new(segment_length)?;
        let segmenter = if context.model().is_linear() { Segmenter::unsegmented() } else { segmenter };
        tracing::info!(
            "Motion dispatcher: {} kinematics, segment length {}, validation {}",
            context.model().name(),
            segmenter.max_segment_length(),
            if validator.is_some() { "on" } else { "off" }
        );
        Ok(Self {
            context,
            segmenter,
            validator,
            planner,
            alarms,
            state: DispatcherState::Uninitialized,
            last_motors: ActuatorVector::ZERO,
        })
    }

    pub fn from_config(config: &Config, planner: P, alarms: A) -> Result<Self, ConfigError> {
        config.validate()?;
        let model = create_kinematics(config)?;
        let context = KinematicsContext::new(model, config.actuators.directions());
        let validator = config
            .validator
            .enabled
            .then(|| Validator::new(config.validator.tolerance));
        Self::new(context, config.machine.segment_length, validator, planner, alarms)
    }

    /// Establish (or re-establish) the actuator origin with the machine at
    /// `origin`. Clears a fault.
    pub fn calibrate(&mut self, origin: CartesianPoint) -> Result<(), MotionError> {
        self.context.calibrate(origin)?;
        if let DispatcherState::Faulted(kind) = &self.state {
            tracing::info!("Recalibrated, clearing fault: {}", kind);
        }
        self.last_motors = ActuatorVector::ZERO;
        self.state = DispatcherState::Calibrated;
        Ok(())
    }

    /// Convert one Cartesian move into planner segments.
    pub fn convert_motion(&mut self, request: &MotionRequest) -> Result<DispatchResult, MotionError> {
        match &self.state {
            DispatcherState::Uninitialized => return Err(MotionError::NotCalibrated),
            DispatcherState::Faulted(kind) => return Err(MotionError::Faulted(kind.clone())),
            DispatcherState::Calibrated | DispatcherState::Active => {}
        }
        self.state = DispatcherState::Active;

        if !request.current.is_finite() || !request.target.is_finite() {
            return Ok(self.fault(GeometryError::NonFinite.into()));
        }
        if let Err(violation) = self.context.model().check_position(&request.target) {
            return Ok(self.fault(violation.into()));
        }

        let segments = match self.segmenter.segments(request) {
            Ok(segments) => segments,
            Err(violation) => return Ok(self.fault(violation.into())),
        };
        tracing::debug!(
            "Move {} -> {} in {} segment(s){}",
            request.current,
            request.target,
            segments.len(),
            if request.is_rapid() { " (rapid)" } else { "" }
        );

        let mut from = request.current;
        let mut from_motors = self.context.cartesian_to_motors(&from)?;
        let mut submitted = 0;
        for segment in segments {
            // the reachable region need not be convex
            if let Err(violation) = self.context.model().check_position(&segment.point) {
                return Ok(self.fault(violation.into()));
            }
            let motors = match segment.kind {
                SegmentKind::Interpolated => self.context.cartesian_to_motors(&segment.point)?,
                SegmentKind::ZOnly => {
                    let mut motors = self.last_motors;
                    motors.0[Z_ACTUATOR] = self.context.z_to_motor(segment.point.z)?;
                    motors
                }
            };

            if let Some(validator) = &self.validator {
                if let Err(e) = validator.check(&self.context, &segment.point, &motors) {
                    return Ok(self.fault(e.into()));
                }
            }

            let mut params = request.params;
            if !request.is_rapid() {
                // the planner works in motor space; keep the Cartesian speed
                let cartesian = from.distance(&segment.point);
                if cartesian > f64::EPSILON {
                    params.feed_rate *= from_motors.distance(&motors) / cartesian;
                }
            }

            tracing::debug!("Segment {}/{}: {} -> {}", segment.index, segment.count, segment.point, motors);
            if !self.planner.move_actuators(&motors, &params) {
                tracing::warn!("Motion cancelled after {} of {} segments", submitted, segment.count);
                return Ok(DispatchResult::Cancelled { submitted });
            }
            submitted += 1;
            self.last_motors = motors;
            from = segment.point;
            from_motors = motors;
        }
        Ok(DispatchResult::Completed { segments: submitted })
    }

    /// Motor positions -> Cartesian, for status reports.
    pub fn convert_position(&self, motors: &ActuatorVector) -> Result<CartesianPoint, MotionError> {
        self.context.motors_to_cartesian(motors)
    }

    pub fn status(&self) -> DispatcherStatus {
        DispatcherStatus {
            state: self.state.clone(),
            motors: self.last_motors,
            position: self.convert_position(&self.last_motors).ok(),
        }
    }

    pub fn state(&self) -> &DispatcherState {
        &self.state
    }

    pub fn context(&self) -> &KinematicsContext {
        &self.context
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn last_motors(&self) -> ActuatorVector {
        self.last_motors
    }

    pub fn planner(&self) -> &P {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut P {
        &mut self.planner
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    fn fault(&mut self, kind: FaultKind) -> DispatchResult {
        tracing::error!("Motion faulted: {}", kind);
        self.alarms.raise_alarm(kind.alarm());
        self.state = DispatcherState::Faulted(kind.clone());
        DispatchResult::Faulted(kind)
    }
}

impl<P: MotionPlanner, A: AlarmSink> HomingHooks for MotionDispatcher<P, A> {
    fn pre_homing(&mut self) -> bool {
        let handled = self.context.model().kinematics_homing();
        tracing::info!("Homing {} kinematics (handled here: {})", self.context.model().name(), handled);
        handled
    }

    fn post_homing(&mut self) {
        let home = self.context.model().home_position();
        if let Err(e) = self.calibrate(home) {
            tracing::error!("Recalibration after homing failed: {}", e);
        }
    }
}
