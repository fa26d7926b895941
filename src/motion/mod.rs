// src/motion/mod.rs - Cartesian -> actuator motion path

pub mod calibration;
pub mod dispatcher;
pub mod kinematics;
pub mod planner;
pub mod segmenter;
pub mod types;
pub mod validator;

pub use calibration::{CalibrationOrigin, KinematicsContext};
pub use dispatcher::{
    DispatchResult, DispatcherState, DispatcherStatus, FaultKind, HomingHooks, MotionDispatcher, MotionError,
};
pub use kinematics::{
    Direction, GeometryError, KinematicsModel, KinematicsType, LimitViolation, PolarArmKinematics, RootSelection,
    SingleArmScaraKinematics, WorkEnvelope, create_kinematics,
};
pub use planner::{CancelHandle, MotionPlanner, PlannedMove, QueueStats, QueuedPlanner};
pub use segmenter::{MAX_SEGMENTS, Segment, SegmentKind, Segmenter};
pub use types::{ActuatorVector, CartesianPoint, MotionFlags, MotionParams, MotionRequest};
pub use validator::{ConsistencyError, Validator};
