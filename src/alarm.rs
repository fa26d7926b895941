// src/alarm.rs - Machine alarm reporting
use std::fmt;

use serde::Serialize;

/// Alarms raised by the kinematics engine. Each one stops motion until the
/// operator recalibrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlarmKind {
    /// Target outside the work envelope.
    SoftLimit,
    /// Forward kinematics had no solution.
    KinematicsGeometry,
    /// Round-trip check failed.
    KinematicsConsistency,
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AlarmKind::SoftLimit => "Soft Limit",
            AlarmKind::KinematicsGeometry => "Kinematics Geometry",
            AlarmKind::KinematicsConsistency => "Kinematics Consistency",
        };
        f.write_str(text)
    }
}

/// Receiver of machine-wide alarms.
pub trait AlarmSink {
    fn raise_alarm(&mut self, kind: AlarmKind);
}

impl<F: FnMut(AlarmKind)> AlarmSink for F {
    fn raise_alarm(&mut self, kind: AlarmKind) {
        self(kind)
    }
}

/// Logs alarms and keeps them for inspection.
#[derive(Debug, Default, Clone)]
pub struct AlarmLog {
    raised: Vec<AlarmKind>,
}

impl AlarmLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raised(&self) -> &[AlarmKind] {
        &self.raised
    }

    pub fn last(&self) -> Option<AlarmKind> {
        self.raised.last().copied()
    }

    pub fn clear(&mut self) {
        self.raised.clear();
    }
}

impl AlarmSink for AlarmLog {
    fn raise_alarm(&mut self, kind: AlarmKind) {
        tracing::error!("ALARM: {}", kind);
        self.raised.push(kind);
    }
}
