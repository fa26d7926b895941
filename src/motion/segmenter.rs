// src/motion/segmenter.rs - Split one linear move into bounded sub-moves
//
// A straight line in Cartesian space is not a straight line in actuator
// space for non-linear geometries. The planner interpolates linearly
// between actuator vectors, so long moves are cut into pieces no longer
// than `max_segment_length` to keep the path error small.

use crate::config::ConfigError;
use crate::motion::kinematics::LimitViolation;
use crate::motion::types::{CartesianPoint, MotionRequest};

/// Most segments a single move may be cut into.
pub const MAX_SEGMENTS: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Interpolated XY(Z) point, goes through inverse kinematics.
    Interpolated,
    /// Pure vertical move; only the Z actuator changes.
    ZOnly,
}

/// One sub-move. `index` runs from 1 to `count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub index: u32,
    pub count: u32,
    pub point: CartesianPoint,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn is_last(&self) -> bool {
        self.index == self.count
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmenter {
    max_segment_length: f64,
}

impl Segmenter {
    pub fn new(max_segment_length: f64) -> Result<Self, ConfigError> {
        if !max_segment_length.is_finite() || max_segment_length <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "segment_length must be > 0, got {}",
                max_segment_length
            )));
        }
        Ok(Self { max_segment_length })
    }

    /// Segmenter for linear geometries: every move is a single segment.
    pub fn unsegmented() -> Self {
        Self { max_segment_length: f64::INFINITY }
    }

    pub fn max_segment_length(&self) -> f64 {
        self.max_segment_length
    }

    /// `max(1, ceil(D / L))` for feed moves, 1 for rapids. Moves needing
    /// more than [`MAX_SEGMENTS`] are refused rather than clamped.
    pub fn segment_count(&self, request: &MotionRequest) -> Result<u32, LimitViolation> {
        if request.is_rapid() {
            return Ok(1);
        }
        let distance = request.planar_distance();
        let count = (distance / self.max_segment_length).ceil();
        if count > MAX_SEGMENTS as f64 {
            return Err(LimitViolation::TooManySegments {
                distance,
                segment_length: self.max_segment_length,
                max: MAX_SEGMENTS,
            });
        }
        // zero-length moves (and NaN) still get one segment
        if count >= 1.0 { Ok(count as u32) } else { Ok(1) }
    }

    /// Lazily yields the segments of `request` in path order.
    pub fn segments(&self, request: &MotionRequest) -> Result<Segments, LimitViolation> {
        let z_only = request.planar_distance() == 0.0 && request.target.z != request.current.z;
        Ok(Segments {
            current: request.current,
            target: request.target,
            count: self.segment_count(request)?,
            next: 1,
            z_only,
        })
    }
}

/// Iterator over the segments of one request. Allocation free.
#[derive(Debug, Clone)]
pub struct Segments {
    current: CartesianPoint,
    target: CartesianPoint,
    count: u32,
    // wide enough to step past `u32::MAX`
    next: u64,
    z_only: bool,
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.next > u64::from(self.count) {
            return None;
        }
        let index = self.next as u32;
        self.next += 1;
        let point = if index == self.count {
            // exact endpoint, no accumulated rounding
            self.target
        } else {
            self.current.lerp(&self.target, index as f64 / self.count as f64)
        };
        let kind = if self.z_only { SegmentKind::ZOnly } else { SegmentKind::Interpolated };
        Some(Segment { index, count: self.count, point, kind })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (u64::from(self.count) + 1).saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Segments {}
