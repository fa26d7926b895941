// src/motion/planner.rs - Contract with the downstream motion planner
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::motion::types::{ActuatorVector, MotionParams};

/// The planner that turns actuator-space moves into step pulses.
///
/// Queuing, backpressure, acceleration and step timing belong to the
/// planner. The engine only hands over one segment at a time.
pub trait MotionPlanner {
    /// Submit one segment. Returning `false` means the move was cancelled
    /// and no further segments of the current request may be sent.
    fn move_actuators(&mut self, motors: &ActuatorVector, params: &MotionParams) -> bool;
}

impl<P: MotionPlanner + ?Sized> MotionPlanner for Box<P> {
    fn move_actuators(&mut self, motors: &ActuatorVector, params: &MotionParams) -> bool {
        (**self).move_actuators(motors, params)
    }
}

/// Statistics for the motion queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    pub length: usize,
    pub max_length: usize,
    pub submitted: u64,
    pub rejected: u64,
    pub last_command: Option<ActuatorVector>,
}

/// A segment accepted by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedMove {
    pub motors: ActuatorVector,
    pub params: MotionParams,
}

/// Shared abort flag, e.g. set by a jog-cancel realtime command.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// In-process planner backed by a FIFO. Used by the host tool and tests;
/// a real machine drains the queue into the step generator.
#[derive(Debug, Default)]
pub struct QueuedPlanner {
    queue: VecDeque<PlannedMove>,
    stats: QueueStats,
    cancel: CancelHandle,
}

impl QueuedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// Next move for the step generator.
    pub fn pop(&mut self) -> Option<PlannedMove> {
        let next = self.queue.pop_front();
        self.stats.length = self.queue.len();
        next
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PlannedMove> + '_ {
        self.stats.length = 0;
        self.queue.drain(..)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
        self.stats.length = 0;
    }
}

impl MotionPlanner for QueuedPlanner {
    fn move_actuators(&mut self, motors: &ActuatorVector, params: &MotionParams) -> bool {
        if self.cancel.is_cancelled() {
            self.stats.rejected += 1;
            tracing::debug!("Planner rejected {} (cancelled)", motors);
            return false;
        }
        self.queue.push_back(PlannedMove { motors: *motors, params: *params });
        self.stats.length = self.queue.len();
        self.stats.max_length = self.stats.max_length.max(self.queue.len());
        self.stats.submitted += 1;
        self.stats.last_command = Some(*motors);
        true
    }
}
