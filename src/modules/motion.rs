//! Typed facade over the stepper side of the HAL.
//!
//! The pulse generator below the HAL executes the per-axis FIFOs from the
//! timer interrupt; this module is the only place the rest of the core plans,
//! aborts or observes moves from, and it caches each driver's status register
//! once per loop so every consumer sees the same snapshot within a tick.

use log::warn;

use crate::config;
use crate::hal::{Axis, DriverFlags, Hal, MotorMode, Move};

fn axis_accel(axis: Axis) -> u16 {
    match axis {
        Axis::Pulley => config::PULLEY_ACCEL,
        Axis::Selector => config::SELECTOR_ACCEL,
        Axis::Idler => config::IDLER_ACCEL,
    }
}

pub struct Motion {
    flags: [DriverFlags; 3],
}

impl Motion {
    pub fn new() -> Self {
        Self {
            flags: [DriverFlags::empty(); 3],
        }
    }

    /// Refresh the per-axis driver status snapshot. Called once per loop.
    pub fn step<H: Hal>(&mut self, hal: &mut H) {
        for axis in Axis::ALL {
            self.flags[axis as usize] = hal.driver_flags(axis);
        }
    }

    /// Power up the axis driver and verify comms with it.
    pub fn init_axis<H: Hal>(&self, hal: &mut H, axis: Axis) -> bool {
        hal.stepper_init(axis)
    }

    pub fn set_mode<H: Hal>(&self, hal: &mut H, axis: Axis, mode: MotorMode) {
        hal.stepper_set_mode(axis, mode);
    }

    pub fn set_mode_all<H: Hal>(&self, hal: &mut H, mode: MotorMode) {
        for axis in Axis::ALL {
            hal.stepper_set_mode(axis, mode);
        }
    }

    /// Enqueue a relative move on one axis.
    pub fn plan_move<H: Hal>(&self, hal: &mut H, axis: Axis, steps: i32, feedrate: u16) {
        if steps == 0 {
            return;
        }
        let mv = Move {
            steps,
            feedrate,
            accel: axis_accel(axis),
        };
        if !hal.stepper_enqueue(axis, mv) {
            warn!("move queue full on axis {:?}, move dropped", axis);
        }
    }

    /// Enqueue a move towards an absolute position. Returns the planned delta.
    pub fn plan_move_to<H: Hal>(&self, hal: &mut H, axis: Axis, target: i32, feedrate: u16) -> i32 {
        let delta = target - hal.stepper_position(axis);
        self.plan_move(hal, axis, delta, feedrate);
        delta
    }

    pub fn abort_planned_moves<H: Hal>(&self, hal: &mut H, axis: Axis, keep_current: bool) {
        hal.stepper_abort(axis, keep_current);
    }

    pub fn abort_all<H: Hal>(&self, hal: &mut H) {
        for axis in Axis::ALL {
            hal.stepper_abort(axis, false);
        }
    }

    pub fn queue_empty<H: Hal>(&self, hal: &H, axis: Axis) -> bool {
        hal.stepper_queue_empty(axis)
    }

    pub fn position<H: Hal>(&self, hal: &H, axis: Axis) -> i32 {
        hal.stepper_position(axis)
    }

    pub fn set_position<H: Hal>(&self, hal: &mut H, axis: Axis, position: i32) {
        hal.stepper_set_position(axis, position);
    }

    pub fn stall_guard<H: Hal>(&self, hal: &H, axis: Axis) -> bool {
        hal.stall_guard(axis)
    }

    pub fn stall_guard_reset<H: Hal>(&self, hal: &mut H, axis: Axis) {
        hal.stall_guard_reset(axis);
    }

    /// Driver status as sampled at the top of this loop.
    pub fn driver_flags(&self, axis: Axis) -> DriverFlags {
        self.flags[axis as usize]
    }
}

impl Default for Motion {
    fn default() -> Self {
        Self::new()
    }
}
