//! Shared movement and homing protocol of the selector and the idler.
//!
//! Both units address a small set of slot positions on one axis and find
//! their reference by a two-pass StallGuard homing run: drive into the far
//! stop, reverse into the near stop, sanity-check the measured travel and
//! rebase the axis to zero there. While `homing_valid` is false any slot move
//! re-homes first and then continues to the requested slot.

use log::{debug, warn};

use crate::config;
use crate::hal::{Axis, DriverFlags, Hal, MotorMode};
use crate::modules::globals::Globals;
use crate::modules::motion::Motion;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MovableState {
    Ready,
    Moving,
    HomeForward,
    HomeBack,
    HomingFailed,
    TmcFailed,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperationResult {
    Accepted,
    Refused,
    Failed,
}

/// State shared by both movable units.
pub struct MovableBase {
    pub state: MovableState,
    pub planned_slot: u8,
    pub current_slot: u8,
    pub homing_valid: bool,
    /// Snapshot of the driver status that sent us to `TmcFailed`.
    pub tmc_error_flags: DriverFlags,
    /// Axis position captured at the far-stop stall, for length measurement.
    first_stall_position: i32,
}

impl MovableBase {
    pub fn new() -> Self {
        Self {
            state: MovableState::Ready,
            planned_slot: config::SLOT_NONE,
            current_slot: config::SLOT_NONE,
            homing_valid: false,
            tmc_error_flags: DriverFlags::empty(),
            first_stall_position: 0,
        }
    }
}

impl Default for MovableBase {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Movable {
    const AXIS: Axis;
    /// Slot coordinates; index 5 is the park (selector) or disengaged (idler)
    /// position.
    const SLOT_POSITIONS: [i32; 6];
    const FEEDRATE: u16;
    /// Homing move budget, longer than the axis can physically travel.
    const HOMING_BUDGET_STEPS: i32;
    const LENGTH_VALID_MIN: i32;
    const LENGTH_VALID_MAX: i32;

    fn base(&mut self) -> &mut MovableBase;
    fn base_ref(&self) -> &MovableBase;

    fn state(&self) -> MovableState {
        self.base_ref().state
    }

    fn ready(&self) -> bool {
        self.base_ref().state == MovableState::Ready
    }

    fn current_slot(&self) -> u8 {
        self.base_ref().current_slot
    }

    fn planned_slot(&self) -> u8 {
        self.base_ref().planned_slot
    }

    fn homing_valid(&self) -> bool {
        self.base_ref().homing_valid
    }

    /// Force a re-home before the next slot move.
    fn invalidate_homing(&mut self) {
        self.base().homing_valid = false;
    }

    /// Ask the unit to travel to `slot`. Re-homes first when the reference is
    /// not valid. Refused while a previous movement is still in progress.
    fn move_to_slot<H: Hal>(
        &mut self,
        motion: &mut Motion,
        hal: &mut H,
        slot: u8,
    ) -> OperationResult {
        let base = self.base();
        match base.state {
            MovableState::Moving | MovableState::HomeForward | MovableState::HomeBack => {
                return OperationResult::Refused;
            }
            _ => {}
        }
        if base.homing_valid && base.state == MovableState::Ready && base.current_slot == slot {
            return OperationResult::Accepted;
        }
        base.planned_slot = slot;
        if !base.homing_valid {
            return self.plan_home(motion, hal);
        }
        self.init_movement(motion, hal)
    }

    /// Start the two-pass homing run. The planned slot is travelled to once
    /// the reference is re-established.
    fn plan_home<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) -> OperationResult {
        if !motion.init_axis(hal, Self::AXIS) {
            self.base().state = MovableState::TmcFailed;
            return OperationResult::Failed;
        }
        // Homing always runs in normal mode, StallGuard needs the torque.
        motion.set_mode(hal, Self::AXIS, MotorMode::Normal);
        motion.stall_guard_reset(hal, Self::AXIS);
        motion.plan_move(hal, Self::AXIS, Self::HOMING_BUDGET_STEPS, Self::FEEDRATE);
        self.base().state = MovableState::HomeForward;
        OperationResult::Accepted
    }

    fn init_movement<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) -> OperationResult {
        if motion.init_axis(hal, Self::AXIS) {
            let slot = self.base_ref().planned_slot;
            motion.plan_move_to(
                hal,
                Self::AXIS,
                Self::SLOT_POSITIONS[slot as usize],
                Self::FEEDRATE,
            );
            self.base().state = MovableState::Moving;
            OperationResult::Accepted
        } else {
            self.base().state = MovableState::TmcFailed;
            OperationResult::Failed
        }
    }

    /// Advance the unit by one tick.
    fn step<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H, globals: &Globals) {
        match self.base_ref().state {
            MovableState::Moving => self.perform_move(motion, hal),
            MovableState::HomeForward => self.perform_home_forward(motion, hal, globals),
            MovableState::HomeBack => self.perform_home_back(motion, hal, globals),
            _ => {}
        }
    }

    fn perform_move<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) {
        let flags = motion.driver_flags(Self::AXIS);
        if !flags.good() {
            // The driver tripped, the planned move can't have finished.
            let base = self.base();
            base.tmc_error_flags = flags;
            base.state = MovableState::TmcFailed;
            warn!("TMC failure on {:?}: {:?}", Self::AXIS, flags);
        } else if motion.queue_empty(hal, Self::AXIS) {
            let base = self.base();
            base.current_slot = base.planned_slot;
            base.state = MovableState::Ready;
        }
    }

    fn perform_home_forward<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H, globals: &Globals) {
        if motion.stall_guard(hal, Self::AXIS) {
            // Far stop found; measure from here on the way back.
            self.base().first_stall_position = motion.position(hal, Self::AXIS);
            motion.stall_guard_reset(hal, Self::AXIS);
            motion.abort_planned_moves(hal, Self::AXIS, true);
            motion.plan_move(hal, Self::AXIS, -Self::HOMING_BUDGET_STEPS, Self::FEEDRATE);
            self.base().state = MovableState::HomeBack;
        } else if motion.queue_empty(hal, Self::AXIS) {
            self.home_failed(motion, hal, globals);
        }
    }

    fn perform_home_back<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H, globals: &Globals) {
        if motion.stall_guard(hal, Self::AXIS) {
            motion.stall_guard_reset(hal, Self::AXIS);
            motion.abort_planned_moves(hal, Self::AXIS, true);
            let mode = if globals.motors_stealth() {
                MotorMode::Stealth
            } else {
                MotorMode::Normal
            };
            motion.set_mode(hal, Self::AXIS, mode);

            let length = self.base_ref().first_stall_position - motion.position(hal, Self::AXIS);
            let length = length.abs();
            if !(Self::LENGTH_VALID_MIN..=Self::LENGTH_VALID_MAX).contains(&length) {
                // Something is blocking the axis, the measured travel is off.
                warn!("homing {:?}: measured length {} out of range", Self::AXIS, length);
                self.base().homing_valid = false;
                self.base().state = MovableState::HomingFailed;
                return;
            }
            debug!("homing {:?} ok, length {}", Self::AXIS, length);
            motion.set_position(hal, Self::AXIS, 0);
            self.base().homing_valid = true;
            // Continue straight to wherever the unit was asked to go.
            self.init_movement(motion, hal);
        } else if motion.queue_empty(hal, Self::AXIS) {
            self.home_failed(motion, hal, globals);
        }
    }

    fn home_failed<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H, globals: &Globals) {
        // Ran out of planned moves without a StallGuard event.
        warn!("homing {:?} failed, no stall within budget", Self::AXIS);
        let mode = if globals.motors_stealth() {
            MotorMode::Stealth
        } else {
            MotorMode::Normal
        };
        motion.set_mode(hal, Self::AXIS, mode);
        let base = self.base();
        base.homing_valid = false;
        base.state = MovableState::HomingFailed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimHal;
    use crate::modules::selector::Selector;

    struct Rig {
        hal: SimHal,
        motion: Motion,
        globals: Globals,
        selector: Selector,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                hal: SimHal::new(),
                motion: Motion::new(),
                globals: Globals::new(),
                selector: Selector::new(),
            }
        }

        fn run_until_settled(&mut self, max_ticks: u32) -> bool {
            for _ in 0..max_ticks {
                self.hal.tick(1);
                self.motion.step(&mut self.hal);
                self.selector
                    .step(&mut self.motion, &mut self.hal, &self.globals);
                match self.selector.state() {
                    MovableState::Ready
                    | MovableState::HomingFailed
                    | MovableState::TmcFailed => return true,
                    _ => {}
                }
            }
            false
        }
    }

    #[test]
    fn first_move_homes_then_travels_to_slot() {
        let mut rig = Rig::new();
        assert!(!rig.selector.homing_valid());

        let result = rig
            .selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 2);
        assert_eq!(result, OperationResult::Accepted);
        assert_eq!(rig.selector.state(), MovableState::HomeForward);

        assert!(rig.run_until_settled(10_000));
        assert_eq!(rig.selector.state(), MovableState::Ready);
        assert!(rig.selector.homing_valid());
        assert_eq!(rig.selector.current_slot(), 2);
        assert_eq!(
            rig.hal.stepper_position(Axis::Selector),
            config::SELECTOR_SLOT_POSITIONS[2]
        );
    }

    #[test]
    fn homed_axis_moves_directly() {
        let mut rig = Rig::new();
        rig.selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 2);
        assert!(rig.run_until_settled(10_000));

        rig.selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 4);
        assert_eq!(rig.selector.state(), MovableState::Moving);
        assert!(rig.run_until_settled(10_000));
        assert_eq!(rig.selector.current_slot(), 4);
    }

    #[test]
    fn move_refused_while_in_motion() {
        let mut rig = Rig::new();
        rig.selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 2);
        assert_eq!(
            rig.selector.move_to_slot(&mut rig.motion, &mut rig.hal, 3),
            OperationResult::Refused
        );
    }

    #[test]
    fn missing_stall_fails_homing() {
        let mut rig = Rig::new();
        // Stretch the simulated axis beyond the homing budget so the forward
        // pass never finds a stop.
        rig.hal.axis_mut(Axis::Selector).travel_max = 10_000;

        rig.selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 1);
        assert!(rig.run_until_settled(20_000));
        assert_eq!(rig.selector.state(), MovableState::HomingFailed);
        assert!(!rig.selector.homing_valid());
    }

    #[test]
    fn blocked_axis_fails_length_validation() {
        let mut rig = Rig::new();
        // Something jams the carriage halfway: both stops are found but the
        // measured travel is far too short.
        let ax = rig.hal.axis_mut(Axis::Selector);
        ax.travel_max = 2000;
        ax.position = 1000;

        rig.selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 1);
        assert!(rig.run_until_settled(20_000));
        assert_eq!(rig.selector.state(), MovableState::HomingFailed);
    }

    #[test]
    fn dead_driver_reports_tmc_failure() {
        let mut rig = Rig::new();
        rig.hal.axis_mut(Axis::Selector).init_ok = false;

        let result = rig
            .selector
            .move_to_slot(&mut rig.motion, &mut rig.hal, 2);
        assert_eq!(result, OperationResult::Failed);
        assert_eq!(rig.selector.state(), MovableState::TmcFailed);
    }
}
