//! The selector: a linear carriage aligning one of the five filament paths
//! (or the parking/eject position past them) with the pulley.

use crate::config;
use crate::hal::{Axis, Hal};
use crate::modules::motion::Motion;
use crate::modules::movable::{Movable, MovableBase, OperationResult};

pub struct Selector {
    base: MovableBase,
}

impl Selector {
    pub fn new() -> Self {
        Self {
            base: MovableBase::new(),
        }
    }

    /// Park past the last slot; also the position filament is ejected at.
    pub fn park<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) -> OperationResult {
        self.move_to_slot(motion, hal, config::SLOT_NONE)
    }

    /// Drive the blade sideways through the filament. The carriage position
    /// is unknown afterwards, so the slot reference is invalidated and the
    /// next slot move re-homes.
    pub fn plan_cut_stroke<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) {
        self.invalidate_homing();
        motion.plan_move(
            hal,
            Axis::Selector,
            -config::CUT_STROKE_STEPS,
            config::CUT_FEEDRATE,
        );
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

impl Movable for Selector {
    const AXIS: Axis = Axis::Selector;
    const SLOT_POSITIONS: [i32; 6] = config::SELECTOR_SLOT_POSITIONS;
    const FEEDRATE: u16 = config::SELECTOR_FEEDRATE;
    const HOMING_BUDGET_STEPS: i32 = config::SELECTOR_HOME_STEPS;
    const LENGTH_VALID_MIN: i32 = config::SELECTOR_LENGTH_MIN;
    const LENGTH_VALID_MAX: i32 = config::SELECTOR_LENGTH_MAX;

    fn base(&mut self) -> &mut MovableBase {
        &mut self.base
    }

    fn base_ref(&self) -> &MovableBase {
        &self.base
    }
}
