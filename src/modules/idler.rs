//! The idler: a rotating bearing carriage pressing filament against the
//! pulley. Slot positions engage one filament path each; the index-5 home
//! position disengages completely.

use crate::config;
use crate::hal::{Axis, Hal};
use crate::modules::motion::Motion;
use crate::modules::movable::{Movable, MovableBase, OperationResult};

pub struct Idler {
    base: MovableBase,
}

impl Idler {
    pub fn new() -> Self {
        Self {
            base: MovableBase::new(),
        }
    }

    /// Press the bearing onto the given slot's filament path.
    pub fn engage<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H, slot: u8) -> OperationResult {
        self.move_to_slot(motion, hal, slot)
    }

    pub fn disengage<H: Hal>(&mut self, motion: &mut Motion, hal: &mut H) -> OperationResult {
        self.move_to_slot(motion, hal, config::SLOT_NONE)
    }

    /// True once the bearing actually presses a filament path. Goes true when
    /// an engage move completes and stays true for the whole of a disengage
    /// move, since the bearing still touches the filament until it is out.
    pub fn engaged(&self) -> bool {
        self.base.current_slot != config::SLOT_NONE
    }
}

impl Default for Idler {
    fn default() -> Self {
        Self::new()
    }
}

impl Movable for Idler {
    const AXIS: Axis = Axis::Idler;
    const SLOT_POSITIONS: [i32; 6] = config::IDLER_SLOT_POSITIONS;
    const FEEDRATE: u16 = config::IDLER_FEEDRATE;
    const HOMING_BUDGET_STEPS: i32 = config::IDLER_HOME_STEPS;
    const LENGTH_VALID_MIN: i32 = config::IDLER_LENGTH_MIN;
    const LENGTH_VALID_MAX: i32 = config::IDLER_LENGTH_MAX;

    fn base(&mut self) -> &mut MovableBase {
        &mut self.base
    }

    fn base_ref(&self) -> &MovableBase {
        &self.base
    }
}
