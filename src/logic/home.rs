//! Top-level command for `H<n>`: re-home one axis on demand.

use crate::codes::{ErrorCode, ProgressCode};
use crate::hal::Hal;
use crate::logic::movable_fault;
use crate::modules::movable::Movable;
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Homing,
    Ok,
    Failed,
}

pub struct HomeAxes {
    state: State,
    error: ErrorCode,
    axis_param: u8,
}

impl Default for HomeAxes {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            axis_param: 0,
        }
    }
}

impl HomeAxes {
    /// `param` 0 homes the selector, 1 the idler.
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, param: u8) {
        self.error = ErrorCode::Ok;
        self.axis_param = param;
        match param {
            0 => {
                md.selector.invalidate_homing();
                let slot = md.selector.current_slot();
                md.selector.move_to_slot(&mut md.motion, hal, slot);
            }
            _ => {
                md.idler.invalidate_homing();
                let slot = md.idler.current_slot();
                md.idler.move_to_slot(&mut md.motion, hal, slot);
            }
        }
        self.state = State::Homing;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, _hal: &mut H) -> bool {
        match self.state {
            State::Homing => {
                let (fault, done) = match self.axis_param {
                    0 => (
                        movable_fault(&md.selector),
                        md.selector.ready() && md.selector.homing_valid(),
                    ),
                    _ => (
                        movable_fault(&md.idler),
                        md.idler.ready() && md.idler.homing_valid(),
                    ),
                };
                if let Some(e) = fault {
                    self.error = e;
                    self.state = State::Failed;
                } else if done {
                    self.state = State::Ok;
                }
                false
            }
            State::Ok | State::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::Homing => ProgressCode::Homing,
            State::Ok | State::Failed => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }
}
