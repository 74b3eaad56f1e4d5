//! Top-level command: push a slot's filament clear of the unit so the user
//! can take the spool out.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::movable_fault;
use crate::modules::leds::{Color, LedMode};
use crate::modules::movable::Movable;
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    ParkingSelector,
    EngagingIdler,
    Ejecting,
    FinishingMoves,
    Ok,
    Failed,
}

pub struct EjectFilament {
    state: State,
    error: ErrorCode,
    target: u8,
}

impl Default for EjectFilament {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            target: config::SLOT_NONE,
        }
    }
}

impl EjectFilament {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, slot: u8) {
        self.error = ErrorCode::Ok;
        self.target = slot;
        md.globals.set_active_slot(hal, slot);
        // Filament leaves through the service opening past the last slot.
        md.selector.park(&mut md.motion, hal);
        md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
        md.leds.set_mode(slot, Color::Red, LedMode::Off);
        self.state = State::ParkingSelector;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            State::ParkingSelector => {
                if let Some(e) = movable_fault(&md.selector) {
                    self.error = e;
                    self.state = State::Failed;
                } else if md.selector.ready() && md.selector.current_slot() == config::SLOT_NONE {
                    md.idler.engage(&mut md.motion, hal, self.target);
                    self.state = State::EngagingIdler;
                }
                false
            }
            State::EngagingIdler => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.error = e;
                    self.state = State::Failed;
                } else if md.idler.engaged() {
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        config::EJECT_STEPS,
                        config::EJECT_FEEDRATE,
                    );
                    self.state = State::Ejecting;
                }
                false
            }
            State::Ejecting => {
                if md.motion.queue_empty(hal, Axis::Pulley) {
                    md.idler.disengage(&mut md.motion, hal);
                    self.state = State::FinishingMoves;
                }
                false
            }
            State::FinishingMoves => {
                if !md.idler.engaged() {
                    md.globals.set_filament_loaded(false);
                    md.globals.set_active_slot(hal, config::SLOT_NONE);
                    md.leds.set_mode(self.target, Color::Green, LedMode::Off);
                    md.leds.set_mode(self.target, Color::Red, LedMode::Off);
                    self.state = State::Ok;
                }
                false
            }
            State::Ok | State::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::ParkingSelector => ProgressCode::ParkingSelector,
            State::EngagingIdler | State::Ejecting => ProgressCode::EjectingFilament,
            State::FinishingMoves => ProgressCode::FinishingMoves,
            State::Ok | State::Failed => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }
}
