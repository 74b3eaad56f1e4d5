//! Top-level command: pull the filament out of the printer and park it at
//! the pulley, leaving the unit with no active slot.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::recovery::{RecoveryGoal, RecoveryStatus, SensorRecovery};
use crate::logic::unload_to_finda::{UnloadState, UnloadToFinda};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Unloading,
    Recovering,
    /// Post-recovery retract parking the filament at the pulley.
    FinishingMoves,
    DisengagingIdler,
    Ok,
}

pub struct UnloadFilament {
    state: State,
    error: ErrorCode,
    unload: UnloadToFinda,
    recovery: SensorRecovery,
}

impl Default for UnloadFilament {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            unload: UnloadToFinda::default(),
            recovery: SensorRecovery::default(),
        }
    }
}

impl UnloadFilament {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        self.error = ErrorCode::Ok;
        if !md.globals.filament_loaded() && !md.finda.pressed() {
            // Nothing to do, the unit is already parked.
            self.state = State::Ok;
            return;
        }
        self.unload.reset(md, hal);
        self.state = State::Unloading;
    }

    fn finish<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        let slot = md.globals.active_slot();
        if slot != config::SLOT_NONE {
            md.leds.set_mode(slot, Color::Green, LedMode::Off);
            md.leds.set_mode(slot, Color::Red, LedMode::Off);
        }
        md.globals.set_filament_loaded(false);
        md.globals.set_active_slot(hal, config::SLOT_NONE);
        self.state = State::Ok;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            State::Unloading => {
                if self.unload.step(md, hal) {
                    match self.unload.state() {
                        UnloadState::Ok => self.finish(md, hal),
                        _ => {
                            self.error = ErrorCode::FindaDidntRelease;
                            self.recovery.reset(md, hal, RecoveryGoal::FindaReleased);
                            self.state = State::Recovering;
                        }
                    }
                }
                false
            }
            State::Recovering => {
                match self.recovery.step(md, hal) {
                    RecoveryStatus::Resolved => {
                        // FINDA finally released; park the filament.
                        self.error = ErrorCode::Ok;
                        md.motion.plan_move(
                            hal,
                            Axis::Pulley,
                            -config::UNLOAD_TO_PULLEY_STEPS,
                            config::UNLOAD_FEEDRATE,
                        );
                        self.state = State::FinishingMoves;
                    }
                    RecoveryStatus::FailedAgain => self.error = ErrorCode::FindaDidntRelease,
                    RecoveryStatus::Busy => {}
                }
                false
            }
            State::FinishingMoves => {
                if md.motion.queue_empty(hal, Axis::Pulley) {
                    md.idler.disengage(&mut md.motion, hal);
                    self.state = State::DisengagingIdler;
                }
                false
            }
            State::DisengagingIdler => {
                if !md.idler.engaged() {
                    self.finish(md, hal);
                }
                false
            }
            State::Ok => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::Unloading => self.unload.progress(),
            State::Recovering => self.recovery.progress(),
            State::FinishingMoves => ProgressCode::UnloadingToPulley,
            State::DisengagingIdler => ProgressCode::DisengagingIdler,
            State::Ok => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn take_button_event(&mut self) -> Option<u8> {
        self.recovery.take_button_event()
    }
}
