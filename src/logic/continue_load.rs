//! Top-level command for `C0`: the filament already sits at FINDA, push it
//! the rest of the way into the printer's extruder gears.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::movable_fault;
use crate::logic::recovery::{RecoveryGoal, RecoveryStatus, SensorRecovery};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    EngagingIdler,
    FeedingToBondtech,
    DisengagingIdler,
    Recovering,
    Ok,
    Failed,
}

pub struct ContinueLoad {
    state: State,
    error: ErrorCode,
    recovery: SensorRecovery,
}

impl Default for ContinueLoad {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            recovery: SensorRecovery::default(),
        }
    }
}

impl ContinueLoad {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        self.error = ErrorCode::Ok;
        self.state = State::EngagingIdler;
        let slot = md.globals.active_slot();
        md.idler.engage(&mut md.motion, hal, slot);
        md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
        md.leds.set_mode(slot, Color::Red, LedMode::Off);
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            State::EngagingIdler => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.error = e;
                    self.state = State::Failed;
                } else if md.idler.engaged() {
                    self.state = State::FeedingToBondtech;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        config::FEED_TO_BONDTECH_STEPS,
                        config::BONDTECH_FEEDRATE,
                    );
                }
                false
            }
            State::FeedingToBondtech => {
                if md.fsensor.pressed() {
                    md.motion.abort_planned_moves(hal, Axis::Pulley, false);
                    self.state = State::DisengagingIdler;
                    md.idler.disengage(&mut md.motion, hal);
                } else if md.motion.queue_empty(hal, Axis::Pulley) {
                    self.error = ErrorCode::FsensorDidntTrigger;
                    self.recovery.reset(md, hal, RecoveryGoal::FsensorTriggered);
                    self.state = State::Recovering;
                }
                false
            }
            State::DisengagingIdler => {
                if !md.idler.engaged() {
                    md.globals.set_filament_loaded(true);
                    let slot = md.globals.active_slot();
                    md.leds.set_mode(slot, Color::Green, LedMode::On);
                    md.leds.set_mode(slot, Color::Red, LedMode::Off);
                    self.state = State::Ok;
                }
                false
            }
            State::Recovering => {
                match self.recovery.step(md, hal) {
                    RecoveryStatus::Resolved => {
                        self.error = ErrorCode::Ok;
                        self.state = State::DisengagingIdler;
                        md.idler.disengage(&mut md.motion, hal);
                    }
                    RecoveryStatus::FailedAgain => self.error = ErrorCode::FsensorDidntTrigger,
                    RecoveryStatus::Busy => {}
                }
                false
            }
            State::Ok | State::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::EngagingIdler => ProgressCode::EngagingIdler,
            State::FeedingToBondtech => ProgressCode::FeedingToBondtech,
            State::DisengagingIdler => ProgressCode::DisengagingIdler,
            State::Recovering => self.recovery.progress(),
            State::Ok | State::Failed => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn take_button_event(&mut self) -> Option<u8> {
        self.recovery.take_button_event()
    }
}
