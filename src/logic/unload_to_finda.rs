//! Reusable sub-machine: pull filament back until FINDA releases, then keep
//! retracting to park it at the pulley and release the idler.

use crate::codes::ProgressCode;
use crate::config;
use crate::hal::{Axis, Hal};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum UnloadState {
    #[default]
    EngagingIdler,
    UnloadingToFinda,
    RetractingFromFinda,
    DisengagingIdler,
    Ok,
    Failed,
}

#[derive(Default)]
pub struct UnloadToFinda {
    state: UnloadState,
}

impl UnloadToFinda {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        self.state = UnloadState::EngagingIdler;
        let slot = md.globals.active_slot();
        md.idler.engage(&mut md.motion, hal, slot);
        md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            UnloadState::EngagingIdler => {
                if md.idler.engaged() {
                    self.state = UnloadState::UnloadingToFinda;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        -config::UNLOAD_TO_FINDA_STEPS,
                        config::UNLOAD_FEEDRATE,
                    );
                }
                false
            }
            UnloadState::UnloadingToFinda => {
                if !md.finda.pressed() {
                    // Tip passed FINDA; park the filament at the pulley.
                    md.motion.abort_planned_moves(hal, Axis::Pulley, false);
                    self.state = UnloadState::RetractingFromFinda;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        -config::UNLOAD_TO_PULLEY_STEPS,
                        config::UNLOAD_FEEDRATE,
                    );
                } else if md.motion.queue_empty(hal, Axis::Pulley) {
                    // The whole retract budget went by with FINDA still on.
                    self.state = UnloadState::Failed;
                }
                false
            }
            UnloadState::RetractingFromFinda => {
                if md.motion.queue_empty(hal, Axis::Pulley) {
                    self.state = UnloadState::DisengagingIdler;
                    md.idler.disengage(&mut md.motion, hal);
                }
                false
            }
            UnloadState::DisengagingIdler => {
                if !md.idler.engaged() {
                    self.state = UnloadState::Ok;
                }
                false
            }
            UnloadState::Ok | UnloadState::Failed => true,
        }
    }

    pub fn state(&self) -> UnloadState {
        self.state
    }

    pub fn progress(&self) -> ProgressCode {
        match self.state {
            UnloadState::EngagingIdler => ProgressCode::EngagingIdler,
            UnloadState::UnloadingToFinda => ProgressCode::UnloadingToFinda,
            UnloadState::RetractingFromFinda => ProgressCode::UnloadingToPulley,
            UnloadState::DisengagingIdler => ProgressCode::DisengagingIdler,
            UnloadState::Ok | UnloadState::Failed => ProgressCode::Ok,
        }
    }
}
