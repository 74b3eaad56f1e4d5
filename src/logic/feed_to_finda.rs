//! Reusable sub-machine: push filament from the pulley forward until FINDA
//! triggers, then park the tip back into the PTFE and release the idler.

use crate::codes::ProgressCode;
use crate::config;
use crate::hal::{Axis, Hal};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum FeedState {
    #[default]
    EngagingIdler,
    PushingFilament,
    UnloadBackToPtfe,
    DisengagingIdler,
    Ok,
    Failed,
}

#[derive(Default)]
pub struct FeedToFinda {
    state: FeedState,
    /// Limited phase: the filament tip is known to be near the pulley, so the
    /// push budget is short and a button press aborts the feed.
    limited: bool,
}

impl FeedToFinda {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, limited: bool) {
        self.state = FeedState::EngagingIdler;
        self.limited = limited;
        let slot = md.globals.active_slot();
        md.idler.engage(&mut md.motion, hal, slot);
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            FeedState::EngagingIdler => {
                if md.idler.engaged() {
                    self.state = FeedState::PushingFilament;
                    md.leds
                        .set_mode(md.globals.active_slot(), Color::Green, LedMode::Blink0);
                    let steps = if self.limited {
                        config::FEED_TO_FINDA_LIMITED_STEPS
                    } else {
                        config::FEED_TO_FINDA_UNLIMITED_STEPS
                    };
                    md.motion
                        .plan_move(hal, Axis::Pulley, steps, config::FEED_FEEDRATE);
                }
                false
            }
            FeedState::PushingFilament => {
                if md.finda.pressed() || (self.limited && md.buttons.any_button_pressed()) {
                    // FINDA detected the filament tip (or the user pulled the
                    // plug on a short feed); stop pushing and park the tip.
                    md.motion.abort_planned_moves(hal, Axis::Pulley, false);
                    self.state = FeedState::UnloadBackToPtfe;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        -config::FEED_RETRACT_STEPS,
                        config::FEED_FEEDRATE,
                    );
                } else if md.motion.queue_empty(hal, Axis::Pulley) {
                    // Budget ran out and FINDA never switched on.
                    self.state = FeedState::Failed;
                }
                false
            }
            FeedState::UnloadBackToPtfe => {
                if md.motion.queue_empty(hal, Axis::Pulley) {
                    self.state = FeedState::DisengagingIdler;
                    md.idler.disengage(&mut md.motion, hal);
                }
                false
            }
            FeedState::DisengagingIdler => {
                if !md.idler.engaged() {
                    self.state = FeedState::Ok;
                    md.leds
                        .set_mode(md.globals.active_slot(), Color::Green, LedMode::On);
                }
                false
            }
            FeedState::Ok | FeedState::Failed => true,
        }
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn progress(&self) -> ProgressCode {
        match self.state {
            FeedState::EngagingIdler => ProgressCode::EngagingIdler,
            FeedState::PushingFilament | FeedState::UnloadBackToPtfe => {
                ProgressCode::FeedingToFinda
            }
            FeedState::DisengagingIdler => ProgressCode::DisengagingIdler,
            FeedState::Ok | FeedState::Failed => ProgressCode::Ok,
        }
    }
}
