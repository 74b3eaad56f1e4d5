//! Top-level command: load filament from the given slot up to the printer's
//! extruder gears.
//!
//! Happy path: engage the idler, run the feed-to-FINDA sub-machine (short
//! push budget, the tip is right at the pulley), then grab the filament again
//! and push until the printer's filament sensor triggers, release the idler.
//! Either sensor missing its cue drops into the user recovery cycle and the
//! command resumes from the appropriate phase once the sensor finally
//! reports.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::feed_to_finda::{FeedState, FeedToFinda};
use crate::logic::movable_fault;
use crate::logic::recovery::{RecoveryGoal, RecoveryStatus, SensorRecovery};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum LoadState {
    EngagingIdler,
    /// The embedded [`FeedToFinda`] runs here, retract and release included.
    FeedingToFinda,
    /// Re-grip after the feed sub-machine released the idler.
    EngagingForBondtech,
    FeedingToBondtech,
    DisengagingIdler,
    Recovering,
    Ok,
    Failed,
}

pub struct LoadFilament {
    state: LoadState,
    error: ErrorCode,
    feed: FeedToFinda,
    recovery: SensorRecovery,
    recovery_goal: RecoveryGoal,
}

impl Default for LoadFilament {
    fn default() -> Self {
        Self {
            state: LoadState::Ok,
            error: ErrorCode::Ok,
            feed: FeedToFinda::default(),
            recovery: SensorRecovery::default(),
            recovery_goal: RecoveryGoal::FindaTriggered,
        }
    }
}

impl LoadFilament {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, slot: u8) {
        self.state = LoadState::EngagingIdler;
        self.error = ErrorCode::Ok;
        md.globals.set_active_slot(hal, slot);
        md.idler.engage(&mut md.motion, hal, slot);
        md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
        md.leds.set_mode(slot, Color::Red, LedMode::Off);
    }

    fn enter_recovery<H: Hal>(
        &mut self,
        md: &mut Modules,
        hal: &mut H,
        goal: RecoveryGoal,
        error: ErrorCode,
    ) {
        self.error = error;
        self.recovery_goal = goal;
        self.recovery.reset(md, hal, goal);
        self.state = LoadState::Recovering;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            LoadState::EngagingIdler => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.error = e;
                    self.state = LoadState::Failed;
                } else if md.idler.engaged() {
                    // The tip was just inserted by the user, so the feed
                    // phase is the limited one.
                    self.feed.reset(md, hal, true);
                    self.state = LoadState::FeedingToFinda;
                }
                false
            }
            LoadState::FeedingToFinda => {
                if self.feed.step(md, hal) {
                    match self.feed.state() {
                        FeedState::Ok => {
                            // Tip parked just short of FINDA and the idler
                            // released; grab the filament again for the push
                            // into the printer.
                            let slot = md.globals.active_slot();
                            md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
                            md.idler.engage(&mut md.motion, hal, slot);
                            self.state = LoadState::EngagingForBondtech;
                        }
                        _ => self.enter_recovery(
                            md,
                            hal,
                            RecoveryGoal::FindaTriggered,
                            ErrorCode::FindaDidntTrigger,
                        ),
                    }
                }
                false
            }
            LoadState::EngagingForBondtech => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.error = e;
                    self.state = LoadState::Failed;
                } else if md.idler.engaged() {
                    self.state = LoadState::FeedingToBondtech;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        config::FEED_TO_BONDTECH_STEPS,
                        config::BONDTECH_FEEDRATE,
                    );
                }
                false
            }
            LoadState::FeedingToBondtech => {
                if md.fsensor.pressed() {
                    md.motion.abort_planned_moves(hal, Axis::Pulley, false);
                    self.state = LoadState::DisengagingIdler;
                    md.idler.disengage(&mut md.motion, hal);
                } else if md.motion.queue_empty(hal, Axis::Pulley) {
                    self.enter_recovery(
                        md,
                        hal,
                        RecoveryGoal::FsensorTriggered,
                        ErrorCode::FsensorDidntTrigger,
                    );
                }
                false
            }
            LoadState::DisengagingIdler => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.error = e;
                    self.state = LoadState::Failed;
                } else if !md.idler.engaged() {
                    md.globals.set_filament_loaded(true);
                    let slot = md.globals.active_slot();
                    md.leds.set_mode(slot, Color::Green, LedMode::On);
                    md.leds.set_mode(slot, Color::Red, LedMode::Off);
                    self.state = LoadState::Ok;
                }
                false
            }
            LoadState::Recovering => {
                match self.recovery.step(md, hal) {
                    RecoveryStatus::Resolved => {
                        self.error = ErrorCode::Ok;
                        match self.recovery_goal {
                            RecoveryGoal::FindaTriggered => {
                                // Filament found FINDA with the user's help
                                // and the idler already grips it; carry on
                                // towards the extruder.
                                self.state = LoadState::FeedingToBondtech;
                                md.motion.plan_move(
                                    hal,
                                    Axis::Pulley,
                                    config::FEED_TO_BONDTECH_STEPS,
                                    config::BONDTECH_FEEDRATE,
                                );
                            }
                            _ => {
                                self.state = LoadState::DisengagingIdler;
                                md.idler.disengage(&mut md.motion, hal);
                            }
                        }
                    }
                    RecoveryStatus::FailedAgain => {
                        self.error = match self.recovery_goal {
                            RecoveryGoal::FsensorTriggered => ErrorCode::FsensorDidntTrigger,
                            _ => ErrorCode::FindaDidntTrigger,
                        };
                    }
                    RecoveryStatus::Busy => {}
                }
                false
            }
            LoadState::Ok | LoadState::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            LoadState::EngagingIdler => ProgressCode::EngagingIdler,
            // The whole embedded feed run, retract included, reads as the
            // feeding phase so progress stays nondecreasing on the wire.
            LoadState::FeedingToFinda => ProgressCode::FeedingToFinda,
            LoadState::EngagingForBondtech | LoadState::FeedingToBondtech => {
                ProgressCode::FeedingToBondtech
            }
            LoadState::DisengagingIdler => ProgressCode::DisengagingIdler,
            LoadState::Recovering => self.recovery.progress(),
            LoadState::Ok | LoadState::Failed => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }

    pub fn take_button_event(&mut self) -> Option<u8> {
        self.recovery.take_button_event()
    }
}
