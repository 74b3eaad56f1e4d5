//! Top-level command: swap the loaded filament for the one in another slot.
//!
//! Unloads whatever is loaded, aligns the selector with the new slot, feeds
//! to FINDA, then on to the printer's extruder. Requesting the slot that is
//! already loaded completes immediately without any motion.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::feed_to_finda::{FeedState, FeedToFinda};
use crate::logic::movable_fault;
use crate::logic::recovery::{RecoveryGoal, RecoveryStatus, SensorRecovery};
use crate::logic::unload_to_finda::{UnloadState, UnloadToFinda};
use crate::modules::leds::{Color, LedMode};
use crate::modules::movable::Movable;
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Unloading,
    /// Post-recovery retract after FINDA finally released.
    RetractingAfterRecovery,
    DisengagingOld,
    MovingSelector,
    Feeding,
    EngagingIdler,
    FeedingToBondtech,
    DisengagingIdler,
    Recovering,
    Ok,
    Failed,
}

pub struct ToolChange {
    state: State,
    error: ErrorCode,
    target: u8,
    unload: UnloadToFinda,
    feed: FeedToFinda,
    recovery: SensorRecovery,
    recovery_goal: RecoveryGoal,
}

impl Default for ToolChange {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            target: config::SLOT_NONE,
            unload: UnloadToFinda::default(),
            feed: FeedToFinda::default(),
            recovery: SensorRecovery::default(),
            recovery_goal: RecoveryGoal::FindaTriggered,
        }
    }
}

impl ToolChange {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, slot: u8) {
        self.error = ErrorCode::Ok;
        self.target = slot;
        if md.globals.filament_loaded() && md.globals.active_slot() == slot {
            // Already loaded from this very slot.
            self.state = State::Ok;
            return;
        }
        if md.globals.filament_loaded() {
            self.unload.reset(md, hal);
            self.state = State::Unloading;
        } else {
            self.begin_selector_move(md, hal);
        }
    }

    fn begin_selector_move<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        md.globals.set_active_slot(hal, self.target);
        md.leds
            .set_mode(self.target, Color::Green, LedMode::Blink0);
        md.selector.move_to_slot(&mut md.motion, hal, self.target);
        self.state = State::MovingSelector;
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
        self.state = State::Recovering;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            State::Unloading => {
                if self.unload.step(md, hal) {
                    match self.unload.state() {
                        UnloadState::Ok => {
                            let old = md.globals.active_slot();
                            md.leds.set_mode(old, Color::Green, LedMode::Off);
                            md.globals.set_filament_loaded(false);
                            self.begin_selector_move(md, hal);
                        }
                        _ => self.enter_recovery(
                            md,
                            hal,
                            RecoveryGoal::FindaReleased,
                            ErrorCode::FindaDidntRelease,
                        ),
                    }
                }
                false
            }
            State::RetractingAfterRecovery => {
                if md.motion.queue_empty(hal, Axis::Pulley) {
                    md.idler.disengage(&mut md.motion, hal);
                    self.state = State::DisengagingOld;
                }
                false
            }
            State::DisengagingOld => {
                if !md.idler.engaged() {
                    let old = md.globals.active_slot();
                    md.leds.set_mode(old, Color::Green, LedMode::Off);
                    md.globals.set_filament_loaded(false);
                    self.begin_selector_move(md, hal);
                }
                false
            }
            State::MovingSelector => {
                if let Some(e) = movable_fault(&md.selector) {
                    self.error = e;
                    self.state = State::Failed;
                } else if md.selector.ready() && md.selector.current_slot() == self.target {
                    self.feed.reset(md, hal, false);
                    self.state = State::Feeding;
                }
                false
            }
            State::Feeding => {
                if self.feed.step(md, hal) {
                    match self.feed.state() {
                        FeedState::Ok => {
                            // Tip is parked just short of FINDA; grab the
                            // filament again and drive it into the printer.
                            self.state = State::EngagingIdler;
                            md.idler.engage(&mut md.motion, hal, self.target);
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
                    self.enter_recovery(
                        md,
                        hal,
                        RecoveryGoal::FsensorTriggered,
                        ErrorCode::FsensorDidntTrigger,
                    );
                }
                false
            }
            State::DisengagingIdler => {
                if !md.idler.engaged() {
                    md.globals.set_filament_loaded(true);
                    md.leds.set_mode(self.target, Color::Green, LedMode::On);
                    md.leds.set_mode(self.target, Color::Red, LedMode::Off);
                    self.state = State::Ok;
                }
                false
            }
            State::Recovering => {
                match self.recovery.step(md, hal) {
                    RecoveryStatus::Resolved => {
                        self.error = ErrorCode::Ok;
                        match self.recovery_goal {
                            RecoveryGoal::FindaReleased => {
                                md.motion.plan_move(
                                    hal,
                                    Axis::Pulley,
                                    -config::UNLOAD_TO_PULLEY_STEPS,
                                    config::UNLOAD_FEEDRATE,
                                );
                                self.state = State::RetractingAfterRecovery;
                            }
                            RecoveryGoal::FindaTriggered => {
                                self.state = State::FeedingToBondtech;
                                md.motion.plan_move(
                                    hal,
                                    Axis::Pulley,
                                    config::FEED_TO_BONDTECH_STEPS,
                                    config::BONDTECH_FEEDRATE,
                                );
                            }
                            RecoveryGoal::FsensorTriggered => {
                                self.state = State::DisengagingIdler;
                                md.idler.disengage(&mut md.motion, hal);
                            }
                        }
                    }
                    RecoveryStatus::FailedAgain => {
                        self.error = match self.recovery_goal {
                            RecoveryGoal::FindaTriggered => ErrorCode::FindaDidntTrigger,
                            RecoveryGoal::FindaReleased => ErrorCode::FindaDidntRelease,
                            RecoveryGoal::FsensorTriggered => ErrorCode::FsensorDidntTrigger,
                        };
                    }
                    RecoveryStatus::Busy => {}
                }
                false
            }
            State::Ok | State::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::Unloading => match self.unload.state() {
                UnloadState::EngagingIdler => ProgressCode::EngagingIdler,
                UnloadState::UnloadingToFinda => ProgressCode::UnloadingToFinda,
                _ => ProgressCode::UnloadingToPulley,
            },
            State::RetractingAfterRecovery | State::DisengagingOld => {
                ProgressCode::UnloadingToPulley
            }
            State::MovingSelector => ProgressCode::MovingSelector,
            State::Feeding => ProgressCode::FeedingToFinda,
            State::EngagingIdler | State::FeedingToBondtech => ProgressCode::FeedingToBondtech,
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
