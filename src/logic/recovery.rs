//! Error recovery with user intervention, shared by the commands that wait on
//! a sensor expectation.
//!
//! The cycle is: release the idler so the user can reach the filament, wait
//! for a button, re-engage, nudge the pulley slowly while the user helps the
//! filament along, and watch the sensor. Success hands control back to the
//! owning command; another miss releases the idler again and the cycle
//! repeats for as long as the user keeps trying.

use crate::codes::ProgressCode;
use crate::config;
use crate::hal::{Axis, Hal};
use crate::modules::leds::{Color, LedMode};
use crate::modules::Modules;

/// What the recovery waits for before declaring the problem solved.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryGoal {
    FindaTriggered,
    FindaReleased,
    FsensorTriggered,
}

impl RecoveryGoal {
    fn met(self, md: &Modules) -> bool {
        match self {
            RecoveryGoal::FindaTriggered => md.finda.pressed(),
            RecoveryGoal::FindaReleased => !md.finda.pressed(),
            RecoveryGoal::FsensorTriggered => md.fsensor.pressed(),
        }
    }

    /// Direction of the help nudge: feed towards the sensor we want to
    /// trigger, retract away from the one we want released.
    fn help_steps(self) -> i32 {
        match self {
            RecoveryGoal::FindaReleased => -config::RECOVERY_HELP_STEPS,
            _ => config::RECOVERY_HELP_STEPS,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
enum RecoveryState {
    #[default]
    DisengagingIdler,
    WaitingForUser,
    EngagingIdler,
    HelpingFilament,
    Resolved,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryStatus {
    Busy,
    /// The help attempt ran out without the sensor changing; the cycle went
    /// back to waiting for the user.
    FailedAgain,
    Resolved,
}

pub struct SensorRecovery {
    goal: RecoveryGoal,
    state: RecoveryState,
    button_event: Option<u8>,
}

impl Default for SensorRecovery {
    fn default() -> Self {
        Self {
            goal: RecoveryGoal::FindaTriggered,
            state: RecoveryState::DisengagingIdler,
            button_event: None,
        }
    }
}

impl SensorRecovery {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, goal: RecoveryGoal) {
        self.goal = goal;
        self.state = RecoveryState::DisengagingIdler;
        self.button_event = None;
        md.motion.abort_planned_moves(hal, Axis::Pulley, false);
        md.idler.disengage(&mut md.motion, hal);
        let slot = md.globals.active_slot();
        md.leds.set_mode(slot, Color::Green, LedMode::Off);
        md.leds.set_mode(slot, Color::Red, LedMode::Blink0);
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> RecoveryStatus {
        match self.state {
            RecoveryState::DisengagingIdler => {
                if !md.idler.engaged() {
                    self.state = RecoveryState::WaitingForUser;
                }
                RecoveryStatus::Busy
            }
            RecoveryState::WaitingForUser => {
                if let Some(button) = md.buttons.consume_any() {
                    self.button_event = Some(button);
                    self.state = RecoveryState::EngagingIdler;
                    let slot = md.globals.active_slot();
                    md.idler.engage(&mut md.motion, hal, slot);
                }
                RecoveryStatus::Busy
            }
            RecoveryState::EngagingIdler => {
                if md.idler.engaged() {
                    self.state = RecoveryState::HelpingFilament;
                    md.motion.plan_move(
                        hal,
                        Axis::Pulley,
                        self.goal.help_steps(),
                        config::RECOVERY_HELP_FEEDRATE,
                    );
                }
                RecoveryStatus::Busy
            }
            RecoveryState::HelpingFilament => {
                if self.goal.met(md) {
                    md.motion.abort_planned_moves(hal, Axis::Pulley, false);
                    self.state = RecoveryState::Resolved;
                    RecoveryStatus::Resolved
                } else if md.motion.queue_empty(hal, Axis::Pulley) {
                    // No luck; release again and let the user have another go.
                    self.state = RecoveryState::DisengagingIdler;
                    md.idler.disengage(&mut md.motion, hal);
                    RecoveryStatus::FailedAgain
                } else {
                    RecoveryStatus::Busy
                }
            }
            RecoveryState::Resolved => RecoveryStatus::Resolved,
        }
    }

    /// Button press consumed while waiting, reported to the host once.
    pub fn take_button_event(&mut self) -> Option<u8> {
        self.button_event.take()
    }

    pub fn progress(&self) -> ProgressCode {
        match self.state {
            RecoveryState::DisengagingIdler => ProgressCode::Err1DisengagingIdler,
            RecoveryState::WaitingForUser => ProgressCode::Err1WaitingForUser,
            RecoveryState::EngagingIdler => ProgressCode::Err1EngagingIdler,
            RecoveryState::HelpingFilament | RecoveryState::Resolved => {
                ProgressCode::Err1HelpingFilament
            }
        }
    }
}
