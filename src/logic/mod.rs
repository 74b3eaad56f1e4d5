//! The command layer: reusable sub-machines and the top-level commands the
//! dispatcher runs, one at a time.
//!
//! A command is a flat state cursor plus a `step` that performs at most one
//! edge per tick and returns true only from a terminal state. Sub-machines
//! are embedded by value; dispatch is a match on the command tag, no heap and
//! no vtables anywhere.

pub mod continue_load;
pub mod cut_filament;
pub mod eject_filament;
pub mod feed_to_finda;
pub mod home;
pub mod load_filament;
pub mod recovery;
pub mod tool_change;
pub mod unload_filament;
pub mod unload_to_finda;

pub use continue_load::ContinueLoad;
pub use cut_filament::CutFilament;
pub use eject_filament::EjectFilament;
pub use feed_to_finda::FeedToFinda;
pub use home::HomeAxes;
pub use load_filament::LoadFilament;
pub use tool_change::ToolChange;
pub use unload_filament::UnloadFilament;
pub use unload_to_finda::UnloadToFinda;

use crate::codes::{ErrorCode, ProgressCode};
use crate::hal::Hal;
use crate::modules::movable::{Movable, MovableState};
use crate::modules::Modules;

/// Map a movable unit stuck in a failure state onto the wire error taxonomy.
pub(crate) fn movable_fault<M: Movable>(unit: &M) -> Option<ErrorCode> {
    match unit.state() {
        MovableState::HomingFailed => Some(ErrorCode::HomingFailed),
        MovableState::TmcFailed => {
            let flags = unit.base_ref().tmc_error_flags;
            Some(if flags.good() {
                // Driver never answered during init.
                ErrorCode::TmcIoinMismatch
            } else {
                flags.as_error()
            })
        }
        _ => None,
    }
}

/// The one running top-level command, owned by the dispatcher.
pub enum Command {
    NoCommand,
    Load(LoadFilament),
    Unload(UnloadFilament),
    ToolChange(ToolChange),
    ContinueLoad(ContinueLoad),
    Cut(CutFilament),
    Eject(EjectFilament),
    Home(HomeAxes),
}

impl Command {
    /// Advance by at most one edge. True from a terminal state.
    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self {
            Command::NoCommand => true,
            Command::Load(c) => c.step(md, hal),
            Command::Unload(c) => c.step(md, hal),
            Command::ToolChange(c) => c.step(md, hal),
            Command::ContinueLoad(c) => c.step(md, hal),
            Command::Cut(c) => c.step(md, hal),
            Command::Eject(c) => c.step(md, hal),
            Command::Home(c) => c.step(md, hal),
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self {
            Command::NoCommand => ProgressCode::Ok,
            Command::Load(c) => c.top_level_state(),
            Command::Unload(c) => c.top_level_state(),
            Command::ToolChange(c) => c.top_level_state(),
            Command::ContinueLoad(c) => c.top_level_state(),
            Command::Cut(c) => c.top_level_state(),
            Command::Eject(c) => c.top_level_state(),
            Command::Home(c) => c.top_level_state(),
        }
    }

    pub fn error(&self) -> ErrorCode {
        match self {
            Command::NoCommand => ErrorCode::Ok,
            Command::Load(c) => c.error(),
            Command::Unload(c) => c.error(),
            Command::ToolChange(c) => c.error(),
            Command::ContinueLoad(c) => c.error(),
            Command::Cut(c) => c.error(),
            Command::Eject(c) => c.error(),
            Command::Home(c) => c.error(),
        }
    }

    /// Button press a recovery cycle consumed this tick, for the host
    /// notification.
    pub fn take_button_event(&mut self) -> Option<u8> {
        match self {
            Command::Load(c) => c.take_button_event(),
            Command::Unload(c) => c.take_button_event(),
            Command::ToolChange(c) => c.take_button_event(),
            Command::ContinueLoad(c) => c.take_button_event(),
            _ => None,
        }
    }
}
