//! Shared fixture for the end-to-end scenarios: the whole unit over the
//! simulated HAL, plus the stepping/verification helpers the command tests
//! are written in terms of.

#![allow(dead_code)]

use weaver::codes::{ErrorCode, ProgressCode};
use weaver::config;
use weaver::hal::sim::SimHal;
use weaver::logic::Command;
use weaver::modules::leds::{Color, LedMode};
use weaver::modules::movable::Movable;
use weaver::Mmu;

pub struct Rig {
    pub mmu: Mmu<SimHal>,
}

impl Rig {
    pub fn new() -> Self {
        Self {
            mmu: Mmu::new(SimHal::new()),
        }
    }

    /// One hardware tick without the dispatcher, for tests that drive a
    /// command instance by hand the way the firmware's dispatcher would.
    pub fn step_hw(&mut self) {
        self.mmu.hal.tick(1);
        self.mmu.step_modules();
    }

    /// One full loop iteration, dispatcher included.
    pub fn step(&mut self) {
        self.mmu.hal.tick(1);
        self.mmu.step();
    }

    pub fn step_n(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    pub fn set_finda(&mut self, on: bool) {
        self.mmu.hal.set_finda(on);
    }

    /// Flip FINDA and run the hardware until the debouncer believes it.
    pub fn settle_finda(&mut self, on: bool) {
        self.set_finda(on);
        for _ in 0..(config::FINDA_DEBOUNCE_MS + 10) {
            self.step_hw();
        }
    }

    pub fn set_fsensor(&mut self, on: bool) {
        self.mmu.modules.fsensor.process_message(on);
    }

    /// Send a request line to the unit.
    pub fn send(&mut self, line: &str) {
        self.mmu.hal.push_line(line);
    }

    /// Everything the unit answered since the last call.
    pub fn output(&mut self) -> String {
        String::from_utf8(self.mmu.hal.take_tx().to_vec()).unwrap()
    }

    /// Home both movable units and park the selector at `slot`, making it
    /// the active one. The startup condition of most scenarios.
    pub fn ensure_active_slot(&mut self, slot: u8) {
        {
            let Mmu { hal, modules, .. } = &mut self.mmu;
            modules
                .idler
                .move_to_slot(&mut modules.motion, hal, config::SLOT_NONE);
        }
        assert!(
            self.run_hw_until(20_000, |rig| rig.mmu.modules.idler.ready()
                && rig.mmu.modules.idler.homing_valid()),
            "idler homing did not finish"
        );
        {
            let Mmu { hal, modules, .. } = &mut self.mmu;
            modules.selector.move_to_slot(&mut modules.motion, hal, slot);
        }
        assert!(
            self.run_hw_until(20_000, |rig| rig.mmu.modules.selector.ready()
                && rig.mmu.modules.selector.current_slot() == slot),
            "selector homing did not finish"
        );
        {
            let Mmu { hal, modules, .. } = &mut self.mmu;
            modules.globals.set_active_slot(hal, slot);
        }
    }

    pub fn run_hw_until(&mut self, max: u32, pred: impl Fn(&Rig) -> bool) -> bool {
        for _ in 0..max {
            if pred(self) {
                return true;
            }
            self.step_hw();
        }
        false
    }
}

/// Advance the command by one dispatcher-shaped tick.
pub fn cmd_step(rig: &mut Rig, cmd: &mut Command) -> bool {
    cmd.step(&mut rig.mmu.modules, &mut rig.mmu.hal)
}

/// Keep stepping while the command reports `progress`, up to `max` ticks.
/// True when the state moved on, false on timeout.
pub fn while_top_state(rig: &mut Rig, cmd: &mut Command, progress: ProgressCode, max: u32) -> bool {
    for _ in 0..max {
        if cmd.top_level_state() != progress {
            return true;
        }
        rig.step_hw();
        cmd_step(rig, cmd);
    }
    false
}

/// Keep stepping while `cond` holds; the closure sees the command and the
/// tick index so it can inject sensor changes partway through.
pub fn while_condition(
    rig: &mut Rig,
    cmd: &mut Command,
    mut cond: impl FnMut(&mut Rig, &Command, u32) -> bool,
    max: u32,
) -> bool {
    for i in 0..max {
        if !cond(rig, cmd, i) {
            return true;
        }
        rig.step_hw();
        cmd_step(rig, cmd);
    }
    false
}

/// Full snapshot check after every stage: filament flag, where the idler and
/// the selector sit, FINDA, both LEDs of `slot`, error, progress.
#[allow(clippy::too_many_arguments)]
pub fn verify_state(
    rig: &Rig,
    cmd: &Command,
    loaded: bool,
    idler_slot: u8,
    selector_slot: u8,
    finda: bool,
    green: LedMode,
    red: LedMode,
    error: ErrorCode,
    progress: ProgressCode,
    slot: u8,
) {
    let md = &rig.mmu.modules;
    assert_eq!(md.globals.filament_loaded(), loaded, "filament flag");
    assert_eq!(md.idler.current_slot(), idler_slot, "idler slot");
    assert_eq!(md.selector.current_slot(), selector_slot, "selector slot");
    assert_eq!(md.finda.pressed(), finda, "FINDA");
    assert_eq!(md.leds.mode(slot, Color::Green), green, "green LED");
    assert_eq!(md.leds.mode(slot, Color::Red), red, "red LED");
    assert_eq!(cmd.error(), error, "error code");
    assert_eq!(cmd.top_level_state(), progress, "progress code");
}

/// Hold a button down long enough for the debouncer, then let go.
pub fn press_and_release_button(rig: &mut Rig, cmd: &mut Command, index: u8) {
    rig.mmu.hal.press_button(index);
    for _ in 0..(config::BUTTON_DEBOUNCE_MS + 10) {
        rig.step_hw();
        cmd_step(rig, cmd);
    }
    rig.mmu.hal.release_buttons();
    for _ in 0..5 {
        rig.step_hw();
        cmd_step(rig, cmd);
    }
}
