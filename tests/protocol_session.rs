//! Whole-unit sessions over the serial link: queries, command planning and
//! rejection, the spontaneous completion report, reset, panic and the manual
//! operation gate.

mod common;

use common::*;
use weaver::codes::ErrorCode;
use weaver::config;
use weaver::hal::{Axis, MotorMode};
use weaver::modules::movable::Movable;

#[test]
fn query_at_boot_reports_finished() {
    let mut rig = Rig::new();
    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 F\n");
}

#[test]
fn version_and_finda_queries() {
    let mut rig = Rig::new();
    rig.send("S0\n");
    rig.send("S1\n");
    rig.send("S2\n");
    rig.send("S3\n");
    rig.step_n(4);
    assert_eq!(rig.output(), "S0 A3\nS1 A0\nS2 A1\nS3 A372\n");

    rig.send("P0\n");
    rig.step();
    assert_eq!(rig.output(), "P0 A0\n");

    rig.settle_finda(true);
    rig.send("P0\n");
    rig.step();
    assert_eq!(rig.output(), "P0 A1\n");

    rig.send("S9\n");
    rig.step();
    assert_eq!(rig.output(), "S9 R\n");
}

#[test]
fn load_session_reports_progress_and_finish() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(2);
    rig.output(); // discard nothing in particular, the buffer is clean anyway

    rig.send("L2\n");
    rig.step();
    assert_eq!(rig.output(), "L2 A\n");

    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 P1\n"); // engaging the idler

    rig.step_n(500);
    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 P5\n"); // feeding to FINDA

    rig.set_finda(true);
    // The feed sub-machine parks the tip and releases the idler before the
    // command grips the filament again for the extruder push.
    rig.step_n(800);
    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 P6\n"); // feeding to the extruder

    rig.set_fsensor(true);
    rig.step_n(600);
    let out = rig.output();
    assert!(
        out.contains("L2 F\n"),
        "completion must be reported spontaneously, got {out:?}"
    );

    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 F\n");
    assert!(rig.mmu.modules.globals.filament_loaded());
    assert_eq!(rig.mmu.modules.globals.active_slot(), 2);
}

#[test]
fn second_command_while_busy_is_rejected() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(1);

    rig.send("T1\n");
    rig.step();
    assert_eq!(rig.output(), "T1 A\n");

    rig.send("T3\n");
    rig.step();
    assert_eq!(rig.output(), "T3 R\n");

    // X0 cancels the stuck command and reports its own completion; the reset
    // pseudo-command finishes within the very same tick.
    rig.send("X0\n");
    rig.step();
    assert_eq!(rig.output(), "X0 A\nX0 F\n");

    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 F\n");
}

#[test]
fn invalid_parameters_are_rejected() {
    let mut rig = Rig::new();
    for line in ["T7\n", "L5\n", "K9\n", "E5\n", "H2\n", "B7\n", "M3\n", "F9 1\n"] {
        rig.send(line);
        rig.step();
        let out = rig.output();
        assert!(out.ends_with("R\n"), "{line:?} must be rejected, got {out:?}");
    }
}

#[test]
fn motor_mode_and_filament_type_requests() {
    let mut rig = Rig::new();

    rig.send("M1\n");
    rig.step();
    assert_eq!(rig.output(), "M1 A\n");
    assert!(rig.mmu.modules.globals.motors_stealth());
    assert_eq!(rig.mmu.hal.axis(Axis::Pulley).mode, MotorMode::Stealth);

    rig.send("M0\n");
    rig.step();
    assert_eq!(rig.output(), "M0 A\n");
    assert_eq!(rig.mmu.hal.axis(Axis::Idler).mode, MotorMode::Normal);

    rig.send("F2 7\n");
    rig.step();
    assert_eq!(rig.output(), "F2 A\n");
    assert_eq!(rig.mmu.modules.globals.filament_type(2), 7);
    // Persisted immediately.
    assert_eq!(
        rig.mmu.hal.eeprom[(config::EEPROM_FILAMENT_TYPE_BASE + 2) as usize],
        7
    );
}

#[test]
fn synthetic_button_press_is_injected() {
    let mut rig = Rig::new();
    rig.send("B1\n");
    rig.step();
    assert_eq!(rig.output(), "B1 A\n");
    assert!(rig.mmu.modules.buttons.button_pressed(1));
}

#[test]
fn home_command_rehomes_idler() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(0);
    rig.output();

    rig.send("H1\n");
    rig.step();
    assert_eq!(rig.output(), "H1 A\n");

    rig.step_n(12_000);
    let out = rig.output();
    assert!(out.contains("H1 F\n"), "homing must finish, got {out:?}");
    assert!(rig.mmu.modules.idler.homing_valid());
}

#[test]
fn panic_locks_the_unit_until_reset() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(3);
    rig.mmu.panic(ErrorCode::TmcShortToGround);

    rig.send("T1\n");
    rig.step();
    assert_eq!(rig.output(), "T1 R\n");

    rig.send("Q0\n");
    rig.step();
    assert_eq!(rig.output(), "Q0 E10\n");

    rig.send("X0\n");
    rig.step();
    assert_eq!(rig.output(), "X0 A\nX0 F\n");

    rig.send("T1\n");
    rig.step();
    assert_eq!(rig.output(), "T1 A\n");
}

#[test]
fn manual_mode_moves_selector_after_idle_window() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(2);
    // Homing took well over the 5 s idle threshold of the boot "command",
    // FINDA is off: manual operation is allowed.
    assert!(!rig.mmu.modules.finda.pressed());

    rig.mmu.hal.press_button(2);
    rig.step_n((config::BUTTON_DEBOUNCE_MS + 10) as u32);
    rig.mmu.hal.release_buttons();
    rig.step_n(1500);
    assert_eq!(rig.mmu.modules.selector.current_slot(), 3);

    rig.mmu.hal.press_button(0);
    rig.step_n((config::BUTTON_DEBOUNCE_MS + 10) as u32);
    rig.mmu.hal.release_buttons();
    rig.step_n(1500);
    assert_eq!(rig.mmu.modules.selector.current_slot(), 2);

    // The middle button cycles the idler.
    let before = rig.mmu.modules.idler.current_slot();
    rig.mmu.hal.press_button(1);
    rig.step_n((config::BUTTON_DEBOUNCE_MS + 10) as u32);
    rig.mmu.hal.release_buttons();
    rig.step_n(1500);
    assert_eq!(
        rig.mmu.modules.idler.current_slot(),
        (before + 1) % 6
    );
}

#[test]
fn buttons_are_ignored_while_a_command_runs() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(2);

    rig.send("T4\n");
    rig.step();
    assert_eq!(rig.output(), "T4 A\n");

    // A press during the command must not trigger a manual selector move,
    // neither now nor after the command is gone.
    rig.mmu.hal.press_button(0);
    rig.step_n((config::BUTTON_DEBOUNCE_MS + 10) as u32);
    rig.mmu.hal.release_buttons();
    rig.step_n(100);

    rig.send("X0\n");
    rig.step_n(3);
    rig.output();

    rig.step_n(6000);
    assert_eq!(rig.mmu.modules.selector.current_slot(), 4);
}
