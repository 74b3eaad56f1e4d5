//! End-to-end runs of the cut and eject commands.

mod common;

use common::*;
use weaver::codes::{ErrorCode, ProgressCode};
use weaver::config;
use weaver::logic::{Command, CutFilament, EjectFilament};
use weaver::modules::movable::Movable;

#[test]
fn cut_feeds_pins_and_rehomes_selector() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(0);

    let mut cmd = Command::Cut(CutFilament::default());
    if let Command::Cut(c) = &mut cmd {
        c.reset(&mut rig.mmu.modules, &mut rig.mmu.hal, 0);
    }

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::EngagingIdler,
        5000
    ));
    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::MovingSelector,
        5000
    ));
    assert_eq!(cmd.top_level_state(), ProgressCode::FeedingToFinda);

    // The tip feeds out a short way; FINDA confirms it moved.
    assert!(while_condition(
        &mut rig,
        &mut cmd,
        |rig, cmd, step| {
            if step == 100 {
                rig.set_finda(true);
            }
            cmd.top_level_state() == ProgressCode::FeedingToFinda
        },
        10_000
    ));
    // The retract parks the tip below FINDA again.
    rig.set_finda(false);

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::PreparingBlade,
        10_000
    ));
    assert_eq!(cmd.top_level_state(), ProgressCode::PerformingCut);
    assert_eq!(rig.mmu.modules.selector.current_slot(), 1);

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::PerformingCut,
        10_000
    ));
    assert_eq!(cmd.top_level_state(), ProgressCode::ReturningSelector);

    // The stroke cost the selector its reference, the way back re-homes.
    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::ReturningSelector,
        20_000
    ));
    assert!(cmd_step(&mut rig, &mut cmd));
    assert_eq!(cmd.error(), ErrorCode::Ok);
    let md = &rig.mmu.modules;
    assert_eq!(md.selector.current_slot(), 0);
    assert!(md.selector.homing_valid());
    assert_eq!(md.idler.current_slot(), config::SLOT_NONE);
}

#[test]
fn cut_without_filament_tip_fails() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(2);

    let mut cmd = Command::Cut(CutFilament::default());
    if let Command::Cut(c) = &mut cmd {
        c.reset(&mut rig.mmu.modules, &mut rig.mmu.hal, 2);
    }

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::EngagingIdler,
        5000
    ));
    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::MovingSelector,
        5000
    ));
    // FINDA never reports during the short feed: nothing to cut.
    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::FeedingToFinda,
        10_000
    ));
    assert!(cmd_step(&mut rig, &mut cmd));
    assert_eq!(cmd.error(), ErrorCode::FindaDidntTrigger);
}

#[test]
fn eject_pushes_filament_clear() {
    let mut rig = Rig::new();
    rig.ensure_active_slot(1);

    let mut cmd = Command::Eject(EjectFilament::default());
    if let Command::Eject(c) = &mut cmd {
        c.reset(&mut rig.mmu.modules, &mut rig.mmu.hal, 1);
    }
    assert_eq!(cmd.top_level_state(), ProgressCode::ParkingSelector);

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::ParkingSelector,
        10_000
    ));
    assert_eq!(cmd.top_level_state(), ProgressCode::EjectingFilament);
    assert_eq!(rig.mmu.modules.selector.current_slot(), config::SLOT_NONE);

    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::EjectingFilament,
        10_000
    ));
    assert!(while_top_state(
        &mut rig,
        &mut cmd,
        ProgressCode::FinishingMoves,
        5000
    ));
    assert!(cmd_step(&mut rig, &mut cmd));
    assert_eq!(cmd.error(), ErrorCode::Ok);

    let md = &rig.mmu.modules;
    assert!(!md.globals.filament_loaded());
    assert_eq!(md.globals.active_slot(), config::SLOT_NONE);
    assert_eq!(md.idler.current_slot(), config::SLOT_NONE);
}
