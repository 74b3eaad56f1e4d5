//! Top-level command: cut the filament tip of a slot.
//!
//! The tip is fed out a short way past the blade, the selector shifts one
//! position over to pin the filament, then drives the blade across. The
//! stroke loses the carriage reference, so the selector re-homes on its way
//! back.

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::{Axis, Hal};
use crate::logic::feed_to_finda::{FeedState, FeedToFinda};
use crate::logic::movable_fault;
use crate::modules::leds::{Color, LedMode};
use crate::modules::movable::Movable;
use crate::modules::Modules;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    EngagingIdler,
    MovingSelector,
    Feeding,
    PreparingBlade,
    PerformingCut,
    ReturningSelector,
    Ok,
    Failed,
}

pub struct CutFilament {
    state: State,
    error: ErrorCode,
    target: u8,
    feed: FeedToFinda,
}

impl Default for CutFilament {
    fn default() -> Self {
        Self {
            state: State::Ok,
            error: ErrorCode::Ok,
            target: config::SLOT_NONE,
            feed: FeedToFinda::default(),
        }
    }
}

impl CutFilament {
    pub fn reset<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, slot: u8) {
        self.error = ErrorCode::Ok;
        self.target = slot;
        md.globals.set_active_slot(hal, slot);
        md.idler.engage(&mut md.motion, hal, slot);
        md.leds.set_mode(slot, Color::Green, LedMode::Blink0);
        md.leds.set_mode(slot, Color::Red, LedMode::Off);
        self.state = State::EngagingIdler;
    }

    fn fail(&mut self, md: &mut Modules, error: ErrorCode) {
        self.error = error;
        md.leds.set_mode(self.target, Color::Green, LedMode::Off);
        md.leds.set_mode(self.target, Color::Red, LedMode::Blink0);
        self.state = State::Failed;
    }

    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) -> bool {
        match self.state {
            State::EngagingIdler => {
                if let Some(e) = movable_fault(&md.idler) {
                    self.fail(md, e);
                } else if md.idler.engaged() {
                    md.selector.move_to_slot(&mut md.motion, hal, self.target);
                    self.state = State::MovingSelector;
                }
                false
            }
            State::MovingSelector => {
                if let Some(e) = movable_fault(&md.selector) {
                    self.fail(md, e);
                } else if md.selector.ready() && md.selector.current_slot() == self.target {
                    self.feed.reset(md, hal, true);
                    self.state = State::Feeding;
                }
                false
            }
            State::Feeding => {
                if self.feed.step(md, hal) {
                    match self.feed.state() {
                        FeedState::Ok => {
                            // Pin the filament again and bring the blade edge
                            // next to it.
                            md.idler.engage(&mut md.motion, hal, self.target);
                            md.selector
                                .move_to_slot(&mut md.motion, hal, self.target + 1);
                            self.state = State::PreparingBlade;
                        }
                        _ => self.fail(md, ErrorCode::FindaDidntTrigger),
                    }
                }
                false
            }
            State::PreparingBlade => {
                if let Some(e) = movable_fault(&md.selector) {
                    self.fail(md, e);
                } else if md.idler.engaged()
                    && md.selector.ready()
                    && md.selector.current_slot() == self.target + 1
                {
                    md.selector.plan_cut_stroke(&mut md.motion, hal);
                    self.state = State::PerformingCut;
                }
                false
            }
            State::PerformingCut => {
                if md.motion.queue_empty(hal, Axis::Selector) {
                    md.idler.disengage(&mut md.motion, hal);
                    // The stroke invalidated the reference; this re-homes.
                    md.selector.move_to_slot(&mut md.motion, hal, self.target);
                    self.state = State::ReturningSelector;
                }
                false
            }
            State::ReturningSelector => {
                if let Some(e) = movable_fault(&md.selector) {
                    self.fail(md, e);
                } else if md.selector.ready()
                    && md.selector.current_slot() == self.target
                    && !md.idler.engaged()
                {
                    md.leds.set_mode(self.target, Color::Green, LedMode::Off);
                    self.state = State::Ok;
                }
                false
            }
            State::Ok | State::Failed => true,
        }
    }

    pub fn top_level_state(&self) -> ProgressCode {
        match self.state {
            State::EngagingIdler => ProgressCode::EngagingIdler,
            State::MovingSelector => ProgressCode::MovingSelector,
            State::Feeding => ProgressCode::FeedingToFinda,
            State::PreparingBlade => ProgressCode::PreparingBlade,
            State::PerformingCut => ProgressCode::PerformingCut,
            State::ReturningSelector => ProgressCode::ReturningSelector,
            State::Ok | State::Failed => ProgressCode::Ok,
        }
    }

    pub fn error(&self) -> ErrorCode {
        self.error
    }
}
