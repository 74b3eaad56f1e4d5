//! Three buttons multiplexed onto one ADC channel by a resistor divider,
//! debounced with a small per-button state machine.
//!
//! A press is latched once the level has been stable for the debounce window
//! and stays latched until someone consumes it, so a command polling for user
//! input a few ticks later does not miss a short press. Simultaneous presses
//! cannot be decoded from the divider and are not supported.

use crate::config;
use crate::hal::Hal;

pub const BUTTON_COUNT: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DebounceState {
    Waiting,
    Detected,
    WaitForRelease,
    Update,
}

#[derive(Clone, Copy)]
struct Button {
    state: DebounceState,
    time_last_change: u16,
    pressed: bool,
}

impl Button {
    const fn new() -> Self {
        Self {
            state: DebounceState::Waiting,
            time_last_change: 0,
            pressed: false,
        }
    }

    fn step(&mut self, now: u16, press: bool) {
        match self.state {
            DebounceState::Waiting => {
                if press {
                    self.state = DebounceState::Detected;
                    self.time_last_change = now;
                }
            }
            DebounceState::Detected => {
                if !press {
                    self.state = DebounceState::Waiting;
                } else if now.wrapping_sub(self.time_last_change) > config::BUTTON_DEBOUNCE_MS {
                    self.pressed = true;
                    self.state = DebounceState::WaitForRelease;
                }
            }
            DebounceState::WaitForRelease => {
                if !press {
                    self.state = DebounceState::Update;
                }
            }
            DebounceState::Update => {
                self.state = DebounceState::Waiting;
                self.time_last_change = now;
            }
        }
    }
}

pub struct Buttons {
    buttons: [Button; BUTTON_COUNT],
}

impl Buttons {
    pub fn new() -> Self {
        Self {
            buttons: [Button::new(); BUTTON_COUNT],
        }
    }

    /// Decode the divider reading into a button index.
    fn sample(raw: u16) -> Option<usize> {
        if raw < config::BUTTON_0_MAX {
            Some(0)
        } else if raw > config::BUTTON_1_MIN && raw < config::BUTTON_1_MAX {
            Some(1)
        } else if raw > config::BUTTON_2_MIN && raw < config::BUTTON_2_MAX {
            Some(2)
        } else {
            None
        }
    }

    pub fn step<H: Hal>(&mut self, now: u16, hal: &mut H) {
        let raw = hal.read_adc(config::ADC_CHANNEL_BUTTONS);
        let current = Self::sample(raw);
        for (i, button) in self.buttons.iter_mut().enumerate() {
            button.step(now, current == Some(i));
        }
    }

    pub fn button_pressed(&self, index: usize) -> bool {
        self.buttons[index].pressed
    }

    pub fn any_button_pressed(&self) -> bool {
        self.buttons.iter().any(|b| b.pressed)
    }

    /// Clear one latched press.
    pub fn consume(&mut self, index: usize) {
        self.buttons[index].pressed = false;
    }

    /// Take the lowest-numbered latched press, if any.
    pub fn consume_any(&mut self) -> Option<u8> {
        for (i, button) in self.buttons.iter_mut().enumerate() {
            if button.pressed {
                button.pressed = false;
                return Some(i as u8);
            }
        }
        None
    }

    /// Drop all latched presses, e.g. when the command they were meant for
    /// has finished.
    pub fn clear_latches(&mut self) {
        for button in &mut self.buttons {
            button.pressed = false;
        }
    }

    /// Synthetic press injected by the host (`B<n>`), bypassing the debouncer.
    pub fn inject(&mut self, index: usize) {
        self.buttons[index].pressed = true;
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimHal;

    fn run(buttons: &mut Buttons, hal: &mut SimHal, ticks: u16) {
        for _ in 0..ticks {
            hal.tick(1);
            buttons.step(hal.millis(), hal);
        }
    }

    #[test]
    fn stable_press_latches_after_debounce() {
        let mut hal = SimHal::new();
        let mut buttons = Buttons::new();

        hal.press_button(1);
        run(&mut buttons, &mut hal, config::BUTTON_DEBOUNCE_MS);
        assert!(!buttons.button_pressed(1), "too early to report");
        run(&mut buttons, &mut hal, 5);
        assert!(buttons.button_pressed(1));
        assert!(!buttons.button_pressed(0));
        assert!(!buttons.button_pressed(2));
    }

    #[test]
    fn bounce_does_not_latch() {
        let mut hal = SimHal::new();
        let mut buttons = Buttons::new();

        // Chatter shorter than the debounce window, repeatedly.
        for _ in 0..10 {
            hal.press_button(0);
            run(&mut buttons, &mut hal, 5);
            hal.release_buttons();
            run(&mut buttons, &mut hal, 5);
        }
        assert!(!buttons.any_button_pressed());
    }

    #[test]
    fn latch_survives_release_until_consumed() {
        let mut hal = SimHal::new();
        let mut buttons = Buttons::new();

        hal.press_button(2);
        run(&mut buttons, &mut hal, config::BUTTON_DEBOUNCE_MS + 5);
        hal.release_buttons();
        run(&mut buttons, &mut hal, 50);
        assert!(buttons.button_pressed(2));
        assert_eq!(buttons.consume_any(), Some(2));
        assert!(!buttons.any_button_pressed());
    }

    #[test]
    fn out_of_window_reading_decodes_as_no_button() {
        assert_eq!(Buttons::sample(0), Some(0));
        assert_eq!(Buttons::sample(340), Some(1));
        assert_eq!(Buttons::sample(515), Some(2));
        assert_eq!(Buttons::sample(200), None);
        assert_eq!(Buttons::sample(1023), None);
    }
}
