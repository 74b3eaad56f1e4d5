//! FINDA, the filament presence switch at the selector output, read through
//! its own ADC channel with hysteresis and a debounce window.

use crate::config;
use crate::hal::Hal;

pub struct Finda {
    pressed: bool,
    candidate: bool,
    candidate_since: u16,
}

impl Finda {
    pub fn new() -> Self {
        Self {
            pressed: false,
            candidate: false,
            candidate_since: 0,
        }
    }

    pub fn step<H: Hal>(&mut self, now: u16, hal: &mut H) {
        let raw = hal.read_adc(config::ADC_CHANNEL_FINDA);
        // Hysteresis: between the thresholds keep whatever we saw last.
        let level = if raw >= config::FINDA_ON_MIN {
            true
        } else if raw <= config::FINDA_OFF_MAX {
            false
        } else {
            self.candidate
        };

        if level == self.pressed {
            self.candidate = level;
        } else if level != self.candidate {
            self.candidate = level;
            self.candidate_since = now;
        } else if now.wrapping_sub(self.candidate_since) >= config::FINDA_DEBOUNCE_MS {
            self.pressed = level;
        }
    }

    /// Debounced filament presence.
    pub fn pressed(&self) -> bool {
        self.pressed
    }
}

impl Default for Finda {
    fn default() -> Self {
        Self::new()
    }
}
