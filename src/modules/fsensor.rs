//! The filament sensor inside the printer's extruder. The printer pushes
//! state updates over the host link; the unit only stores the latest one.

pub struct FilamentSensor {
    pressed: bool,
}

impl FilamentSensor {
    pub fn new() -> Self {
        Self { pressed: false }
    }

    /// Store a state update received from the printer.
    pub fn process_message(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub fn pressed(&self) -> bool {
        self.pressed
    }
}

impl Default for FilamentSensor {
    fn default() -> Self {
        Self::new()
    }
}
