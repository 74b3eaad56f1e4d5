//! Unit-wide state: the active slot, whether filament is loaded into the
//! printer, the motor silence mode and per-slot filament types. The persisted
//! subset is written through on every change.

use crate::config;
use crate::hal::Hal;
use crate::modules::storage;

pub struct Globals {
    active_slot: u8,
    filament_loaded: bool,
    motors_stealth: bool,
    filament_types: [u8; config::NUM_SLOTS as usize],
}

impl Globals {
    pub fn new() -> Self {
        Self {
            active_slot: config::SLOT_NONE,
            filament_loaded: false,
            motors_stealth: false,
            filament_types: [0; config::NUM_SLOTS as usize],
        }
    }

    /// Restore the persisted part from EEPROM at boot.
    pub fn init<H: Hal>(&mut self, hal: &mut H) {
        let cfg = storage::load(hal);
        self.active_slot = cfg.active_slot;
        self.motors_stealth = cfg.motors_stealth;
        self.filament_types = cfg.filament_types;
    }

    pub fn active_slot(&self) -> u8 {
        self.active_slot
    }

    pub fn set_active_slot<H: Hal>(&mut self, hal: &mut H, slot: u8) {
        if self.active_slot != slot {
            self.active_slot = slot;
            storage::store_active_slot(hal, slot);
        }
    }

    pub fn filament_loaded(&self) -> bool {
        self.filament_loaded
    }

    pub fn set_filament_loaded(&mut self, loaded: bool) {
        self.filament_loaded = loaded;
    }

    pub fn motors_stealth(&self) -> bool {
        self.motors_stealth
    }

    pub fn set_motors_stealth<H: Hal>(&mut self, hal: &mut H, stealth: bool) {
        if self.motors_stealth != stealth {
            self.motors_stealth = stealth;
            storage::store_motors_stealth(hal, stealth);
        }
    }

    pub fn filament_type(&self, slot: u8) -> u8 {
        self.filament_types[slot as usize]
    }

    pub fn set_filament_type<H: Hal>(&mut self, hal: &mut H, slot: u8, filament_type: u8) {
        if slot < config::NUM_SLOTS {
            self.filament_types[slot as usize] = filament_type;
            storage::store_filament_type(hal, slot, filament_type);
        }
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}
