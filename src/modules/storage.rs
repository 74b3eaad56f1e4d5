//! Permanent storage layout and access. One byte per item, written on change
//! and read once at boot. Erased EEPROM reads 0xFF, which maps to defaults.

use crate::config;
use crate::hal::Hal;

/// The persisted configuration block, decoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Persistent {
    pub active_slot: u8,
    pub motors_stealth: bool,
    pub filament_types: [u8; config::NUM_SLOTS as usize],
}

pub fn load<H: Hal>(hal: &mut H) -> Persistent {
    let slot = hal.eeprom_read(config::EEPROM_ACTIVE_SLOT);
    let stealth = hal.eeprom_read(config::EEPROM_MOTORS_STEALTH);
    let mut types = [0u8; config::NUM_SLOTS as usize];
    for (i, t) in types.iter_mut().enumerate() {
        let v = hal.eeprom_read(config::EEPROM_FILAMENT_TYPE_BASE + i as u16);
        *t = if v == 0xFF { 0 } else { v };
    }
    Persistent {
        active_slot: if slot > config::SLOT_NONE {
            config::SLOT_NONE
        } else {
            slot
        },
        motors_stealth: stealth == 1,
        filament_types: types,
    }
}

pub fn store_active_slot<H: Hal>(hal: &mut H, slot: u8) {
    hal.eeprom_write(config::EEPROM_ACTIVE_SLOT, slot);
}

pub fn store_motors_stealth<H: Hal>(hal: &mut H, stealth: bool) {
    hal.eeprom_write(config::EEPROM_MOTORS_STEALTH, stealth as u8);
}

pub fn store_filament_type<H: Hal>(hal: &mut H, slot: u8, filament_type: u8) {
    if slot < config::NUM_SLOTS {
        hal.eeprom_write(
            config::EEPROM_FILAMENT_TYPE_BASE + slot as u16,
            filament_type,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::SimHal;

    #[test]
    fn erased_eeprom_maps_to_defaults() {
        let mut hal = SimHal::new();
        let cfg = load(&mut hal);
        assert_eq!(cfg.active_slot, config::SLOT_NONE);
        assert!(!cfg.motors_stealth);
        assert_eq!(cfg.filament_types, [0; 5]);
    }

    #[test]
    fn round_trips_through_eeprom() {
        let mut hal = SimHal::new();
        store_active_slot(&mut hal, 3);
        store_motors_stealth(&mut hal, true);
        store_filament_type(&mut hal, 2, 7);

        let cfg = load(&mut hal);
        assert_eq!(cfg.active_slot, 3);
        assert!(cfg.motors_stealth);
        assert_eq!(cfg.filament_types[2], 7);
        assert_eq!(cfg.filament_types[0], 0);
    }
}
