//! Mechanical and protocol constants for the whole unit, in one place.
//!
//! Distances are in stepper microsteps, speeds in steps/second, times in
//! milliseconds of the 16-bit wrapping timebase.

/// Number of filament slots the selector can address.
pub const NUM_SLOTS: u8 = 5;

/// Sentinel slot index meaning "no active slot / parked".
pub const SLOT_NONE: u8 = 5;

// Reported by the S0..S3 queries. Major/minor/revision mirror the crate version.
pub const VERSION_MAJOR: u16 = 3;
pub const VERSION_MINOR: u16 = 0;
pub const VERSION_REVISION: u16 = 1;
pub const VERSION_BUILD: u16 = 372;

// ADC channel assignment. Three buttons share one channel through a resistor
// divider, FINDA sits on its own channel.
pub const ADC_CHANNEL_BUTTONS: u8 = 0;
pub const ADC_CHANNEL_FINDA: u8 = 1;

// Button decode windows on the raw 10-bit reading.
// Doesn't handle multiple pressed buttons at once.
pub const BUTTON_0_MAX: u16 = 10; // pressed shorts the divider to ground
pub const BUTTON_1_MIN: u16 = 320;
pub const BUTTON_1_MAX: u16 = 360;
pub const BUTTON_2_MIN: u16 = 500;
pub const BUTTON_2_MAX: u16 = 530;

/// A press (or release) must hold this long before the debouncer believes it.
pub const BUTTON_DEBOUNCE_MS: u16 = 20;

// FINDA hysteresis thresholds on the raw reading plus its own, slower,
// debounce window. Between the thresholds the last stable level is kept.
pub const FINDA_ON_MIN: u16 = 600;
pub const FINDA_OFF_MAX: u16 = 400;
pub const FINDA_DEBOUNCE_MS: u16 = 100;

/// Half-period of LED blinking. blink0 is lit in the first half, blink1 in
/// the second, so two groups can alternate.
pub const LED_BLINK_HALF_PERIOD_MS: u16 = 512;

/// The unit allows manual selector/idler operation this long after the last
/// command finished, provided no filament is in the selector.
pub const MANUAL_MODE_DELAY_MS: u16 = 5000;

// ---------------------------------------------------------------------------
// Pulley feed lengths and speeds.

/// Feed budget when the filament tip is known to be near the pulley (user just
/// inserted it). If FINDA does not trigger within this, something is wrong.
pub const FEED_TO_FINDA_LIMITED_STEPS: i32 = 1500;

/// Feed budget when pulling filament all the way through the PTFE tube.
pub const FEED_TO_FINDA_UNLIMITED_STEPS: i32 = 65535;

/// Retract after FINDA triggers, parking the tip back into the PTFE.
pub const FEED_RETRACT_STEPS: i32 = 600;

pub const FEED_FEEDRATE: u16 = 4000;

/// Push from FINDA into the printer's extruder gears. The filament sensor in
/// the extruder is expected to trigger well before this budget runs out.
pub const FEED_TO_BONDTECH_STEPS: i32 = 4500;
pub const BONDTECH_FEEDRATE: u16 = 4000;

/// Retract budget when unloading. FINDA is expected to release within this.
pub const UNLOAD_TO_FINDA_STEPS: i32 = 4500;
pub const UNLOAD_FEEDRATE: u16 = 5000;

/// Extra retract after FINDA releases, parking the filament at the pulley.
pub const UNLOAD_TO_PULLEY_STEPS: i32 = 1200;

/// Slow nudge planned while the user helps the filament along during error
/// recovery.
pub const RECOVERY_HELP_STEPS: i32 = 450;
pub const RECOVERY_HELP_FEEDRATE: u16 = 1000;

/// Push expelling the filament clear of the unit on eject.
pub const EJECT_STEPS: i32 = 2000;
pub const EJECT_FEEDRATE: u16 = 3000;

/// Sideways selector stroke driving the blade through the filament.
pub const CUT_STROKE_STEPS: i32 = 700;
pub const CUT_FEEDRATE: u16 = 1500;

// Default accelerations handed to the planner per axis. The trapezoid
// generation itself happens below the HAL boundary.
pub const PULLEY_ACCEL: u16 = 800;
pub const SELECTOR_ACCEL: u16 = 1000;
pub const IDLER_ACCEL: u16 = 500;

// ---------------------------------------------------------------------------
// Selector geometry. Positions are measured from the rear stop found by
// homing; index 5 is the parking/eject position past the last slot.

pub const SELECTOR_SLOT_POSITIONS: [i32; 6] = [375, 1075, 1775, 2475, 3175, 3675];
pub const SELECTOR_FEEDRATE: u16 = 2000;

/// Homing move budget, longer than the axis can physically travel.
pub const SELECTOR_HOME_STEPS: i32 = 4200;

// Accepted measured axis length. Outside this window something blocked the
// carriage and homing is reported as failed.
pub const SELECTOR_LENGTH_MIN: i32 = 3600;
pub const SELECTOR_LENGTH_MAX: i32 = 3900;

// ---------------------------------------------------------------------------
// Idler geometry. Index 5 is the disengaged (home) position.

pub const IDLER_SLOT_POSITIONS: [i32; 6] = [270, 490, 710, 930, 1150, 0];
pub const IDLER_FEEDRATE: u16 = 2600;
pub const IDLER_HOME_STEPS: i32 = 1600;
pub const IDLER_LENGTH_MIN: i32 = 1250;
pub const IDLER_LENGTH_MAX: i32 = 1400;

// ---------------------------------------------------------------------------
// EEPROM layout, bytes. Erased cells read 0xFF and fall back to defaults.

pub const EEPROM_ACTIVE_SLOT: u16 = 0;
pub const EEPROM_MOTORS_STEALTH: u16 = 1;
pub const EEPROM_FILAMENT_TYPE_BASE: u16 = 2; // 5 bytes, one per slot
