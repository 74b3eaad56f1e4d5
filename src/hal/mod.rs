//! The hardware capability boundary.
//!
//! The core never touches registers. Everything below this trait - the ADC
//! mux, the UART FIFOs, the stepper pulse generation running off the timer
//! interrupt, the TMC driver SPI link and the EEPROM - is supplied by the
//! platform embedding the core. [`sim::SimHal`] is the deterministic
//! implementation used by host builds and the test suite.

use bitflags::bitflags;

use crate::codes::ErrorCode;

pub mod sim;

/// The three driven axes.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    Pulley = 0,
    Selector = 1,
    Idler = 2,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Pulley, Axis::Selector, Axis::Idler];
}

/// Driver chopper configuration. Stealth trades torque for silence.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MotorMode {
    Normal,
    Stealth,
}

/// One planned trapezoidal move: relative distance, cruise feedrate and the
/// acceleration the pulse generator should use for the ramps.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Move {
    pub steps: i32,
    pub feedrate: u16,
    pub accel: u16,
}

bitflags! {
    /// TMC driver status bits as sampled from the driver's status register.
    /// An empty set means the driver is healthy.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct DriverFlags: u8 {
        const RESET            = 1 << 0;
        const UNDERVOLTAGE     = 1 << 1;
        const SHORT_TO_GROUND  = 1 << 2;
        const OVER_TEMPERATURE = 1 << 3;
        const IOIN_MISMATCH    = 1 << 4;
    }
}

impl DriverFlags {
    /// No error bits set.
    pub fn good(self) -> bool {
        self.is_empty()
    }

    /// Map the highest-priority set bit onto the wire error taxonomy.
    pub fn as_error(self) -> ErrorCode {
        if self.contains(DriverFlags::SHORT_TO_GROUND) {
            ErrorCode::TmcShortToGround
        } else if self.contains(DriverFlags::OVER_TEMPERATURE) {
            ErrorCode::TmcOverTemperature
        } else if self.contains(DriverFlags::UNDERVOLTAGE) {
            ErrorCode::TmcUndervoltage
        } else if self.contains(DriverFlags::RESET) {
            ErrorCode::TmcReset
        } else if self.contains(DriverFlags::IOIN_MISMATCH) {
            ErrorCode::TmcIoinMismatch
        } else {
            ErrorCode::Ok
        }
    }
}

/// The full capability set the core requires from the platform.
///
/// Stepper queues are executed below this boundary by the interrupt-driven
/// pulse generator; the core only plans, aborts and observes them. Position
/// counters are maintained by the pulse generator and may be rebased by the
/// core after homing.
pub trait Hal {
    /// Raw 10-bit reading of the given ADC channel, sampled on demand.
    fn read_adc(&mut self, channel: u8) -> u16;

    /// Monotonic millisecond counter. 16 bits, wraps roughly every 65 s; all
    /// comparisons against it must use wrapping arithmetic.
    fn millis(&self) -> u16;

    /// Pop one received byte from the host link, if any.
    fn uart_read(&mut self) -> Option<u8>;

    /// Push one byte towards the host.
    fn uart_write(&mut self, byte: u8);

    /// Power up the axis driver and verify communication with it.
    fn stepper_init(&mut self, axis: Axis) -> bool;

    fn stepper_set_mode(&mut self, axis: Axis, mode: MotorMode);

    /// Append a move to the axis FIFO. Returns false when the FIFO is full.
    fn stepper_enqueue(&mut self, axis: Axis, mv: Move) -> bool;

    /// Flush planned moves. With `keep_current` the move currently being
    /// executed is allowed to finish; otherwise it stops too.
    fn stepper_abort(&mut self, axis: Axis, keep_current: bool);

    /// True when the FIFO is empty and no move is being executed.
    fn stepper_queue_empty(&self, axis: Axis) -> bool;

    /// Current step counter of the axis.
    fn stepper_position(&self, axis: Axis) -> i32;

    /// Rebase the axis step counter, typically to zero after homing.
    fn stepper_set_position(&mut self, axis: Axis, position: i32);

    /// Latched StallGuard event on the axis.
    fn stall_guard(&self, axis: Axis) -> bool;

    fn stall_guard_reset(&mut self, axis: Axis);

    /// Snapshot of the axis driver's status register.
    fn driver_flags(&self, axis: Axis) -> DriverFlags;

    fn eeprom_read(&mut self, addr: u16) -> u8;

    /// Write one byte of permanent storage. Writes are serialised by the
    /// platform and treated as blocking.
    fn eeprom_write(&mut self, addr: u16, value: u8);
}
