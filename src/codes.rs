//! Wire-visible progress and error enumerations.
//!
//! Both enums are broadcast verbatim as small integers in `P`/`E` responses,
//! so the discriminants are stable and must never be renumbered. Progress
//! codes are laid out so that every command's phase sequence is nondecreasing
//! on the wire; the ERR1 recovery sub-tree lives in its own band above the
//! normal phases.

use num_enum::IntoPrimitive;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive)]
#[repr(u8)]
pub enum ProgressCode {
    Ok = 0,
    EngagingIdler = 1,
    UnloadingToFinda = 2,
    UnloadingToPulley = 3,
    MovingSelector = 4,
    FeedingToFinda = 5,
    FeedingToBondtech = 6,
    DisengagingIdler = 7,
    PreparingBlade = 8,
    PerformingCut = 9,
    ReturningSelector = 10,
    ParkingSelector = 11,
    EjectingFilament = 12,
    FinishingMoves = 13,
    Homing = 14,

    // Error recovery sub-tree, entered when a sensor expectation failed and
    // the user has to intervene.
    Err1DisengagingIdler = 20,
    Err1WaitingForUser = 21,
    Err1EngagingIdler = 22,
    Err1HelpingFilament = 23,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive)]
#[repr(u8)]
pub enum ErrorCode {
    Ok = 0,

    // Sensor-expectation failures. Recoverable with user help.
    FindaDidntTrigger = 1,
    FindaDidntRelease = 2,
    FsensorDidntTrigger = 3,
    FsensorDidntRelease = 4,

    // Mechanism failures.
    HomingFailed = 5,
    StalledPulley = 6,

    // TMC driver failures. These latch the motion until a reset.
    TmcIoinMismatch = 7,
    TmcReset = 8,
    TmcUndervoltage = 9,
    TmcShortToGround = 10,
    TmcOverTemperature = 11,

    // Protocol failures. Reported by rejecting the request, never via `E`.
    InvalidCommand = 12,
    VersionMismatch = 13,
}
