//! The top-level dispatcher: owns the one running command and the protocol
//! decoder, routes requests, reports command results and gates manual
//! operation.
//!
//! Responses for a given request are emitted at most once: `A`/`R` when it is
//! planned, `P`/`E` answers to each `Q0` while it runs, and exactly one
//! spontaneous `F`/`E` when it completes.

use log::{debug, error, info, warn};

use crate::codes::{ErrorCode, ProgressCode};
use crate::config;
use crate::hal::Hal;
use crate::logic::{
    Command, ContinueLoad, CutFilament, EjectFilament, HomeAxes, LoadFilament, ToolChange,
    UnloadFilament,
};
use crate::modules::leds::{Color, LedMode};
use crate::modules::movable::Movable;
use crate::modules::Modules;
use crate::protocol::{Decoder, RequestCode, RequestMsg, ResponseCode, ResponseMsg};

pub struct IdleMode {
    decoder: Decoder,
    command: Command,
    /// The request that started the running command; the completion report
    /// echoes it.
    command_rq: RequestMsg,
    /// Latched once the command's terminal state has been reported.
    finish_reported: bool,
    last_command_processed_ms: u16,
    panicked: bool,
    panic_code: ErrorCode,
}

impl IdleMode {
    pub fn new() -> Self {
        Self {
            decoder: Decoder::new(),
            command: Command::NoCommand,
            // The startup command is the no-command; the first finish report
            // would correspond to the power-up reset.
            command_rq: RequestMsg::new(RequestCode::Reset, 0),
            finish_reported: true,
            last_command_processed_ms: 0,
            panicked: false,
            panic_code: ErrorCode::Ok,
        }
    }

    /// True while a planned command has not reached its terminal state.
    pub fn running(&self) -> bool {
        !self.finish_reported
    }

    /// Perform one step of the top level.
    pub fn step<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        self.check_msgs(md, hal);

        if self.panicked {
            // Motion is stopped and the command frozen until an X0 arrives.
            return;
        }

        if !self.finish_reported {
            let finished = self.command.step(md, hal);
            if let Some(button) = self.command.take_button_event() {
                self.respond(hal, self.command_rq, ResponseCode::Button, Some(button as u16));
            }
            if finished {
                let err = self.command.error();
                if err != ErrorCode::Ok {
                    info!("command finished with error {:?}", err);
                    self.respond(hal, self.command_rq, ResponseCode::Error, Some(u8::from(err) as u16));
                } else {
                    info!("command finished");
                    self.respond(hal, self.command_rq, ResponseCode::Finished, None);
                }
                self.finish_reported = true;
                self.last_command_processed_ms = hal.millis();
                // A press meant for the finished command must not leak into
                // manual operation later.
                md.buttons.clear_latches();
            }
        } else {
            self.check_manual_operation(md, hal);
        }
    }

    /// Stop everything and refuse further commands until a reset.
    pub fn panic<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, code: ErrorCode) {
        error!("panic: {:?}", code);
        md.motion.abort_all(hal);
        self.panicked = true;
        self.panic_code = code;
        let slot = md.globals.active_slot();
        if slot < config::NUM_SLOTS {
            md.leds.set_mode(slot, Color::Green, LedMode::Off);
            md.leds.set_mode(slot, Color::Red, LedMode::Blink0);
        } else {
            for s in 0..config::NUM_SLOTS {
                md.leds.set_mode(s, Color::Red, LedMode::Blink0);
            }
        }
    }

    /// Drain the UART and handle at most one complete request per tick.
    fn check_msgs<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        while let Some(byte) = hal.uart_read() {
            match self.decoder.push(byte) {
                Ok(Some(rq)) => {
                    self.process_request_msg(md, hal, rq);
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!("protocol decode error: {}", e),
            }
        }
    }

    fn respond<H: Hal>(
        &self,
        hal: &mut H,
        rq: RequestMsg,
        code: ResponseCode,
        value: Option<u16>,
    ) {
        let msg = ResponseMsg::new(rq, code, value);
        for b in msg.encode().as_bytes() {
            hal.uart_write(*b);
        }
    }

    fn process_request_msg<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, rq: RequestMsg) {
        match rq.code {
            RequestCode::Query => self.report_running_command(hal, rq),
            RequestCode::Finda => {
                self.respond(hal, rq, ResponseCode::Accepted, Some(md.finda.pressed() as u16));
            }
            RequestCode::Version => self.report_version(hal, rq),
            RequestCode::Button => {
                if rq.value < 3 {
                    md.buttons.inject(rq.value as usize);
                    self.respond(hal, rq, ResponseCode::Accepted, None);
                } else {
                    self.respond(hal, rq, ResponseCode::Rejected, None);
                }
            }
            RequestCode::Mode => {
                if rq.value <= 1 {
                    let stealth = rq.value == 1;
                    md.globals.set_motors_stealth(hal, stealth);
                    let mode = if stealth {
                        crate::hal::MotorMode::Stealth
                    } else {
                        crate::hal::MotorMode::Normal
                    };
                    md.motion.set_mode_all(hal, mode);
                    self.respond(hal, rq, ResponseCode::Accepted, None);
                } else {
                    self.respond(hal, rq, ResponseCode::Rejected, None);
                }
            }
            RequestCode::FilamentType => {
                if rq.value < config::NUM_SLOTS && rq.value2 <= 255 {
                    md.globals.set_filament_type(hal, rq.value, rq.value2 as u8);
                    self.respond(hal, rq, ResponseCode::Accepted, None);
                } else {
                    self.respond(hal, rq, ResponseCode::Rejected, None);
                }
            }
            _ => self.plan_command(md, hal, rq),
        }
    }

    /// Status of the running command for a `Q0`: an error while one is
    /// latched, progress while running, `F` otherwise.
    fn report_running_command<H: Hal>(&mut self, hal: &mut H, rq: RequestMsg) {
        if self.panicked {
            self.respond(
                hal,
                rq,
                ResponseCode::Error,
                Some(u8::from(self.panic_code) as u16),
            );
            return;
        }
        let err = self.command.error();
        if err != ErrorCode::Ok {
            self.respond(hal, rq, ResponseCode::Error, Some(u8::from(err) as u16));
        } else if !self.finish_reported {
            let progress: ProgressCode = self.command.top_level_state();
            self.respond(
                hal,
                rq,
                ResponseCode::Processing,
                Some(u8::from(progress) as u16),
            );
        } else {
            self.respond(hal, rq, ResponseCode::Finished, None);
        }
    }

    fn report_version<H: Hal>(&mut self, hal: &mut H, rq: RequestMsg) {
        let value = match rq.value {
            0 => config::VERSION_MAJOR,
            1 => config::VERSION_MINOR,
            2 => config::VERSION_REVISION,
            3 => config::VERSION_BUILD,
            _ => {
                self.respond(hal, rq, ResponseCode::Rejected, None);
                return;
            }
        };
        self.respond(hal, rq, ResponseCode::Accepted, Some(value));
    }

    /// Try to plan a command for a command-starting request.
    fn plan_command<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, rq: RequestMsg) {
        if rq.code == RequestCode::Reset {
            self.reset_unit(md, hal, rq);
            return;
        }
        if self.panicked || !self.finish_reported {
            debug!("rejecting {:?}, unit busy", rq.code);
            self.respond(hal, rq, ResponseCode::Rejected, None);
            return;
        }

        let accepted = match rq.code {
            RequestCode::ToolChange if rq.value < config::NUM_SLOTS => {
                let mut c = ToolChange::default();
                c.reset(md, hal, rq.value);
                Some(Command::ToolChange(c))
            }
            RequestCode::Load
                if rq.value < config::NUM_SLOTS && !md.globals.filament_loaded() =>
            {
                let mut c = LoadFilament::default();
                c.reset(md, hal, rq.value);
                Some(Command::Load(c))
            }
            RequestCode::Unload => {
                let mut c = UnloadFilament::default();
                c.reset(md, hal);
                Some(Command::Unload(c))
            }
            RequestCode::ContinueLoad if md.globals.active_slot() < config::NUM_SLOTS => {
                let mut c = ContinueLoad::default();
                c.reset(md, hal);
                Some(Command::ContinueLoad(c))
            }
            RequestCode::Cut if rq.value < config::NUM_SLOTS && !md.globals.filament_loaded() => {
                let mut c = CutFilament::default();
                c.reset(md, hal, rq.value);
                Some(Command::Cut(c))
            }
            RequestCode::Eject
                if rq.value < config::NUM_SLOTS && !md.globals.filament_loaded() =>
            {
                let mut c = EjectFilament::default();
                c.reset(md, hal, rq.value);
                Some(Command::Eject(c))
            }
            RequestCode::Home if rq.value < 2 => {
                let mut c = HomeAxes::default();
                c.reset(md, hal, rq.value);
                Some(Command::Home(c))
            }
            _ => None,
        };

        match accepted {
            Some(command) => {
                debug!("planned {:?}{}", rq.code, rq.value);
                self.command = command;
                self.command_rq = rq;
                self.finish_reported = false;
                self.respond(hal, rq, ResponseCode::Accepted, None);
            }
            None => self.respond(hal, rq, ResponseCode::Rejected, None),
        }
    }

    /// `X0`: abort motion, drop the running command, clear a panic.
    fn reset_unit<H: Hal>(&mut self, md: &mut Modules, hal: &mut H, rq: RequestMsg) {
        info!("unit reset");
        md.motion.abort_all(hal);
        self.panicked = false;
        self.panic_code = ErrorCode::Ok;
        md.leds.all_off();
        if md.globals.filament_loaded() {
            md.leds
                .set_mode(md.globals.active_slot(), Color::Green, LedMode::On);
        }
        self.command = Command::NoCommand;
        self.command_rq = rq;
        self.finish_reported = false;
        self.respond(hal, rq, ResponseCode::Accepted, None);
    }

    /// After 5 s of idle with no filament in the selector the buttons move
    /// the selector directly and cycle the idler, for servicing.
    fn check_manual_operation<H: Hal>(&mut self, md: &mut Modules, hal: &mut H) {
        if self.panicked || md.finda.pressed() {
            return;
        }
        let now = hal.millis();
        if now.wrapping_sub(self.last_command_processed_ms) < config::MANUAL_MODE_DELAY_MS {
            return;
        }

        if md.buttons.button_pressed(0) {
            md.buttons.consume(0);
            let current = md.selector.current_slot();
            if current > 0 {
                let target = if current > 4 { 4 } else { current - 1 };
                md.selector.move_to_slot(&mut md.motion, hal, target);
            }
        } else if md.buttons.button_pressed(2) {
            md.buttons.consume(2);
            let current = md.selector.current_slot();
            let target = if current >= config::NUM_SLOTS - 1 {
                config::NUM_SLOTS - 1
            } else {
                current + 1
            };
            md.selector.move_to_slot(&mut md.motion, hal, target);
        } else if md.buttons.button_pressed(1) {
            md.buttons.consume(1);
            let next = (md.idler.current_slot() + 1) % 6;
            md.idler.move_to_slot(&mut md.motion, hal, next);
        }
    }
}

impl Default for IdleMode {
    fn default() -> Self {
        Self::new()
    }
}
