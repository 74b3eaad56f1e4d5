//! The host serial protocol: ASCII, line oriented.
//!
//! Requests look like `T3\n` or `F1 2\n` (code letter, decimal parameter,
//! optional second parameter). Responses echo the request they answer
//! followed by a status letter and an optional decimal value, `T3 A\n`,
//! `Q0 P5\n`. Framing/CRC is the transport's business; the decoder here is
//! handed raw bytes and resynchronises on newlines after any garbage.

use core::fmt::Write;

use heapless::String;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Request codes as they appear on the wire.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RequestCode {
    Query = b'Q',
    ToolChange = b'T',
    Load = b'L',
    Unload = b'U',
    ContinueLoad = b'C',
    Eject = b'E',
    Reset = b'X',
    Finda = b'P',
    FilamentType = b'F',
    Version = b'S',
    Mode = b'M',
    Home = b'H',
    Cut = b'K',
    Button = b'B',
}

/// Response status letters.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug, IntoPrimitive)]
#[repr(u8)]
pub enum ResponseCode {
    Accepted = b'A',
    Rejected = b'R',
    Finished = b'F',
    Error = b'E',
    Processing = b'P',
    Button = b'B',
}

/// A parsed request. `value2` is only populated by the two-parameter form
/// (`F<slot> <type>`), zero otherwise.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RequestMsg {
    pub code: RequestCode,
    pub value: u8,
    pub value2: u16,
}

impl RequestMsg {
    pub fn new(code: RequestCode, value: u8) -> Self {
        Self {
            code,
            value,
            value2: 0,
        }
    }
}

/// A response ready for encoding. `value` is present for the statuses that
/// carry one (`A1`, `P5`, `E8`), absent for the bare ones (`A`, `R`, `F`).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ResponseMsg {
    pub request: RequestMsg,
    pub code: ResponseCode,
    pub value: Option<u16>,
}

impl ResponseMsg {
    pub fn new(request: RequestMsg, code: ResponseCode, value: Option<u16>) -> Self {
        Self {
            request,
            code,
            value,
        }
    }

    /// Render the wire form, newline included.
    pub fn encode(&self) -> String<24> {
        let mut out = String::new();
        // The buffer is sized for the worst case, the writes cannot fail.
        let _ = write!(
            out,
            "{}{} {}",
            u8::from(self.request.code) as char,
            self.request.value,
            u8::from(self.code) as char,
        );
        if let Some(v) = self.value {
            let _ = write!(out, "{}", v);
        }
        let _ = out.push('\n');
        out
    }
}

/// Ways a request line can be malformed.
#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown request code {0:#04x}")]
    UnknownCode(u8),
    #[error("request parameter out of range")]
    ValueOverflow,
    #[error("unexpected byte {0:#04x}")]
    UnexpectedByte(u8),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DecodeState {
    Code,
    Value,
    Value2,
    /// Discarding bytes until the next newline after an error.
    Skip,
}

/// Incremental request decoder. Feed it one byte at a time; a completed
/// request comes back on the byte that terminates it.
pub struct Decoder {
    state: DecodeState,
    code: Option<RequestCode>,
    value: u16,
    value2: u16,
    digits: u8,
}

impl Decoder {
    pub const fn new() -> Self {
        Self {
            state: DecodeState::Code,
            code: None,
            value: 0,
            value2: 0,
            digits: 0,
        }
    }

    fn fail(&mut self, err: DecodeError) -> Result<Option<RequestMsg>, DecodeError> {
        self.state = DecodeState::Skip;
        Err(err)
    }

    fn restart(&mut self) {
        self.state = DecodeState::Code;
        self.code = None;
        self.value = 0;
        self.value2 = 0;
        self.digits = 0;
    }

    pub fn push(&mut self, byte: u8) -> Result<Option<RequestMsg>, DecodeError> {
        match self.state {
            DecodeState::Code => match byte {
                // Tolerate blank lines between requests.
                b'\n' | b'\r' => Ok(None),
                b'A'..=b'Z' => match RequestCode::try_from(byte) {
                    Ok(code) => {
                        self.code = Some(code);
                        self.value = 0;
                        self.value2 = 0;
                        self.digits = 0;
                        self.state = DecodeState::Value;
                        Ok(None)
                    }
                    Err(_) => self.fail(DecodeError::UnknownCode(byte)),
                },
                other => self.fail(DecodeError::UnexpectedByte(other)),
            },
            DecodeState::Value => match byte {
                b'0'..=b'9' => {
                    self.value = self.value * 10 + (byte - b'0') as u16;
                    self.digits += 1;
                    if self.value > 255 || self.digits > 3 {
                        return self.fail(DecodeError::ValueOverflow);
                    }
                    Ok(None)
                }
                b' ' if self.digits > 0 => {
                    self.digits = 0;
                    self.state = DecodeState::Value2;
                    Ok(None)
                }
                b'\n' if self.digits > 0 => {
                    let msg = RequestMsg {
                        code: self.code.unwrap_or(RequestCode::Query),
                        value: self.value as u8,
                        value2: 0,
                    };
                    self.restart();
                    Ok(Some(msg))
                }
                b'\n' => {
                    // The line ended early; it also closed the bad frame.
                    self.restart();
                    Err(DecodeError::UnexpectedByte(b'\n'))
                }
                other => self.fail(DecodeError::UnexpectedByte(other)),
            },
            DecodeState::Value2 => match byte {
                b'0'..=b'9' => {
                    self.value2 = self.value2.wrapping_mul(10) + (byte - b'0') as u16;
                    self.digits += 1;
                    if self.digits > 5 {
                        return self.fail(DecodeError::ValueOverflow);
                    }
                    Ok(None)
                }
                b'\n' if self.digits > 0 => {
                    let msg = RequestMsg {
                        code: self.code.unwrap_or(RequestCode::Query),
                        value: self.value as u8,
                        value2: self.value2,
                    };
                    self.restart();
                    Ok(Some(msg))
                }
                b'\n' => {
                    self.restart();
                    Err(DecodeError::UnexpectedByte(b'\n'))
                }
                other => self.fail(DecodeError::UnexpectedByte(other)),
            },
            DecodeState::Skip => {
                if byte == b'\n' {
                    self.restart();
                }
                Ok(None)
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
