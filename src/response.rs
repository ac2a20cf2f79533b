//! Received response frames and their decoding.
//!
//! A response is `%NN` + marker byte + ... + `**` + CR. The marker is `$` for
//! a normal reply and `!` when the device rejected the command, in which
//! case two digits of error code follow it.

use core::fmt;

use snafu::{ensure, OptionExt, Snafu};

use crate::command::{
    BufferingMode, BufferingOperation, BufferingStatus, Command, FieldKind, FieldLayout, SamplingCycle,
    ShutterTime, TRAILER_LEN,
};
use crate::nom_parser;

/// Offset of the `$`/`!` marker byte.
pub const MARKER_OFFSET: usize = 3;
/// Marker byte of an error response.
pub const ERROR_MARKER: u8 = b'!';
const ERROR_CODE: core::ops::Range<usize> = 4..6;
const ECHO: core::ops::Range<usize> = 4..7;

/// Failure to interpret the bytes of a response.
#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum DecodeError {
    /// The response ends before the field it should contain.
    #[snafu(display("Response of {} bytes is too short, need {}", len, need))]
    TooShort { len: usize, need: usize },
    /// The field window doesn't hold what its layout says it should.
    #[snafu(display("Malformed field at offset {}: {:?}", offset, text))]
    InvalidField { offset: usize, text: String },
    /// An enumerated field holds a code with no known meaning.
    #[snafu(display("Unexpected code {:?}", code))]
    UnexpectedCode { code: char },
    /// A field was decoded as a type its layout doesn't provide.
    #[snafu(display("Field of kind {:?} read as {}", kind, wanted))]
    WrongKind { kind: FieldKind, wanted: &'static str },
}

/// Error codes reported by the device after the `!` marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// 01
    Command,
    /// 02
    Address,
    /// 03
    Data,
    /// 04, block check character mismatch.
    Bcc,
    /// 11
    Communication,
    /// 21
    ControlFlow,
    /// 22
    Execution,
    /// 31
    BufferingCondition1,
    /// 32
    BufferingCondition2,
    /// 33
    BufferingCondition3,
    /// Any other pair of bytes.
    Unknown([u8; 2]),
}

impl ErrorCode {
    pub fn from_bytes(code: [u8; 2]) -> Self {
        match &code {
            b"01" => Self::Command,
            b"02" => Self::Address,
            b"03" => Self::Data,
            b"04" => Self::Bcc,
            b"11" => Self::Communication,
            b"21" => Self::ControlFlow,
            b"22" => Self::Execution,
            b"31" => Self::BufferingCondition1,
            b"32" => Self::BufferingCondition2,
            b"33" => Self::BufferingCondition3,
            _ => Self::Unknown(code),
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Command => "Command error",
            Self::Address => "Address error",
            Self::Data => "Data error",
            Self::Bcc => "BCC error",
            Self::Communication => "Communication error",
            Self::ControlFlow => "Control flow error",
            Self::Execution => "Execution error",
            Self::BufferingCondition1 => "Buffering condition error 1",
            Self::BufferingCondition2 => "Buffering condition error 2",
            Self::BufferingCondition3 => "Buffering condition error 3",
            Self::Unknown(_) => "Unknown error code",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(
                f,
                "{} {}",
                String::from_utf8_lossy(code),
                self.description()
            ),
            _ => f.write_str(self.description()),
        }
    }
}

/// A typed field value, as produced by [`Response::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Empty,
    Unsigned(u32),
    Signed(i32),
    Code(u8),
    Samples(Vec<i32>),
}

impl FieldValue {
    pub fn unsigned(self) -> Result<u32, DecodeError> {
        match self {
            Self::Unsigned(v) => Ok(v),
            other => other.wrong_kind("unsigned"),
        }
    }

    pub fn signed(self) -> Result<i32, DecodeError> {
        match self {
            Self::Signed(v) => Ok(v),
            other => other.wrong_kind("signed"),
        }
    }

    pub fn code(self) -> Result<u8, DecodeError> {
        match self {
            Self::Code(v) => Ok(v),
            other => other.wrong_kind("code"),
        }
    }

    pub fn samples(self) -> Result<Vec<i32>, DecodeError> {
        match self {
            Self::Samples(v) => Ok(v),
            other => other.wrong_kind("samples"),
        }
    }

    /// An unsigned field that may only be 0 or 1.
    pub fn flag(self) -> Result<bool, DecodeError> {
        match self.unsigned()? {
            0 => Ok(false),
            1 => Ok(true),
            v => UnexpectedCodeSnafu {
                code: char::from_digit(v % 10, 10).unwrap_or('?'),
            }
            .fail(),
        }
    }

    pub fn sampling_cycle(self) -> Result<SamplingCycle, DecodeError> {
        SamplingCycle::from_code(self.code()?)
    }

    pub fn buffering_mode(self) -> Result<BufferingMode, DecodeError> {
        BufferingMode::from_code(self.code()?)
    }

    pub fn buffering_operation(self) -> Result<BufferingOperation, DecodeError> {
        BufferingOperation::from_code(self.code()?)
    }

    pub fn buffering_status(self) -> Result<BufferingStatus, DecodeError> {
        BufferingStatus::from_code(self.code()?)
    }

    pub fn shutter_time(self) -> Result<ShutterTime, DecodeError> {
        Ok(ShutterTime::from_value(self.code()?))
    }

    fn kind(&self) -> FieldKind {
        match self {
            Self::Empty => FieldKind::Empty,
            Self::Unsigned(_) => FieldKind::Unsigned,
            Self::Signed(_) => FieldKind::Signed,
            Self::Code(_) => FieldKind::Code,
            Self::Samples(_) => FieldKind::Bulk,
        }
    }

    fn wrong_kind<T>(&self, wanted: &'static str) -> Result<T, DecodeError> {
        WrongKindSnafu {
            kind: self.kind(),
            wanted,
        }
        .fail()
    }
}

/// One complete response frame, up to and including its CR.
#[derive(Clone, PartialEq, Eq)]
pub struct Response {
    data: Vec<u8>,
}

impl Response {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// True iff the marker byte at offset 3 is `!`.
    pub fn has_error(&self) -> bool {
        self.data.get(MARKER_OFFSET) == Some(&ERROR_MARKER)
    }

    /// Whether this frame can be the reply to `command`.
    ///
    /// A normal reply echoes the command code after the `$` marker. An error
    /// reply carries no echo and is accepted for any command.
    pub fn answers(&self, command: Command) -> bool {
        match self.data.get(MARKER_OFFSET) {
            Some(&ERROR_MARKER) => true,
            Some(b'$') => self.data.get(ECHO) == Some(&command.code()[..]),
            _ => false,
        }
    }

    /// The device error code, if the error marker is set.
    ///
    /// A marked frame too short to carry a code is reported as
    /// [`ErrorCode::Unknown`].
    pub fn error_code(&self) -> Option<ErrorCode> {
        if !self.has_error() {
            return None;
        }
        let code = match self.data.get(ERROR_CODE) {
            Some(&[a, b]) => [a, b],
            _ => [b'?', b'?'],
        };
        Some(ErrorCode::from_bytes(code))
    }

    /// Byte window `offset..offset + width`.
    /// # Errors
    /// Returns [`DecodeError::TooShort`] if the window ends inside the trailer
    /// or past the end of the frame.
    pub fn window(&self, offset: usize, width: usize) -> Result<&[u8], DecodeError> {
        let need = offset + width + TRAILER_LEN;
        ensure!(
            self.data.len() >= need,
            TooShortSnafu {
                len: self.data.len(),
                need
            }
        );
        Ok(&self.data[offset..offset + width])
    }

    /// Everything from `offset` up to the `**\r` trailer.
    pub fn window_to_trailer(&self, offset: usize) -> Result<&[u8], DecodeError> {
        let width = self
            .data
            .len()
            .checked_sub(offset + TRAILER_LEN)
            .context(TooShortSnafu {
                len: self.data.len(),
                need: offset + TRAILER_LEN,
            })?;
        self.window(offset, width)
    }

    /// Decode the field described by `layout`.
    pub fn decode(&self, layout: FieldLayout) -> Result<FieldValue, DecodeError> {
        let window = match layout.kind {
            FieldKind::Empty => return Ok(FieldValue::Empty),
            FieldKind::Bulk => self.window_to_trailer(layout.offset)?,
            _ => self.window(layout.offset, layout.width)?,
        };
        let invalid = || InvalidFieldSnafu {
            offset: layout.offset,
            text: String::from_utf8_lossy(window).into_owned(),
        };
        Ok(match layout.kind {
            FieldKind::Unsigned => {
                FieldValue::Unsigned(nom_parser::unsigned_field(window).with_context(invalid)?)
            }
            FieldKind::Signed => {
                FieldValue::Signed(nom_parser::signed_field(window).with_context(invalid)?)
            }
            FieldKind::Code if window.len() == 1 => {
                ensure!(window[0].is_ascii_digit(), invalid());
                FieldValue::Code(window[0])
            }
            FieldKind::Code => {
                let v = nom_parser::digits_field(window).with_context(invalid)?;
                FieldValue::Code(u8::try_from(v).ok().with_context(invalid)?)
            }
            FieldKind::Bulk => {
                FieldValue::Samples(nom_parser::bulk_samples(window).with_context(invalid)?)
            }
            FieldKind::Empty => FieldValue::Empty,
        })
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Response({})", self)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.data.escape_ascii())
    }
}
