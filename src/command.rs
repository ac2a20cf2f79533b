//! Command catalogue of the HL-G1 and the layout of each command's response.
//!
//! The protocol is not self-describing: where the payload of a response
//! starts, how wide it is and how it must be read depends only on which
//! command was issued. [`Command::layout`] is the table holding that
//! knowledge, consumed by the single generic decoder in
//! [`Response::decode`](crate::response::Response::decode).

use core::fmt;

use snafu::OptionExt;

use crate::response::{DecodeError, UnexpectedCodeSnafu};

/// Every command the driver knows how to issue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    /// Sampling cycle.
    ReadSamplingCycle,
    /// Shutter time.
    ReadShutterTime,
    /// Current measurement value.
    ReadMeasurement,
    ReadBufferingMode,
    WriteBufferingMode,
    ReadBufferingOperation,
    WriteBufferingOperation,
    ReadBufferingStatus,
    /// Index of the last valid sample in the buffer.
    ReadLastDatapoint,
    ReadBufferRate,
    WriteBufferRate,
    ReadZeroSet,
    WriteZeroSet,
    ReadAccumulatedAmount,
    WriteAccumulatedAmount,
    ReadTriggerPoint,
    WriteTriggerPoint,
    ReadTriggerDelay,
    WriteTriggerDelay,
    ReadTriggerConditions,
    WriteTriggerConditions,
    ReadTriggerThreshold,
    WriteTriggerThreshold,
    ReadOffset,
    WriteOffset,
    /// Bulk readout of a range of buffered samples.
    ReadBufferedData,
    ReadDigitalOutputAlarm,
    WriteDigitalOutputAlarm,
    ReadAlarmDelayTime,
    WriteAlarmDelayTime,
    ReadAlarmStatus,
    ReadAllOutputs,
    ReadTimingMode,
    WriteTimingMode,
    ReadTimingInput,
    WriteTimingInput,
}

impl Command {
    /// All commands, in catalogue order.
    pub const ALL: [Command; 36] = {
        use Command::*;
        [
            ReadSamplingCycle,
            ReadShutterTime,
            ReadMeasurement,
            ReadBufferingMode,
            WriteBufferingMode,
            ReadBufferingOperation,
            WriteBufferingOperation,
            ReadBufferingStatus,
            ReadLastDatapoint,
            ReadBufferRate,
            WriteBufferRate,
            ReadZeroSet,
            WriteZeroSet,
            ReadAccumulatedAmount,
            WriteAccumulatedAmount,
            ReadTriggerPoint,
            WriteTriggerPoint,
            ReadTriggerDelay,
            WriteTriggerDelay,
            ReadTriggerConditions,
            WriteTriggerConditions,
            ReadTriggerThreshold,
            WriteTriggerThreshold,
            ReadOffset,
            WriteOffset,
            ReadBufferedData,
            ReadDigitalOutputAlarm,
            WriteDigitalOutputAlarm,
            ReadAlarmDelayTime,
            WriteAlarmDelayTime,
            ReadAlarmStatus,
            ReadAllOutputs,
            ReadTimingMode,
            WriteTimingMode,
            ReadTimingInput,
            WriteTimingInput,
        ]
    };

    /// The three-letter command code sent on the wire.
    pub const fn code(self) -> &'static [u8; 3] {
        use Command::*;
        match self {
            ReadSamplingCycle => b"RSP",
            ReadShutterTime => b"RFB",
            ReadMeasurement => b"RMD",
            ReadBufferingMode => b"RBD",
            WriteBufferingMode => b"WBD",
            ReadBufferingOperation => b"RBS",
            WriteBufferingOperation => b"WBS",
            ReadBufferingStatus => b"RTS",
            ReadLastDatapoint => b"RLD",
            ReadBufferRate => b"RBR",
            WriteBufferRate => b"WBR",
            ReadZeroSet => b"RZS",
            WriteZeroSet => b"WZS",
            ReadAccumulatedAmount => b"RBC",
            WriteAccumulatedAmount => b"WBC",
            ReadTriggerPoint => b"RTP",
            WriteTriggerPoint => b"WTP",
            ReadTriggerDelay => b"RTL",
            WriteTriggerDelay => b"WTL",
            ReadTriggerConditions => b"RTR",
            WriteTriggerConditions => b"WTR",
            ReadTriggerThreshold => b"RBL",
            WriteTriggerThreshold => b"WBL",
            ReadOffset => b"RML",
            WriteOffset => b"WML",
            ReadBufferedData => b"RLA",
            ReadDigitalOutputAlarm => b"RAD",
            WriteDigitalOutputAlarm => b"WAD",
            ReadAlarmDelayTime => b"RHC",
            WriteAlarmDelayTime => b"WHC",
            ReadAlarmStatus => b"ROA",
            ReadAllOutputs => b"RMB",
            ReadTimingMode => b"RTM",
            WriteTimingMode => b"WTM",
            ReadTimingInput => b"RTI",
            WriteTimingInput => b"WTI",
        }
    }

    /// Look up a command by its wire code.
    pub fn from_code(code: &[u8]) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }

    /// Where the payload of this command's response lives, and how to read it.
    pub const fn layout(self) -> FieldLayout {
        use Command::*;
        match self {
            ReadSamplingCycle | ReadBufferingMode | ReadBufferingOperation
            | ReadBufferingStatus => FieldLayout::CODE,
            ReadShutterTime => FieldLayout::SHUTTER,
            ReadMeasurement | ReadTriggerThreshold | ReadOffset => FieldLayout::SIGNED,
            ReadBufferedData => FieldLayout::BULK,
            ReadLastDatapoint | ReadBufferRate | ReadZeroSet | ReadAccumulatedAmount
            | ReadTriggerPoint | ReadTriggerDelay | ReadTriggerConditions
            | ReadDigitalOutputAlarm | ReadAlarmDelayTime | ReadAlarmStatus | ReadAllOutputs
            | ReadTimingMode | ReadTimingInput => FieldLayout::UNSIGNED,
            WriteBufferingMode | WriteBufferingOperation | WriteBufferRate | WriteZeroSet
            | WriteAccumulatedAmount | WriteTriggerPoint | WriteTriggerDelay
            | WriteTriggerConditions | WriteTriggerThreshold | WriteOffset
            | WriteDigitalOutputAlarm | WriteAlarmDelayTime | WriteTimingMode
            | WriteTimingInput => FieldLayout::NONE,
        }
    }

    pub const fn is_write(self) -> bool {
        self.code()[0] == b'W'
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.code();
        write!(f, "{}{}{}", code[0] as char, code[1] as char, code[2] as char)
    }
}

/// How the bytes of a response field are to be interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// No payload, only the error marker matters.
    Empty,
    /// `+` followed by a zero-padded unsigned decimal.
    Unsigned,
    /// Sign character followed by zero-padded decimal digits.
    Signed,
    /// A single enumerated code character, or a short fixed-width code.
    Code,
    /// Sequence of signed decimals, delimited by whitespace or sign characters.
    Bulk,
}

/// Byte window of a response field.
///
/// `width == 0` with [`FieldKind::Bulk`] means "until the `**\r` trailer".
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

/// Length of the `**\r` trailer ending every frame.
pub const TRAILER_LEN: usize = 3;

impl FieldLayout {
    pub const NONE: Self = Self {
        offset: 0,
        width: 0,
        kind: FieldKind::Empty,
    };
    // `%NN$XXX+ddddd**\r`
    pub const UNSIGNED: Self = Self {
        offset: 7,
        width: 6,
        kind: FieldKind::Unsigned,
    };
    // `%NN$XXX+ddddddd**\r`
    pub const SIGNED: Self = Self {
        offset: 7,
        width: 8,
        kind: FieldKind::Signed,
    };
    // last digit of the five digit field
    pub const CODE: Self = Self {
        offset: 12,
        width: 1,
        kind: FieldKind::Code,
    };
    pub const SHUTTER: Self = Self {
        offset: 11,
        width: 2,
        kind: FieldKind::Code,
    };
    pub const BULK: Self = Self {
        offset: 7,
        width: 0,
        kind: FieldKind::Bulk,
    };

    /// Smallest response length holding this field and the trailer.
    pub const fn min_len(&self) -> usize {
        self.offset + self.width + TRAILER_LEN
    }
}

macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident = $code:literal => $text:literal,)+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Map the on-wire code character to a state.
            pub fn from_code(code: u8) -> Result<Self, DecodeError> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
                .context(UnexpectedCodeSnafu { code: code as char })
            }

            /// The numeric value written to the device for this state.
            pub const fn value(self) -> u8 {
                match self {
                    $(Self::$variant => $code - b'0',)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $(Self::$variant => $text,)+
                })
            }
        }
    };
}

code_enum! {
    /// Interval between two measurements.
    pub enum SamplingCycle {
        Us200 = b'0' => "200 us",
        Us500 = b'1' => "500 us",
        Ms1 = b'2' => "1 ms",
        Ms2 = b'3' => "2 ms",
    }
}

code_enum! {
    /// Whether the buffer fills continuously or starts on a trigger.
    pub enum BufferingMode {
        Continuous = b'0' => "Continuous",
        Triggered = b'1' => "Triggered",
    }
}

code_enum! {
    pub enum BufferingOperation {
        Stop = b'0' => "Stop",
        Start = b'1' => "Start",
    }
}

code_enum! {
    /// Device-side buffering state.
    ///
    /// Progresses `None -> WaitForTrigger -> Accumulating -> AccumulationCompleted`,
    /// driven by the trigger conditions and the timing input.
    pub enum BufferingStatus {
        None = b'0' => "None-buffering",
        WaitForTrigger = b'1' => "Wait for trigger",
        Accumulating = b'2' => "Accumulating",
        AccumulationCompleted = b'3' => "Accumulation completed",
    }
}

/// Shutter time setting, automatic or a fixed step.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShutterTime {
    Auto,
    Fixed(u8),
}

impl ShutterTime {
    pub(crate) const fn from_value(v: u8) -> Self {
        if v == 0 {
            Self::Auto
        } else {
            Self::Fixed(v)
        }
    }
}

impl fmt::Display for ShutterTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Fixed(v) => write!(f, "{:02}", v),
        }
    }
}
