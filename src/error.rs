use std::time::Duration;

use snafu::Snafu;

use crate::command::{BufferingStatus, Command};
use crate::response::{DecodeError, ErrorCode};
use crate::types::Error as TypeError;

/// Errors returned when talking to a device.
///
/// A command the device rejected is reported as [`Error::Device`], and is
/// never turned into a default value.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    /// Reading or writing the byte channel failed.
    #[snafu(display("I/O error on the serial channel: {}", source))]
    Io { source: std::io::Error },
    /// The response did not arrive in time.
    #[snafu(display("No complete response to {} within {:?}", command, timeout))]
    Timeout { command: Command, timeout: Duration },
    /// The device answered with its error marker.
    #[snafu(display("Device rejected {}: {}", command, code))]
    Device { command: Command, code: ErrorCode },
    /// The response could not be decoded.
    #[snafu(display("Could not decode response to {}: {}", command, source))]
    Decode {
        command: Command,
        source: DecodeError,
    },
    /// A value doesn't fit its payload field.
    #[snafu(display("Invalid argument: {}", source))]
    InvalidArgument { source: TypeError },
    /// A bulk read range that isn't 1-based and ascending.
    #[snafu(display("Invalid sample range {}..={}", start, end))]
    InvalidRange { start: u32, end: u32 },
    /// Readout was requested before the buffer finished accumulating.
    #[snafu(display("Buffer not ready, status is {}", status))]
    BufferNotReady { status: BufferingStatus },
    /// Writing read-out samples failed.
    #[snafu(display("Could not write samples: {}", source))]
    Sink { source: std::io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// The error code, if the device rejected the command.
    pub fn device_error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_device_error(&self) -> bool {
        self.device_error_code().is_some()
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<TypeError> for Error {
    fn from(source: TypeError) -> Self {
        Self::InvalidArgument { source }
    }
}
