//! Driver for the serial command/response protocol of HL-G1 laser
//! displacement sensors.
//!
//! The protocol layer is sans-io: [`master::Master`] frames commands and
//! collects response bytes, while [`master::io::Transport`] moves them over
//! any [`std::io::Read`] + [`std::io::Write`] channel. [`Hlg1`] builds the
//! typed parameter accessors on top, and [`workflow`] strings them together
//! into the usual zeroing, arming and readout procedures.
//!
//! ```no_run
//! # #[cfg(not(feature = "cli"))]
//! # fn main() {}
//! # #[cfg(feature = "cli")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use hlg1_proto::{workflow, Hlg1};
//! use std::time::Duration;
//!
//! let port = serialport::new("/dev/ttyUSB0", hlg1_proto::DEFAULT_BAUD_RATE)
//!     .timeout(Duration::from_secs(1))
//!     .open()?;
//! let mut sensor = Hlg1::new(port, 1)?;
//! let offset = workflow::zero_offset(&mut sensor)?;
//! println!("offset {}", offset);
//! # Ok(()) }
//! ```

mod buffer;
pub mod command;
pub mod device;
pub mod error;
pub mod frame;
pub mod master;
mod nom_parser;
pub mod response;
pub mod types;
pub mod workflow;

pub use command::{
    BufferingMode, BufferingOperation, BufferingStatus, Command, SamplingCycle, ShutterTime,
};
pub use device::Hlg1;
pub use error::{Error, Result};
pub use frame::Payload;
pub use master::io::TransportConfig;
pub use response::{ErrorCode, FieldValue, Response};
pub use types::{Address, IntoAddress, Sign, Signed7, Unsigned5};

#[cfg(unix)]
pub const DEFAULT_TTY: &str = "/dev/ttyUSB0";
#[cfg(windows)]
pub const DEFAULT_TTY: &str = "COM1";

/// Factory default baud rate of the sensor.
pub const DEFAULT_BAUD_RATE: u32 = 230_400;
