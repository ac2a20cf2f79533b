//! See [`Master`] for more details.

use log::{debug, warn};

use crate::buffer::Buffer;
use crate::command::Command;
use crate::frame::Payload;
use crate::response::Response;
use crate::types::{Address, Error as TypeError, IntoAddress};

/// Controller side of the HL-G1 command/response protocol, without any I/O.
///
/// Every command frame must be answered by exactly one response frame before
/// the next command is sent. The state types enforce this: a [`Master`] is
/// consumed by [`send_command`](Master::send_command), and only handed back
/// once [`ReceiveResponse`] has seen a complete response.
///
/// # Example
/// ```
/// use hlg1_proto::master::{Master, ReceiverResult};
/// use hlg1_proto::{Command, Payload};
///
/// let master = Master::new(1).unwrap();
/// let send = master.send_command(Command::ReadBufferRate, Payload::None);
/// assert_eq!(send.get_data(), b"%01#RBR**\r");
///
/// let mut recv = send.data_sent();
/// for byte in b"%01$RBR+00001**\r" {
///     recv = match recv.receive_data(&[*byte]) {
///         ReceiverResult::NeedData(recv) => recv,
///         ReceiverResult::Done(_master, response) => {
///             assert!(!response.has_error());
///             break;
///         }
///     };
/// }
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Master {
    address: Address,
}

impl Master {
    /// Create a controller talking to the device with id `address`.
    pub fn new(address: impl IntoAddress) -> Result<Self, TypeError> {
        Ok(Self {
            address: address.into_address()?,
        })
    }

    pub const fn address(&self) -> Address {
        self.address
    }

    /// Frame `command` with `payload`. Transmit the returned data, then call
    /// [`SendData::data_sent`] to start waiting for the reply.
    pub fn send_command(self, command: Command, payload: Payload) -> SendData {
        let data = payload.encode(&self.address.prefix(), command.code());
        SendData {
            master: self,
            command,
            data,
        }
    }
}

/// A command frame waiting to be transmitted.
#[derive(Debug)]
pub struct SendData {
    master: Master,
    command: Command,
    data: Vec<u8>,
}

impl SendData {
    /// Returns the data to be sent on the bus.
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    pub const fn command(&self) -> Command {
        self.command
    }

    /// Signals that the data was sent, and it's time to receive the response.
    pub fn data_sent(self) -> ReceiveResponse {
        ReceiveResponse {
            master: self.master,
            command: self.command,
            buffer: Buffer::new(),
        }
    }
}

/// Outcome of feeding data into a [`ReceiveResponse`].
#[derive(Debug)]
pub enum ReceiverResult {
    /// The response is not complete yet.
    NeedData(ReceiveResponse),
    /// A complete response was received, and the master is idle again.
    Done(Master, Response),
}

/// Waiting for the response to a command.
#[derive(Debug)]
pub struct ReceiveResponse {
    master: Master,
    command: Command,
    buffer: Buffer,
}

impl ReceiveResponse {
    /// Feed received bytes. A response is complete at the first CR; any data
    /// following it in `data` is discarded.
    ///
    /// A complete frame that doesn't echo the pending command, such as a late
    /// reply to an earlier one, is dropped and receiving starts over.
    pub fn receive_data(mut self, data: &[u8]) -> ReceiverResult {
        let taken = self.buffer.write(data);
        if !self.buffer.is_complete() {
            return ReceiverResult::NeedData(self);
        }
        let rest = &data[taken..];
        let response = Response::new(self.buffer.into_inner());
        if !response.answers(self.command) {
            warn!(
                "Dropping {} received while waiting for {}",
                response, self.command
            );
            let receiver = ReceiveResponse {
                master: self.master,
                command: self.command,
                buffer: Buffer::new(),
            };
            return receiver.receive_data(rest);
        }
        if !rest.is_empty() {
            warn!(
                "Discarding {} bytes received after the response to {}",
                rest.len(),
                self.command
            );
        }
        debug!("Received: {}", response);
        ReceiverResult::Done(self.master, response)
    }

    /// The command whose response is awaited.
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Give up on the response, e.g. after a timeout.
    pub fn abort(self) -> Master {
        self.master
    }
}

pub mod io {
    //! Blocking driver for [`Master`](super::Master) over a byte channel
    //! implementing [`Read`] and [`Write`], typically a serial port.

    use std::io::{ErrorKind, Read, Write};
    use std::time::{Duration, Instant};

    use log::{debug, trace, warn};
    use snafu::ResultExt;

    use super::{Master, ReceiveResponse, ReceiverResult};
    use crate::command::Command;
    use crate::error::{IoSnafu, Result, TimeoutSnafu};
    use crate::frame::Payload;
    use crate::response::Response;
    use crate::types::Address;

    /// Transport configuration.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TransportConfig {
        /// Deadline for receiving one complete response frame, counted from
        /// the end of transmission.
        pub frame_timeout: Duration,
    }

    impl Default for TransportConfig {
        fn default() -> Self {
            Self {
                frame_timeout: Duration::from_secs(5),
            }
        }
    }

    /// Sends one command frame and blocks for its response.
    ///
    /// Reads are done one byte at a time. A read that times out or returns no
    /// data is tolerated until the frame deadline has passed.
    ///
    /// After a timeout or I/O error the channel may still hold the remains of
    /// the failed exchange. Whatever is pending is read and thrown away before
    /// the next command goes out.
    #[derive(Debug)]
    pub struct Transport<IO> {
        io: IO,
        master: Master,
        config: TransportConfig,
        resync: bool,
    }

    impl<IO> Transport<IO>
    where
        IO: Read + Write,
    {
        pub fn new(io: IO, address: Address) -> Self {
            Self::with_config(io, address, TransportConfig::default())
        }

        pub fn with_config(io: IO, address: Address, config: TransportConfig) -> Self {
            Self {
                io,
                master: Master { address },
                config,
                resync: false,
            }
        }

        pub const fn address(&self) -> Address {
            self.master.address
        }

        pub const fn config(&self) -> &TransportConfig {
            &self.config
        }

        pub fn set_frame_timeout(&mut self, timeout: Duration) {
            self.config.frame_timeout = timeout;
        }

        /// Send `command` and return the raw response, without looking at the
        /// error marker.
        pub fn transact(&mut self, command: Command, payload: Payload) -> Result<Response> {
            if self.resync {
                self.discard_input()?;
                self.resync = false;
            }
            let send = self.master.send_command(command, payload);
            debug!("Sending: \"{}\"", send.get_data().escape_ascii());
            let result = match self.send_data(send.get_data()) {
                Ok(()) => self.receive_data(send.data_sent()),
                Err(err) => Err(err),
            };
            self.resync = result.is_err();
            result
        }

        pub fn get_ref(&self) -> &IO {
            &self.io
        }

        pub fn get_mut(&mut self) -> &mut IO {
            &mut self.io
        }

        pub fn into_inner(self) -> IO {
            self.io
        }

        /// Read until the channel has nothing more to give, or the frame
        /// deadline passes.
        fn discard_input(&mut self) -> Result<()> {
            let deadline = Instant::now() + self.config.frame_timeout;
            let mut data = [0; 64];
            let mut discarded = 0;
            while Instant::now() < deadline {
                match self.io.read(&mut data) {
                    Ok(0) => break,
                    Ok(len) => discarded += len,
                    Err(err) if err.kind() == ErrorKind::Interrupted => {}
                    Err(err)
                        if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                    {
                        break
                    }
                    Err(err) => return Err(err).context(IoSnafu),
                }
            }
            if discarded > 0 {
                warn!("Discarded {} stale bytes left on the line", discarded);
            }
            Ok(())
        }

        fn send_data(&mut self, data: &[u8]) -> Result<()> {
            self.io.write_all(data).context(IoSnafu)?;
            self.io.flush().context(IoSnafu)
        }

        fn receive_data(&mut self, mut receiver: ReceiveResponse) -> Result<Response> {
            let deadline = Instant::now() + self.config.frame_timeout;
            let mut data = [0];
            loop {
                let len = match self.io.read(&mut data) {
                    Ok(len) => len,
                    Err(err)
                        if matches!(
                            err.kind(),
                            ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                        ) =>
                    {
                        trace!("Read timed out waiting for {}", receiver.command());
                        0
                    }
                    Err(err) => return Err(err).context(IoSnafu),
                };
                receiver = match receiver.receive_data(&data[..len]) {
                    ReceiverResult::NeedData(receiver) => receiver,
                    ReceiverResult::Done(master, response) => {
                        self.master = master;
                        return Ok(response);
                    }
                };
                if Instant::now() >= deadline {
                    let command = receiver.command();
                    self.master = receiver.abort();
                    return TimeoutSnafu {
                        command,
                        timeout: self.config.frame_timeout,
                    }
                    .fail();
                }
            }
        }
    }
}
