//! Typed access to the parameters of one HL-G1 sensor.

use std::io::{Read, Write};

use log::{debug, info, warn};
use snafu::{ensure, ResultExt};

use crate::command::{
    BufferingMode, BufferingOperation, BufferingStatus, Command, SamplingCycle, ShutterTime,
};
use crate::error::{DecodeSnafu, DeviceSnafu, InvalidRangeSnafu, Result};
use crate::frame::Payload;
use crate::master::io::{Transport, TransportConfig};
use crate::response::FieldValue;
use crate::types::{IntoAddress, Signed7, Unsigned5};

/// Handle to one sensor on a serial channel.
///
/// Each method sends exactly one command and waits for its response, except
/// [`read_data`](Self::read_data) which first asks for the number of buffered
/// samples. A response carrying the device's error marker is returned as
/// [`Error::Device`](crate::Error::Device).
///
/// ```no_run
/// # #[cfg(not(feature = "cli"))]
/// # fn main() {}
/// # #[cfg(feature = "cli")]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use hlg1_proto::Hlg1;
/// use std::time::Duration;
///
/// let port = serialport::new("/dev/ttyUSB0", hlg1_proto::DEFAULT_BAUD_RATE)
///     .timeout(Duration::from_secs(1))
///     .open()?;
/// let mut sensor = Hlg1::new(port, 1)?;
/// println!("{}", sensor.get_measurement()?);
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct Hlg1<IO> {
    transport: Transport<IO>,
}

impl<IO> Hlg1<IO>
where
    IO: Read + Write,
{
    pub fn new(io: IO, address: impl IntoAddress) -> Result<Self> {
        Self::with_config(io, address, TransportConfig::default())
    }

    pub fn with_config(
        io: IO,
        address: impl IntoAddress,
        config: TransportConfig,
    ) -> Result<Self> {
        Ok(Self {
            transport: Transport::with_config(io, address.into_address()?, config),
        })
    }

    pub fn transport(&self) -> &Transport<IO> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<IO> {
        &mut self.transport
    }

    pub fn into_inner(self) -> IO {
        self.transport.into_inner()
    }

    /// Send `command` and decode its response field as laid out in
    /// [`Command::layout`].
    /// # Errors
    /// [`Error::Device`](crate::Error::Device) if the device answered with an
    /// error code, [`Error::Decode`](crate::Error::Decode) if the field is
    /// malformed, or a transport error.
    pub fn execute(&mut self, command: Command, payload: Payload) -> Result<FieldValue> {
        let response = self.transport.transact(command, payload)?;
        if let Some(code) = response.error_code() {
            warn!("{} rejected, error {}", command, code);
            return DeviceSnafu { command, code }.fail();
        }
        response
            .decode(command.layout())
            .context(DecodeSnafu { command })
    }

    /// Read the field of a command without payload.
    pub fn read(&mut self, command: Command) -> Result<FieldValue> {
        let value = self.execute(command, Payload::None)?;
        debug!("{} = {:?}", command, value);
        Ok(value)
    }

    fn read_with<T, F>(&mut self, command: Command, convert: F) -> Result<T>
    where
        F: FnOnce(FieldValue) -> Result<T, crate::response::DecodeError>,
    {
        convert(self.read(command)?).context(DecodeSnafu { command })
    }

    fn write_unsigned(&mut self, command: Command, value: impl Into<i64>) -> Result<()> {
        let value: i64 = value.into();
        info!("Setting {} to {}", command, value);
        let payload = Payload::Unsigned(Unsigned5::new(value)?);
        self.execute(command, payload).map(drop)
    }

    fn write_signed(&mut self, command: Command, value: i32) -> Result<()> {
        info!("Setting {} to {}", command, value);
        let payload = Payload::Signed(Signed7::new(value)?);
        self.execute(command, payload).map(drop)
    }

    // Basic settings

    pub fn get_sampling_cycle(&mut self) -> Result<SamplingCycle> {
        self.read_with(Command::ReadSamplingCycle, FieldValue::sampling_cycle)
    }

    pub fn get_shutter_time(&mut self) -> Result<ShutterTime> {
        self.read_with(Command::ReadShutterTime, FieldValue::shutter_time)
    }

    /// Current displacement, in units of 0.1 µm.
    pub fn get_measurement(&mut self) -> Result<i32> {
        self.read_with(Command::ReadMeasurement, FieldValue::signed)
    }

    // Buffering

    pub fn get_buffering_mode(&mut self) -> Result<BufferingMode> {
        self.read_with(Command::ReadBufferingMode, FieldValue::buffering_mode)
    }

    pub fn set_buffering_mode(&mut self, mode: BufferingMode) -> Result<()> {
        self.write_unsigned(Command::WriteBufferingMode, mode.value())
    }

    pub fn get_buffering_operation(&mut self) -> Result<BufferingOperation> {
        self.read_with(
            Command::ReadBufferingOperation,
            FieldValue::buffering_operation,
        )
    }

    pub fn set_buffering_operation(&mut self, operation: BufferingOperation) -> Result<()> {
        self.write_unsigned(Command::WriteBufferingOperation, operation.value())
    }

    pub fn get_buffering_status(&mut self) -> Result<BufferingStatus> {
        self.read_with(Command::ReadBufferingStatus, FieldValue::buffering_status)
    }

    /// Index of the last valid sample in the buffer, 0 when empty.
    pub fn get_last_datapoint(&mut self) -> Result<u32> {
        self.read_with(Command::ReadLastDatapoint, FieldValue::unsigned)
    }

    pub fn get_buffer_rate(&mut self) -> Result<u32> {
        self.read_with(Command::ReadBufferRate, FieldValue::unsigned)
    }

    pub fn set_buffer_rate(&mut self, rate: u32) -> Result<()> {
        self.write_unsigned(Command::WriteBufferRate, rate)
    }

    pub fn get_zero_set(&mut self) -> Result<bool> {
        self.read_with(Command::ReadZeroSet, FieldValue::flag)
    }

    pub fn set_zero_set(&mut self, on: bool) -> Result<()> {
        self.write_unsigned(Command::WriteZeroSet, on)
    }

    pub fn get_accumulated_amount(&mut self) -> Result<u32> {
        self.read_with(Command::ReadAccumulatedAmount, FieldValue::unsigned)
    }

    pub fn set_accumulated_amount(&mut self, amount: u32) -> Result<()> {
        self.write_unsigned(Command::WriteAccumulatedAmount, amount)
    }

    // Trigger

    pub fn get_trigger_point(&mut self) -> Result<u32> {
        self.read_with(Command::ReadTriggerPoint, FieldValue::unsigned)
    }

    pub fn set_trigger_point(&mut self, point: u32) -> Result<()> {
        self.write_unsigned(Command::WriteTriggerPoint, point)
    }

    pub fn get_trigger_delay(&mut self) -> Result<u32> {
        self.read_with(Command::ReadTriggerDelay, FieldValue::unsigned)
    }

    pub fn set_trigger_delay(&mut self, delay: u32) -> Result<()> {
        self.write_unsigned(Command::WriteTriggerDelay, delay)
    }

    /// 0 = timing input, 1 = threshold exceeded, 3 = alarm occurred.
    pub fn get_trigger_conditions(&mut self) -> Result<u32> {
        self.read_with(Command::ReadTriggerConditions, FieldValue::unsigned)
    }

    pub fn set_trigger_conditions(&mut self, conditions: u32) -> Result<()> {
        self.write_unsigned(Command::WriteTriggerConditions, conditions)
    }

    pub fn get_trigger_threshold(&mut self) -> Result<i32> {
        self.read_with(Command::ReadTriggerThreshold, FieldValue::signed)
    }

    pub fn set_trigger_threshold(&mut self, threshold: i32) -> Result<()> {
        self.write_signed(Command::WriteTriggerThreshold, threshold)
    }

    // Offset

    pub fn get_offset(&mut self) -> Result<i32> {
        self.read_with(Command::ReadOffset, FieldValue::signed)
    }

    pub fn set_offset(&mut self, offset: i32) -> Result<()> {
        self.write_signed(Command::WriteOffset, offset)
    }

    // Buffered data

    /// Read every buffered sample, `1..=last datapoint`.
    ///
    /// Returns an empty vector, without issuing a bulk read, when the buffer
    /// holds no samples.
    pub fn read_data(&mut self) -> Result<Vec<i32>> {
        let last = self.get_last_datapoint()?;
        if last == 0 {
            info!("Buffer is empty");
            return Ok(Vec::new());
        }
        self.read_data_range(1, last)
    }

    /// Read the samples `start..=end`, 1-based.
    pub fn read_data_range(&mut self, start: u32, end: u32) -> Result<Vec<i32>> {
        ensure!(start >= 1 && start <= end, InvalidRangeSnafu { start, end });
        let payload = Payload::Range(Unsigned5::new(start)?, Unsigned5::new(end)?);
        let samples = self
            .execute(Command::ReadBufferedData, payload)?
            .samples()
            .context(DecodeSnafu {
                command: Command::ReadBufferedData,
            })?;
        let expected = (end - start + 1) as usize;
        if samples.len() != expected {
            warn!(
                "Asked for {} samples, device returned {}",
                expected,
                samples.len()
            );
        }
        info!("Read {} samples", samples.len());
        Ok(samples)
    }

    // Alarm

    pub fn get_digital_output_alarm(&mut self) -> Result<u32> {
        self.read_with(Command::ReadDigitalOutputAlarm, FieldValue::unsigned)
    }

    pub fn set_digital_output_alarm(&mut self, setting: u32) -> Result<()> {
        self.write_unsigned(Command::WriteDigitalOutputAlarm, setting)
    }

    pub fn get_alarm_delay_time(&mut self) -> Result<u32> {
        self.read_with(Command::ReadAlarmDelayTime, FieldValue::unsigned)
    }

    pub fn set_alarm_delay_time(&mut self, delay: u32) -> Result<()> {
        self.write_unsigned(Command::WriteAlarmDelayTime, delay)
    }

    pub fn get_alarm_status(&mut self) -> Result<bool> {
        self.read_with(Command::ReadAlarmStatus, FieldValue::flag)
    }

    /// State of all outputs, one bit per output.
    pub fn get_all_outputs(&mut self) -> Result<u32> {
        self.read_with(Command::ReadAllOutputs, FieldValue::unsigned)
    }

    // Timing

    pub fn get_timing_mode(&mut self) -> Result<u32> {
        self.read_with(Command::ReadTimingMode, FieldValue::unsigned)
    }

    pub fn set_timing_mode(&mut self, mode: u32) -> Result<()> {
        self.write_unsigned(Command::WriteTimingMode, mode)
    }

    pub fn get_timing_input(&mut self) -> Result<bool> {
        self.read_with(Command::ReadTimingInput, FieldValue::flag)
    }

    pub fn set_timing_input(&mut self, on: bool) -> Result<()> {
        self.write_unsigned(Command::WriteTimingInput, on)
    }
}
