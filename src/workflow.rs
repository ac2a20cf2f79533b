//! Multi-step procedures built from the single-command accessors.
//!
//! Each procedure stops at the first error and returns it, leaving the device
//! in whatever state the completed steps produced.

use std::io::{Read, Write};
use std::path::Path;

use log::info;
use snafu::{ensure, ResultExt};

use crate::command::{BufferingMode, BufferingOperation, BufferingStatus};
use crate::device::Hlg1;
use crate::error::{BufferNotReadySnafu, Result, SinkSnafu};

/// Make the current position read as zero, by setting the offset to the
/// negated measurement. Returns the offset read back from the device.
pub fn zero_offset<IO: Read + Write>(dev: &mut Hlg1<IO>) -> Result<i32> {
    dev.set_offset(0)?;
    let measurement = dev.get_measurement()?;
    dev.set_offset(-measurement)?;
    let offset = dev.get_offset()?;
    info!("Zero offset set to {:.4} mm", f64::from(offset) / 10_000.0);
    Ok(offset)
}

/// Buffer settings applied by [`arm_buffer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferSetup {
    /// Store every n-th sample.
    pub rate: u32,
    /// Number of samples to accumulate.
    pub amount: u32,
    /// Sample index at which the trigger fires.
    pub trigger_point: u32,
    pub trigger_delay: u32,
    /// 0 = timing input.
    pub trigger_conditions: u32,
}

impl Default for BufferSetup {
    fn default() -> Self {
        Self {
            rate: 1,
            amount: 3000,
            trigger_point: 300,
            trigger_delay: 0,
            trigger_conditions: 0,
        }
    }
}

/// Configure triggered buffering and start it. Returns the buffering status
/// after starting.
pub fn arm_buffer<IO: Read + Write>(dev: &mut Hlg1<IO>, setup: &BufferSetup) -> Result<BufferingStatus> {
    dev.set_buffering_operation(BufferingOperation::Stop)?;
    dev.set_buffer_rate(setup.rate)?;
    dev.set_buffering_mode(BufferingMode::Triggered)?;
    // pulse zero set
    dev.set_zero_set(true)?;
    dev.set_zero_set(false)?;

    dev.set_accumulated_amount(setup.amount)?;
    dev.set_trigger_point(setup.trigger_point)?;
    dev.set_trigger_delay(setup.trigger_delay)?;
    dev.set_trigger_conditions(setup.trigger_conditions)?;

    dev.set_buffering_operation(BufferingOperation::Start)?;
    let status = dev.get_buffering_status()?;
    info!("Buffer status: {}", status);

    dev.set_timing_input(false)?;
    Ok(status)
}

/// Switch the timing input on. Returns the input state before and after.
pub fn trigger<IO: Read + Write>(dev: &mut Hlg1<IO>) -> Result<(bool, bool)> {
    let before = dev.get_timing_input()?;
    info!("Current timing input state: {}", before);
    dev.set_timing_input(true)?;
    let after = dev.get_timing_input()?;
    info!("New timing input state: {}", after);
    Ok((before, after))
}

/// Read the completed buffer and write it to `sink`, one value per line.
/// # Errors
/// [`Error::BufferNotReady`](crate::Error::BufferNotReady) if accumulation
/// hasn't completed.
pub fn readout<IO, W>(dev: &mut Hlg1<IO>, mut sink: W) -> Result<Vec<i32>>
where
    IO: Read + Write,
    W: Write,
{
    let status = dev.get_buffering_status()?;
    ensure!(
        status == BufferingStatus::AccumulationCompleted,
        BufferNotReadySnafu { status }
    );

    dev.set_timing_input(false)?;
    let samples = dev.read_data()?;
    for sample in &samples {
        writeln!(sink, "{}", sample).context(SinkSnafu)?;
    }
    sink.flush().context(SinkSnafu)?;
    Ok(samples)
}

/// [`readout`] into the file at `path`.
///
/// The file is only created once the samples have been read, so an existing
/// file is left alone when the buffer isn't ready or the read fails.
pub fn readout_to_file<IO, P>(dev: &mut Hlg1<IO>, path: P) -> Result<Vec<i32>>
where
    IO: Read + Write,
    P: AsRef<Path>,
{
    let mut text = Vec::new();
    let samples = readout(dev, &mut text)?;
    std::fs::write(path, text).context(SinkSnafu)?;
    Ok(samples)
}
