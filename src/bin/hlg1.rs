use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serialport::{DataBits, Parity, SerialPort, StopBits};

use hlg1_proto::workflow::{self, BufferSetup};
use hlg1_proto::{Hlg1, TransportConfig};

type Sensor = Hlg1<Box<dyn SerialPort>>;

/// Control an HL-G1 displacement sensor over its serial port
#[derive(Parser)]
#[command(name = "hlg1", version, about, long_about = None)]
struct Cli {
    /// Serial port device
    #[arg(short = 'd', long, env = "HLG1_SERIAL_DEVICE", default_value = hlg1_proto::DEFAULT_TTY)]
    serial_device: String,

    /// Baud rate
    #[arg(short, long, env = "HLG1_BAUD", default_value_t = hlg1_proto::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Device id
    #[arg(short, long, default_value_t = 1)]
    id: u8,

    /// Timeout for reading a single byte, in milliseconds
    #[arg(long, default_value_t = 1000)]
    read_timeout_ms: u64,

    /// Timeout for receiving a complete response, in milliseconds
    #[arg(long, default_value_t = 5000)]
    frame_timeout_ms: u64,

    /// Log every frame sent and received
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the offset so that the current position reads zero
    Zero,
    /// Configure triggered buffering and start waiting for the trigger
    Arm {
        #[arg(long, default_value_t = 1)]
        rate: u32,
        #[arg(long, default_value_t = 3000)]
        amount: u32,
        #[arg(long, default_value_t = 300)]
        trigger_point: u32,
        #[arg(long, default_value_t = 0)]
        trigger_delay: u32,
        #[arg(long, default_value_t = 0)]
        trigger_conditions: u32,
    },
    /// Switch the timing input on, starting a buffered measurement
    Trigger,
    /// Save the completed buffer to a file, one value per line
    Readout { output_file: PathBuf },
    /// Print every readable parameter
    Status,
    /// Read one parameter
    Get { param: Param },
    /// Write one parameter
    Set {
        param: Param,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Param {
    SamplingCycle,
    ShutterTime,
    Measurement,
    BufferingMode,
    BufferingOperation,
    BufferingStatus,
    LastDatapoint,
    BufferRate,
    ZeroSet,
    AccumulatedAmount,
    TriggerPoint,
    TriggerDelay,
    TriggerConditions,
    TriggerThreshold,
    Offset,
    DigitalOutputAlarm,
    AlarmDelayTime,
    AlarmStatus,
    AllOutputs,
    TimingMode,
    TimingInput,
}

impl Param {
    fn get(self, dev: &mut Sensor) -> hlg1_proto::Result<String> {
        use Param::*;
        Ok(match self {
            SamplingCycle => dev.get_sampling_cycle()?.to_string(),
            ShutterTime => dev.get_shutter_time()?.to_string(),
            Measurement => dev.get_measurement()?.to_string(),
            BufferingMode => dev.get_buffering_mode()?.to_string(),
            BufferingOperation => dev.get_buffering_operation()?.to_string(),
            BufferingStatus => dev.get_buffering_status()?.to_string(),
            LastDatapoint => dev.get_last_datapoint()?.to_string(),
            BufferRate => dev.get_buffer_rate()?.to_string(),
            ZeroSet => dev.get_zero_set()?.to_string(),
            AccumulatedAmount => dev.get_accumulated_amount()?.to_string(),
            TriggerPoint => dev.get_trigger_point()?.to_string(),
            TriggerDelay => dev.get_trigger_delay()?.to_string(),
            TriggerConditions => dev.get_trigger_conditions()?.to_string(),
            TriggerThreshold => dev.get_trigger_threshold()?.to_string(),
            Offset => dev.get_offset()?.to_string(),
            DigitalOutputAlarm => dev.get_digital_output_alarm()?.to_string(),
            AlarmDelayTime => dev.get_alarm_delay_time()?.to_string(),
            AlarmStatus => dev.get_alarm_status()?.to_string(),
            AllOutputs => dev.get_all_outputs()?.to_string(),
            TimingMode => dev.get_timing_mode()?.to_string(),
            TimingInput => dev.get_timing_input()?.to_string(),
        })
    }

    fn set(self, dev: &mut Sensor, value: i64) -> Result<()> {
        use Param::*;
        let unsigned = || u32::try_from(value).context("Value must not be negative");
        let signed = || i32::try_from(value).context("Value out of range");
        match self {
            BufferingMode => dev.set_buffering_mode(if value != 0 {
                hlg1_proto::BufferingMode::Triggered
            } else {
                hlg1_proto::BufferingMode::Continuous
            })?,
            BufferingOperation => dev.set_buffering_operation(if value != 0 {
                hlg1_proto::BufferingOperation::Start
            } else {
                hlg1_proto::BufferingOperation::Stop
            })?,
            BufferRate => dev.set_buffer_rate(unsigned()?)?,
            ZeroSet => dev.set_zero_set(value != 0)?,
            AccumulatedAmount => dev.set_accumulated_amount(unsigned()?)?,
            TriggerPoint => dev.set_trigger_point(unsigned()?)?,
            TriggerDelay => dev.set_trigger_delay(unsigned()?)?,
            TriggerConditions => dev.set_trigger_conditions(unsigned()?)?,
            TriggerThreshold => dev.set_trigger_threshold(signed()?)?,
            Offset => dev.set_offset(signed()?)?,
            DigitalOutputAlarm => dev.set_digital_output_alarm(unsigned()?)?,
            AlarmDelayTime => dev.set_alarm_delay_time(unsigned()?)?,
            TimingMode => dev.set_timing_mode(unsigned()?)?,
            TimingInput => dev.set_timing_input(value != 0)?,
            SamplingCycle | ShutterTime | Measurement | BufferingStatus | LastDatapoint
            | AlarmStatus | AllOutputs => anyhow::bail!("{:?} is read-only", self),
        }
        Ok(())
    }
}

fn open_sensor(cli: &Cli) -> Sensor {
    let port = serialport::new(&cli.serial_device, cli.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .timeout(Duration::from_millis(cli.read_timeout_ms))
        .open();
    let port = match port {
        Ok(port) => port,
        Err(err) => {
            eprintln!("Failed to connect to device {}: {}", cli.serial_device, err);
            std::process::exit(1);
        }
    };
    log::info!("Connected to {}", port.name().unwrap_or_default());

    let config = TransportConfig {
        frame_timeout: Duration::from_millis(cli.frame_timeout_ms),
    };
    match Hlg1::with_config(port, cli.id, config) {
        Ok(sensor) => sensor,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, dev: &mut Sensor) -> Result<()> {
    match &cli.command {
        Commands::Zero => {
            let offset = workflow::zero_offset(dev)?;
            println!("Zero offset set to: {:.4}mm", f64::from(offset) / 10_000.0);
        }
        Commands::Arm {
            rate,
            amount,
            trigger_point,
            trigger_delay,
            trigger_conditions,
        } => {
            let setup = BufferSetup {
                rate: *rate,
                amount: *amount,
                trigger_point: *trigger_point,
                trigger_delay: *trigger_delay,
                trigger_conditions: *trigger_conditions,
            };
            let status = workflow::arm_buffer(dev, &setup)?;
            println!("Buffer status: {}", status);
        }
        Commands::Trigger => {
            let (before, after) = workflow::trigger(dev)?;
            println!("Current timing input state: {}", before);
            println!("New timing input state: {}", after);
        }
        Commands::Readout { output_file } => {
            match workflow::readout_to_file(dev, output_file) {
                Ok(samples) => {
                    println!("Wrote {} samples to {}", samples.len(), output_file.display())
                }
                Err(hlg1_proto::Error::BufferNotReady { status }) => {
                    println!("ERROR: Buffer not ready (status: {})", status);
                    println!(
                        "Current trigger conditions: {}",
                        dev.get_trigger_conditions()?
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }
        Commands::Status => {
            for param in Param::value_variants() {
                match param.get(dev) {
                    Ok(value) => println!("{:?}: {}", param, value),
                    Err(err) => println!("{:?}: <{}>", param, err),
                }
            }
        }
        Commands::Get { param } => println!("{}", param.get(dev)?),
        Commands::Set { param, value } => param.set(dev, *value)?,
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    let start = Instant::now();
    let mut dev = open_sensor(&cli);
    run(&cli, &mut dev)?;
    println!(
        "Program completed in {:.2} seconds",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
