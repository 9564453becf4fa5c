use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use kld7_session::{MaxRange, MaxSpeed};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;
use crate::persist::DEFAULT_CAPTURE_FILE;

pub mod stream;
pub mod summary;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream tracked targets from a sensor and save them as CSV.
    Stream(StreamArgs),
    /// Print distance and speed over time from a saved capture file.
    Summary(SummaryArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Stream(args) => stream::run(args, format),
        Command::Summary(args) => summary::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Speed presets, in km/h.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SpeedArg {
    #[value(name = "12.5")]
    Kmh12_5,
    #[value(name = "25")]
    Kmh25,
    #[value(name = "50")]
    Kmh50,
    #[value(name = "100")]
    Kmh100,
}

impl From<SpeedArg> for MaxSpeed {
    fn from(arg: SpeedArg) -> Self {
        match arg {
            SpeedArg::Kmh12_5 => MaxSpeed::Kmh12_5,
            SpeedArg::Kmh25 => MaxSpeed::Kmh25,
            SpeedArg::Kmh50 => MaxSpeed::Kmh50,
            SpeedArg::Kmh100 => MaxSpeed::Kmh100,
        }
    }
}

/// Range presets, in meters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    #[value(name = "5")]
    M5,
    #[value(name = "10")]
    M10,
    #[value(name = "30")]
    M30,
    #[value(name = "100")]
    M100,
}

impl From<RangeArg> for MaxRange {
    fn from(arg: RangeArg) -> Self {
        match arg {
            RangeArg::M5 => MaxRange::M5,
            RangeArg::M10 => MaxRange::M10,
            RangeArg::M30 => MaxRange::M30,
            RangeArg::M100 => MaxRange::M100,
        }
    }
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Serial port the sensor is attached to (e.g. /dev/ttyUSB0, COM10).
    #[arg(env = "KLD7_PORT")]
    pub port: String,
    /// CSV file the captures are written to when the session ends.
    #[arg(long, short = 'o', default_value = DEFAULT_CAPTURE_FILE)]
    pub output: PathBuf,
    /// Maximum speed preset in km/h.
    #[arg(long, value_enum, default_value = "25")]
    pub max_speed: SpeedArg,
    /// Maximum range preset in meters.
    #[arg(long, value_enum, default_value = "10")]
    pub max_range: RangeArg,
    /// Rate negotiated after INIT (115200, 460800, 921600 or 2000000).
    #[arg(long, default_value_t = 2_000_000)]
    pub baud: u32,
    /// Per-read timeout (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub timeout: String,
    /// Pause between streaming cycles (e.g. 10ms). Default: none.
    #[arg(long)]
    pub pace: Option<String>,
    /// Stop after N streaming cycles.
    #[arg(long)]
    pub count: Option<u64>,
    /// Give up after N consecutive cycles without a usable frame.
    #[arg(long)]
    pub max_missed: Option<u32>,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Capture file written by `kld7 stream`.
    #[arg(default_value = DEFAULT_CAPTURE_FILE)]
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
