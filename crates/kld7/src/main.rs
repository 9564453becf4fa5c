mod cmd;
mod exit;
mod logging;
mod output;
mod persist;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kld7", version, about = "K-LD7 radar capture tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::cmd::{RangeArg, SpeedArg};

    #[test]
    fn parses_stream_subcommand() {
        let cli = Cli::try_parse_from([
            "kld7",
            "stream",
            "/dev/ttyUSB0",
            "--max-speed",
            "12.5",
            "--max-range",
            "30",
            "--count",
            "10",
            "--output",
            "run.csv",
        ])
        .expect("stream args should parse");

        let Command::Stream(args) = cli.command else {
            panic!("expected stream subcommand");
        };
        assert_eq!(args.port, "/dev/ttyUSB0");
        assert_eq!(args.max_speed, SpeedArg::Kmh12_5);
        assert_eq!(args.max_range, RangeArg::M30);
        assert_eq!(args.count, Some(10));
        assert_eq!(args.output, Path::new("run.csv"));
        assert_eq!(args.baud, 2_000_000);
    }

    #[test]
    fn rejects_unknown_speed_preset() {
        let err = Cli::try_parse_from(["kld7", "stream", "/dev/ttyUSB0", "--max-speed", "60"])
            .expect_err("unknown preset should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn summary_defaults_to_measured_data() {
        let cli = Cli::try_parse_from(["kld7", "--format", "json", "summary"])
            .expect("summary args should parse");
        let Command::Summary(args) = cli.command else {
            panic!("expected summary subcommand");
        };
        assert_eq!(args.path, Path::new("measured_data.csv"));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }
}
