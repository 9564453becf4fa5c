use std::path::Path;

use kld7_session::{
    run_session, BaudRate, Cancellation, PollOutcome, SessionConfig, SessionReport,
};
use kld7_transport::{SerialConfig, SerialLink};

use crate::cmd::{parse_duration, StreamArgs};
use crate::exit::{
    persist_error, session_error, transport_error, CliError, CliResult, SUCCESS, USAGE,
};
use crate::output::{print_capture, print_session_stats, OutputFormat};
use crate::persist::{self, write_captures};

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(&args)?;
    let serial = SerialConfig {
        read_timeout: parse_duration(&args.timeout)?,
        ..SerialConfig::new(args.port.as_str())
    };

    let link = SerialLink::open(&serial).map_err(|err| transport_error("open failed", err))?;

    let cancel = Cancellation::new();
    install_ctrlc_handler(cancel.clone())?;
    tracing::info!(port = link.name(), "streaming; press Ctrl+C to stop and save");

    let report = run_session(link, config, &cancel, |outcome| {
        if let PollOutcome::Target(capture) = outcome {
            print_capture(capture, format);
        }
    });

    tracing::info!(
        state = %report.final_state,
        cycles = report.stats.cycles,
        targets = report.stats.targets,
        misses = report.stats.misses,
        "session ended"
    );
    print_session_stats(report.final_state, &report.stats, format);

    let saved = save_report(&args.output, &report).map(|_| ());

    match (report.outcome, saved) {
        (Ok(()), Ok(())) => Ok(SUCCESS),
        (Ok(()), Err(err)) => Err(persist_error("saving captures failed", err)),
        (Err(err), saved) => {
            if let Err(save_err) = saved {
                tracing::error!(error = %save_err, "saving captures failed");
            }
            Err(session_error("session failed", err))
        }
    }
}

/// Write the captures once streaming was reached, however the session ended.
/// Returns whether a file was written.
fn save_report(path: &Path, report: &SessionReport) -> persist::Result<bool> {
    if !report.reached_streaming {
        return Ok(false);
    }
    write_captures(path, &report.captures)?;
    Ok(true)
}

fn session_config(args: &StreamArgs) -> CliResult<SessionConfig> {
    let baud_rate = BaudRate::from_bits_per_second(args.baud).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!(
                "unsupported baud rate {} (expected 115200, 460800, 921600 or 2000000)",
                args.baud
            ),
        )
    })?;
    let pace = args
        .pace
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .unwrap_or_default();

    if args.count == Some(0) {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    if args.max_missed == Some(0) {
        return Err(CliError::new(USAGE, "--max-missed must be greater than zero"));
    }

    Ok(SessionConfig {
        baud_rate,
        max_speed: args.max_speed.into(),
        max_range: args.max_range.into(),
        pace,
        max_cycles: args.count,
        max_consecutive_misses: args.max_missed,
        ..SessionConfig::default()
    })
}

fn install_ctrlc_handler(cancel: Cancellation) -> CliResult<()> {
    ctrlc::set_handler(move || cancel.cancel()).map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use kld7_frame::{RawTarget, Target};
    use kld7_session::{Capture, MaxRange, MaxSpeed, SessionError, SessionState, SessionStats};

    use super::*;
    use crate::cmd::{RangeArg, SpeedArg};
    use crate::persist::load_captures;

    fn temp_csv(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "kld7-stream-{tag}-{}-{}.csv",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ))
    }

    fn failed_report(reached_streaming: bool) -> SessionReport {
        let target = Target::from_raw(RawTarget {
            distance: 150,
            speed: -80,
            angle: 0,
            magnitude: 12,
        });
        SessionReport {
            final_state: SessionState::Disconnected,
            outcome: Err(SessionError::MissedCycleLimit { count: 3 }),
            captures: vec![Capture::at(10.0, target), Capture::at(10.5, target)],
            reached_streaming,
            stats: SessionStats {
                cycles: 5,
                targets: 2,
                misses: 3,
                consecutive_misses: 3,
            },
        }
    }

    fn args() -> StreamArgs {
        StreamArgs {
            port: "/dev/ttyUSB0".to_string(),
            output: PathBuf::from("out.csv"),
            max_speed: SpeedArg::Kmh25,
            max_range: RangeArg::M10,
            baud: 2_000_000,
            timeout: "2s".to_string(),
            pace: None,
            count: None,
            max_missed: None,
        }
    }

    #[test]
    fn failed_session_still_saves_captures() {
        let path = temp_csv("failed");
        let report = failed_report(true);

        assert!(save_report(&path, &report).unwrap());
        assert!(report.outcome.is_err());
        let saved = load_captures(&path).unwrap();
        assert_eq!(saved, report.captures);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn nothing_saved_before_streaming() {
        let path = temp_csv("never-streamed");

        assert!(!save_report(&path, &failed_report(false)).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn defaults_match_device_defaults() {
        let config = session_config(&args()).unwrap();
        assert_eq!(config.baud_rate, BaudRate::B2000000);
        assert_eq!(config.max_speed, MaxSpeed::Kmh25);
        assert_eq!(config.max_range, MaxRange::M10);
        assert_eq!(config.pace, Duration::ZERO);
        assert_eq!(config.max_cycles, None);
    }

    #[test]
    fn options_flow_into_config() {
        let config = session_config(&StreamArgs {
            baud: 921_600,
            max_speed: SpeedArg::Kmh100,
            max_range: RangeArg::M30,
            pace: Some("20ms".to_string()),
            count: Some(50),
            max_missed: Some(5),
            ..args()
        })
        .unwrap();
        assert_eq!(config.baud_rate, BaudRate::B921600);
        assert_eq!(config.max_speed, MaxSpeed::Kmh100);
        assert_eq!(config.max_range, MaxRange::M30);
        assert_eq!(config.pace, Duration::from_millis(20));
        assert_eq!(config.max_cycles, Some(50));
        assert_eq!(config.max_consecutive_misses, Some(5));
    }

    #[test]
    fn unsupported_baud_is_a_usage_error() {
        let err = session_config(&StreamArgs {
            baud: 9_600,
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert!(session_config(&StreamArgs {
            count: Some(0),
            ..args()
        })
        .is_err());
        assert!(session_config(&StreamArgs {
            max_missed: Some(0),
            ..args()
        })
        .is_err());
    }
}
