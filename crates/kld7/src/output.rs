use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kld7_session::{Capture, SessionState, SessionStats};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn direction(capture: &Capture) -> &'static str {
    if capture.target.is_receding() {
        "receding"
    } else {
        "approaching"
    }
}

/// Print one live capture. JSON output is one object per line.
pub fn print_capture(capture: &Capture, format: OutputFormat) {
    let target = &capture.target;
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(capture).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "DISTANCE (cm)",
                    "SPEED (km/h)",
                    "ANGLE (deg)",
                    "MAGNITUDE",
                    "X (cm)",
                    "Y (cm)",
                ])
                .add_row(vec![
                    format!("{:.0}", target.distance_cm),
                    format!("{:+.2}", target.speed_kmh),
                    format!("{:+.2}", target.angle_deg),
                    format!("{:.0}", target.magnitude),
                    format!("{:+.1}", target.x_cm),
                    format!("{:.1}", target.y_cm),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "distance={:.0}cm speed={:+.2}km/h angle={:+.2}deg magnitude={:.0} x={:+.1}cm y={:.1}cm ({})",
                target.distance_cm,
                target.speed_kmh,
                target.angle_deg,
                target.magnitude,
                target.x_cm,
                target.y_cm,
                direction(capture)
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionEnd<'a> {
    final_state: String,
    #[serde(flatten)]
    stats: &'a SessionStats,
}

/// Print the counters of a finished session. JSON output ends the capture
/// stream with one more line.
pub fn print_session_stats(final_state: SessionState, stats: &SessionStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let end = SessionEnd {
                final_state: final_state.to_string(),
                stats,
            };
            println!(
                "{}",
                serde_json::to_string(&end).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["STATE", "CYCLES", "TARGETS", "MISSES"])
                .add_row(vec![
                    final_state.to_string(),
                    stats.cycles.to_string(),
                    stats.targets.to_string(),
                    stats.misses.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "session {final_state}: cycles={} targets={} misses={}",
                stats.cycles, stats.targets, stats.misses
            );
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    pub time_s: f64,
    pub distance_cm: f64,
    pub speed_kmh: f64,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub samples: usize,
    pub duration_s: f64,
    pub min_distance_cm: f64,
    pub max_distance_cm: f64,
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    /// Distance and speed over time, relative to the first capture.
    pub fn from_captures(captures: &[Capture]) -> Self {
        let start = captures.first().map_or(0.0, |capture| capture.timestamp);
        let rows: Vec<SummaryRow> = captures
            .iter()
            .map(|capture| SummaryRow {
                time_s: capture.timestamp - start,
                distance_cm: capture.target.distance_cm,
                speed_kmh: capture.target.speed_kmh,
            })
            .collect();

        let distances = rows.iter().map(|row| row.distance_cm);
        Self {
            samples: rows.len(),
            duration_s: rows.last().map_or(0.0, |row| row.time_s),
            min_distance_cm: distances.clone().fold(f64::INFINITY, f64::min),
            max_distance_cm: distances.fold(f64::NEG_INFINITY, f64::max),
            rows,
        }
    }
}

pub fn print_summary(summary: &Summary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TIME (s)", "DISTANCE (cm)", "SPEED (km/h)"]);
            for row in &summary.rows {
                table.add_row(vec![
                    format!("{:.3}", row.time_s),
                    format!("{:.0}", row.distance_cm),
                    format!("{:+.2}", row.speed_kmh),
                ]);
            }
            println!("{table}");
            println!(
                "{} samples over {:.3} s, distance {:.0}..{:.0} cm",
                summary.samples, summary.duration_s, summary.min_distance_cm, summary.max_distance_cm
            );
        }
        OutputFormat::Pretty => {
            for row in &summary.rows {
                println!(
                    "t={:.3}s distance={:.0}cm speed={:+.2}km/h",
                    row.time_s, row.distance_cm, row.speed_kmh
                );
            }
            println!(
                "samples={} duration={:.3}s",
                summary.samples, summary.duration_s
            );
        }
    }
}
