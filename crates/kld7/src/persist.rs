//! CSV storage for captured samples.
//!
//! One row per capture, columns in this order:
//!
//! ```text
//! Timestamp,Distance_cm,Speed_kmh,Angle_deg,Magnitude,x_cm,y_cm
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use kld7_frame::Target;
use kld7_session::Capture;

/// Column names written as the first row.
pub const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "Distance_cm",
    "Speed_kmh",
    "Angle_deg",
    "Magnitude",
    "x_cm",
    "y_cm",
];

/// Default file name for `stream --output`.
pub const DEFAULT_CAPTURE_FILE: &str = "measured_data.csv";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("capture file {} not found", .0.display())]
    Missing(PathBuf),

    #[error("capture file {} has no samples", .0.display())]
    Empty(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: invalid {column} value {value:?}", path.display())]
    InvalidRow {
        path: PathBuf,
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistError>;

/// Write captures to `path`, replacing any existing file. Parent
/// directories are created as needed.
pub fn write_captures(path: &Path, captures: &[Capture]) -> Result<()> {
    let write_err = |source: csv::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|err| write_err(err.into()))?;
        }
    }

    let file = File::create(path).map_err(|err| write_err(err.into()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    writer.write_record(CSV_HEADER).map_err(write_err)?;

    for capture in captures {
        let target = &capture.target;
        // `{:?}` keeps the `.0` on whole numbers.
        writer
            .write_record([
                format!("{:?}", capture.timestamp),
                format!("{:?}", target.distance_cm),
                format!("{:?}", target.speed_kmh),
                format!("{:?}", target.angle_deg),
                format!("{:?}", target.magnitude),
                format!("{:?}", target.x_cm),
                format!("{:?}", target.y_cm),
            ])
            .map_err(write_err)?;
    }

    writer.flush().map_err(|err| write_err(err.into()))?;
    tracing::info!(path = %path.display(), rows = captures.len(), "captures saved");
    Ok(())
}

/// Read captures back from a file written by [`write_captures`].
///
/// Columns are located by header name. A missing file and a file without
/// data rows are reported as distinct errors.
pub fn load_captures(path: &Path) -> Result<Vec<Capture>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(PersistError::Missing(path.to_path_buf()))
        }
        Err(err) => {
            return Err(PersistError::Read {
                path: path.to_path_buf(),
                source: err.into(),
            })
        }
    };

    let read_err = |source: csv::Error| PersistError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = reader.headers().map_err(read_err)?.clone();
    if headers.is_empty() {
        return Err(PersistError::Empty(path.to_path_buf()));
    }
    let mut columns = [0usize; CSV_HEADER.len()];
    for (slot, name) in columns.iter_mut().zip(CSV_HEADER) {
        *slot = headers
            .iter()
            .position(|header| header.trim() == name)
            .ok_or_else(|| PersistError::InvalidRow {
                path: path.to_path_buf(),
                line: 1,
                column: name,
                value: String::from("<missing column>"),
            })?;
    }

    let mut captures = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        let line = record.position().map_or(0, |pos| pos.line());

        let mut values = [0f64; CSV_HEADER.len()];
        for ((value, &index), name) in values.iter_mut().zip(&columns).zip(CSV_HEADER) {
            let raw = record.get(index).unwrap_or_default().trim();
            *value = raw.parse().map_err(|_| PersistError::InvalidRow {
                path: path.to_path_buf(),
                line,
                column: name,
                value: raw.to_string(),
            })?;
        }

        let [timestamp, distance_cm, speed_kmh, angle_deg, magnitude, x_cm, y_cm] = values;
        captures.push(Capture::at(
            timestamp,
            Target {
                distance_cm,
                speed_kmh,
                angle_deg,
                magnitude,
                x_cm,
                y_cm,
            },
        ));
    }

    if captures.is_empty() {
        return Err(PersistError::Empty(path.to_path_buf()));
    }
    Ok(captures)
}

#[cfg(test)]
mod tests {
    use kld7_frame::RawTarget;

    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "kld7-persist-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ))
    }

    fn capture(timestamp: f64, distance: u16) -> Capture {
        Capture::at(
            timestamp,
            Target::from_raw(RawTarget {
                distance,
                speed: -50,
                angle: 100,
                magnitude: 10,
            }),
        )
    }

    #[test]
    fn header_and_rows_on_disk() {
        let dir = temp_path("rows");
        let path = dir.join("nested").join("measured.csv");
        write_captures(&path, &[capture(1_700_000_000.5, 100)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Timestamp,Distance_cm,Speed_kmh,Angle_deg,Magnitude,x_cm,y_cm")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1700000000.5,100.0,-0.5,1.0,10.0,"));
        assert!(lines.next().is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_reads_back_what_was_written() {
        let path = temp_path("load");
        let written = vec![capture(10.0, 100), capture(10.25, 140)];
        write_captures(&path, &written).unwrap();

        let loaded = load_captures(&path).unwrap();
        assert_eq!(loaded, written);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_and_empty_are_distinct() {
        let missing = temp_path("missing");
        assert!(matches!(
            load_captures(&missing),
            Err(PersistError::Missing(_))
        ));

        let header_only = temp_path("header-only");
        write_captures(&header_only, &[]).unwrap();
        assert!(matches!(
            load_captures(&header_only),
            Err(PersistError::Empty(_))
        ));

        let blank = temp_path("blank");
        fs::write(&blank, "").unwrap();
        assert!(matches!(load_captures(&blank), Err(PersistError::Empty(_))));

        let _ = fs::remove_file(&header_only);
        let _ = fs::remove_file(&blank);
    }

    #[test]
    fn bad_value_names_line_and_column() {
        let path = temp_path("bad");
        fs::write(
            &path,
            "Timestamp,Distance_cm,Speed_kmh,Angle_deg,Magnitude,x_cm,y_cm\n1.0,abc,0,0,0,0,0\n",
        )
        .unwrap();

        let err = load_captures(&path).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidRow {
                line: 2,
                column: "Distance_cm",
                ..
            }
        ));

        let _ = fs::remove_file(&path);
    }
}
