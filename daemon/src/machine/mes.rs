//! MES handoff files.
//!
//! The first record seen for a program opens a cycle. The next record for the
//! same program closes it, and one line is written to
//! `<export dir>/<YYYYMMDDHHMMSS>.txt`:
//!
//! ```text
//! <opening action>,<end ts>,<program>,<program name>,<closing action>,<end ts>
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::Error;
use crate::watcher::LogRecord;

const IN_TIME_FORMAT: &str = "%d.%m.%Y_%H:%M:%S";
const OUT_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
const PROGRAM_EXTENSION: &str = ".mpr";

/// Pairs start/end records per program and writes export files.
#[derive(Debug)]
pub struct MesExporter {
    enabled: bool,
    export_dir: PathBuf,
    pending: HashMap<String, LogRecord>,
}

impl MesExporter {
    pub fn new(enabled: bool, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled,
            export_dir: export_dir.into(),
            pending: HashMap::new(),
        }
    }

    /// Programs with an open cycle.
    pub fn pending(&self) -> impl Iterator<Item = &LogRecord> {
        self.pending.values()
    }

    /// Feed one record. Returns the path of the export file if this record
    /// closed a cycle.
    ///
    /// A closing pair with an unparseable timestamp is dropped from the
    /// pending map and reported as an error.
    pub fn handle(&mut self, record: &LogRecord) -> Result<Option<PathBuf>, Error> {
        if !self.enabled {
            return Ok(None);
        }

        let Some(opening) = self.pending.remove(&record.program) else {
            debug!(program = %record.program, action = %record.action, "Opened MES cycle");
            self.pending.insert(record.program.clone(), record.clone());
            return Ok(None);
        };

        let start = parse_timestamp(&opening)?;
        let end = parse_timestamp(record)?;
        let end_stamp = end.format(OUT_TIME_FORMAT).to_string();

        let fields: [&str; 6] = [
            &opening.action,
            &end_stamp,
            &opening.program,
            program_name(&opening.program),
            &record.action,
            &end_stamp,
        ];
        let line = fields.join(",");

        let path = self.export_dir.join(format!("{end_stamp}.txt"));
        fs::write(&path, format!("{line}\n"))?;

        info!(
            program = %opening.program,
            path = %path.display(),
            duration_secs = (end - start).num_seconds(),
            "Wrote MES file"
        );
        Ok(Some(path))
    }
}

fn parse_timestamp(record: &LogRecord) -> Result<NaiveDateTime, Error> {
    let value = format!("{}_{}", record.log_date, record.log_time);
    NaiveDateTime::parse_from_str(&value, IN_TIME_FORMAT)
        .map_err(|source| Error::Timestamp { value, source })
}

/// `C:\progs\job1.mpr` -> `job1`.
fn program_name(program: &str) -> &str {
    let base = program.rsplit(['\\', '/']).next().unwrap_or(program);
    base.strip_suffix(PROGRAM_EXTENSION).unwrap_or(base)
}
