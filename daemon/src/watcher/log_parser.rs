//! BHX log line parsing.
//!
//! One record per line, six comma-separated fields:
//! `log_date,log_time,action,first_number,program,second_number`, e.g.
//! `01.01.2024,08:00:00, START ,12,C:\progs\job1.mpr,0`.

use std::fmt;

use crate::error::Error;

/// Event name carried by a freshly parsed record.
pub const MACHINE_LOG: &str = "machine_log";

const FIELD_COUNT: usize = 6;

/// One field of a [`LogRecord`], in publication order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    LogDate,
    LogTime,
    Action,
    FirstNumber,
    Program,
    SecondNumber,
}

impl Field {
    /// Every field, in the order they are republished.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::LogDate,
        Field::LogTime,
        Field::Action,
        Field::FirstNumber,
        Field::Program,
        Field::SecondNumber,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::LogDate => "log_date",
            Field::LogTime => "log_time",
            Field::Action => "action",
            Field::FirstNumber => "first_number",
            Field::Program => "program",
            Field::SecondNumber => "second_number",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single published field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEvent {
    pub name: Field,
    pub value: String,
}

/// One parsed machine log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub log_date: String,
    pub log_time: String,
    pub action: String,
    pub first_number: String,
    /// Program path; correlates start and end records.
    pub program: String,
    pub second_number: String,
}

impl LogRecord {
    /// The record as six field events, in publication order.
    pub fn field_events(&self) -> impl Iterator<Item = FieldEvent> + '_ {
        Field::ALL.into_iter().map(|name| FieldEvent {
            name,
            value: self.get(name).to_string(),
        })
    }

    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::LogDate => &self.log_date,
            Field::LogTime => &self.log_time,
            Field::Action => &self.action,
            Field::FirstNumber => &self.first_number,
            Field::Program => &self.program,
            Field::SecondNumber => &self.second_number,
        }
    }
}

/// Parse one raw log line.
///
/// Only `action` is trimmed; every other field is kept verbatim.
pub fn parse_line(line: &str) -> Result<LogRecord, Error> {
    let parts: Vec<&str> = line.split(',').collect();
    let &[log_date, log_time, action, first_number, program, second_number] = parts.as_slice() else {
        return Err(Error::MalformedRecord {
            line: line.to_string(),
            fields: parts.len(),
        });
    };

    Ok(LogRecord {
        log_date: log_date.to_string(),
        log_time: log_time.to_string(),
        action: action.trim().to_string(),
        first_number: first_number.to_string(),
        program: program.to_string(),
        second_number: second_number.to_string(),
    })
}
