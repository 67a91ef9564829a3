//! Machine log watching and parsing.

pub mod change_detector;
pub mod file_watcher;
pub mod log_parser;
pub mod tail;

pub use change_detector::ChangeDetector;
pub use file_watcher::LogFileWatcher;
pub use log_parser::{parse_line, Field, FieldEvent, LogRecord, MACHINE_LOG};
pub use tail::read_last_line;
