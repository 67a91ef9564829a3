//! Show the bridge configuration and the machine's last log record.

use std::path::Path;

use crate::config::BridgeConfig;
use crate::error::Error;
use crate::watcher::{parse_line, read_last_line, Field, LogRecord};

/// Exit codes for status command.
pub mod exit_code {
    pub const OK: i32 = 0;
    pub const LOG_MISSING: i32 = 1;
    pub const LOG_MALFORMED: i32 = 2;
}

/// Run the status command.
pub fn run(config: &BridgeConfig) -> Result<i32, Error> {
    let general = &config.general;
    let log_path = general.logfile_path();

    println!("BHX Bridge Status");
    println!("  Machine: {}:{}", general.ip_address, general.port);
    println!(
        "  Server: {}:{}",
        config.server.ip_address, config.server.port
    );
    println!("  Command field width: {}", general.tcp_string_length);
    if config.mes_files.write_mes_files {
        println!(
            "  MES export: {}",
            config.mes_files.mes_input_folder.display()
        );
    } else {
        println!("  MES export: disabled");
    }
    println!("  Log file: {}", log_path.display());

    if !log_path.exists() {
        println!();
        println!("Log file not found. Check general.bhx_logfolder and general.bhx_logfile.");
        return Ok(exit_code::LOG_MISSING);
    }

    match last_record(&log_path)? {
        None => println!("  Last record: (log is empty)"),
        Some(Ok(record)) => print_record(&record),
        Some(Err(e)) => {
            println!("  Last record: unreadable ({})", e);
            return Ok(exit_code::LOG_MALFORMED);
        }
    }

    Ok(exit_code::OK)
}

/// Parse the last non-empty line of the log, if there is one.
fn last_record(path: &Path) -> Result<Option<Result<LogRecord, Error>>, Error> {
    Ok(read_last_line(path)?.map(|line| parse_line(&line)))
}

fn print_record(record: &LogRecord) {
    println!("  Last record:");
    for field in Field::ALL {
        println!("    {}: {}", field, record.get(field));
    }
}
