//! Reading the tail of the machine log.

use std::fs;
use std::path::Path;

use crate::error::Error;

/// Last line of `content` that isn't blank.
pub fn last_line(content: &str) -> Option<&str> {
    content.lines().rev().find(|l| !l.trim().is_empty())
}

/// Read `path` and return its last non-blank line.
///
/// The machine writes its log in the local code page, so bytes that aren't
/// UTF-8 are replaced instead of failing the whole read.
pub fn read_last_line(path: &Path) -> Result<Option<String>, Error> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(last_line(&content).map(str::to_string))
}
