//! `BARCODE:<padded program name>$` messages.

use crate::error::Error;

const PREFIX: &str = "BARCODE:";
const SUFFIX: &str = "$";

/// Build the load command for `program_name`, right-aligned in a field of
/// `field_width` characters.
///
/// Names longer than the field are rejected rather than truncated.
pub fn encode(program_name: &str, field_width: usize) -> Result<Vec<u8>, Error> {
    let len = program_name.chars().count();
    if len > field_width {
        return Err(Error::LengthExceeded {
            len,
            width: field_width,
        });
    }
    Ok(format!("{PREFIX}{program_name:>field_width$}{SUFFIX}").into_bytes())
}
