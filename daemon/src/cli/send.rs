//! Ask the machine to load a program.

use crate::config::BridgeConfig;
use crate::error::Error;
use crate::machine::bhx::SEND_PROGRAM;
use crate::machine::{Bhx, Variant};
use crate::server;

/// Send one program-load command. Returns whether it was delivered.
pub fn run(config: &BridgeConfig, program_name: &str) -> Result<bool, Error> {
    let bhx = Bhx::from_config(config);
    let result = server::invoke(
        &bhx,
        SEND_PROGRAM,
        &[Variant::String(program_name.to_string())],
    )?;

    let sent = matches!(result, Variant::Boolean(true));
    if sent {
        println!("Sent {} to {}:{}", program_name, config.general.ip_address, config.general.port);
    } else {
        println!(
            "Could not reach {}:{}",
            config.general.ip_address, config.general.port
        );
    }
    Ok(sent)
}
