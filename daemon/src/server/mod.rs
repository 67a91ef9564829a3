//! Consumption side of the protocol server.
//!
//! The server itself (endpoint, node tree, sessions) lives outside this
//! crate. What it consumes from us is a table of named, typed variables kept
//! current from field events, and a checked way to invoke machine methods.

mod variables;

pub use variables::VariableTable;

use tracing::{debug, warn};

use crate::error::Error;
use crate::machine::{Machine, Variant};

/// Invoke `method` on `machine` after checking `args` against its descriptor.
pub fn invoke(machine: &dyn Machine, method: &str, args: &[Variant]) -> Result<Variant, Error> {
    let desc = machine
        .methods()
        .iter()
        .find(|m| m.name == method)
        .ok_or_else(|| Error::UnknownMethod(method.to_string()))?;

    if args.len() != desc.args.len() {
        return Err(Error::BadArguments {
            method: method.to_string(),
            reason: format!("expected {} arguments, got {}", desc.args.len(), args.len()),
        });
    }
    for ((name, expected), arg) in desc.args.iter().zip(args) {
        if arg.var_type() != *expected {
            return Err(Error::BadArguments {
                method: method.to_string(),
                reason: format!("{name} must be {expected:?}, got {:?}", arg.var_type()),
            });
        }
    }

    debug!(machine = machine.name(), method, "Invoking method");
    let result = machine.call(method, args);
    match &result {
        Ok(value) => debug!(machine = machine.name(), method, result = %value, "Method returned"),
        Err(e) => warn!(machine = machine.name(), method, error = %e, "Method call failed"),
    }
    result
}
