//! Machines exposed to the protocol server.
//!
//! A machine describes the variables and methods it offers, publishes field
//! changes to subscribers, and executes method calls. [`Bhx`] is the only
//! machine today.

pub mod bhx;
pub mod mes;
pub mod state;

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::events::Listener;

pub use bhx::Bhx;
pub use mes::MesExporter;
pub use state::MachineState;

/// Value type of a server-visible variable or method argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    String,
    Int,
    Boolean,
}

impl VarType {
    /// Value a variable holds before the first update.
    pub fn default_value(self) -> Variant {
        match self {
            VarType::String => Variant::String(String::new()),
            VarType::Int => Variant::Int(-1),
            VarType::Boolean => Variant::Boolean(false),
        }
    }
}

/// A typed value crossing the server boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    String(String),
    Int(i64),
    Boolean(bool),
}

impl Variant {
    pub fn var_type(&self) -> VarType {
        match self {
            Variant::String(_) => VarType::String,
            Variant::Int(_) => VarType::Int,
            Variant::Boolean(_) => VarType::Boolean,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::String(s) => f.write_str(s),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A variable the server should expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDesc {
    pub name: &'static str,
    pub var_type: VarType,
}

impl VarDesc {
    pub const fn new(name: &'static str, var_type: VarType) -> Self {
        Self { name, var_type }
    }
}

/// A remotely invocable method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDesc {
    pub name: &'static str,
    pub args: &'static [(&'static str, VarType)],
    pub returns: VarType,
}

/// What the protocol server needs from a machine.
pub trait Machine: Send + Sync {
    fn name(&self) -> &str;

    fn variables(&self) -> &[VarDesc];

    fn methods(&self) -> &[MethodDesc];

    /// Receive `(field name, value)` events as the machine state changes.
    fn subscribe(&self, listener: Arc<dyn Listener<str>>) -> bool;

    fn unsubscribe(&self, listener: &Arc<dyn Listener<str>>) -> bool;

    /// Execute `method`. Arguments have already been checked against the
    /// method's descriptor.
    fn call(&self, method: &str, args: &[Variant]) -> Result<Variant, Error>;
}
