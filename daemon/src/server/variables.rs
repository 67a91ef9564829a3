//! Server-visible variables mirrored from field events.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::Error;
use crate::events::Listener;
use crate::machine::{VarDesc, VarType, Variant};

/// Named, typed variables, initialised to their type's default.
pub struct VariableTable {
    types: BTreeMap<&'static str, VarType>,
    values: Mutex<BTreeMap<&'static str, Variant>>,
}

impl VariableTable {
    pub fn new(descs: &[VarDesc]) -> Self {
        let types: BTreeMap<_, _> = descs.iter().map(|d| (d.name, d.var_type)).collect();
        let values = types.iter().map(|(n, t)| (*n, t.default_value())).collect();
        Self {
            types,
            values: Mutex::new(values),
        }
    }

    pub fn get(&self, name: &str) -> Option<Variant> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, Variant> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn convert(var_type: VarType, value: &str) -> Option<Variant> {
        match var_type {
            VarType::String => Some(Variant::String(value.to_string())),
            VarType::Int => value.trim().parse().ok().map(Variant::Int),
            VarType::Boolean => value.trim().parse().ok().map(Variant::Boolean),
        }
    }
}

impl Listener<str> for VariableTable {
    fn on_event(&self, name: &str, value: &str) -> Result<(), Error> {
        let Some((key, var_type)) = self.types.get_key_value(name) else {
            return Ok(());
        };
        let Some(variant) = Self::convert(*var_type, value) else {
            warn!(variable = name, value, "Value doesn't fit variable type, keeping old value");
            return Ok(());
        };

        debug!(variable = name, value, "Updated variable");
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*key, variant);
        Ok(())
    }
}
