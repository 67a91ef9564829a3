//! Last-known machine field values and their fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::error::Error;
use crate::events::{Listener, Publisher};
use crate::machine::MesExporter;
use crate::watcher::{Field, LogRecord, MACHINE_LOG};

/// Holds the latest value of every log field.
///
/// On each `machine_log` event the six fields are stored and republished one
/// at a time in [`Field::ALL`] order, then the record goes to the MES
/// exporter. Subscribers that read several fields mid-sequence can see a mix
/// of old and new values until the last field has been published.
pub struct MachineState {
    fields: Mutex<HashMap<Field, String>>,
    publisher: Publisher<str>,
    mes: Mutex<MesExporter>,
}

impl MachineState {
    pub fn new(mes: MesExporter) -> Self {
        Self {
            fields: Mutex::new(HashMap::new()),
            publisher: Publisher::new(),
            mes: Mutex::new(mes),
        }
    }

    /// Last value stored for `field`, if any record has arrived yet.
    pub fn get(&self, field: Field) -> Option<String> {
        self.fields
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&field)
            .cloned()
    }

    pub fn subscribe(&self, listener: Arc<dyn Listener<str>>) -> bool {
        self.publisher.subscribe(listener)
    }

    pub fn unsubscribe(&self, listener: &Arc<dyn Listener<str>>) -> bool {
        self.publisher.unsubscribe(listener)
    }

    /// Number of programs with an open MES cycle.
    pub fn pending_mes_entries(&self) -> usize {
        self.mes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending()
            .count()
    }

    fn apply(&self, record: &LogRecord) -> Result<(), Error> {
        for event in record.field_events() {
            self.fields
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(event.name, event.value.clone());
            self.publisher.notify(event.name.as_str(), &event.value)?;
        }

        let mut mes = self.mes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = mes.handle(record) {
            warn!(program = %record.program, error = %e, "MES export failed");
        }
        Ok(())
    }
}

impl Listener<LogRecord> for MachineState {
    fn on_event(&self, name: &str, record: &LogRecord) -> Result<(), Error> {
        if name != MACHINE_LOG {
            return Ok(());
        }
        self.apply(record)
    }
}
