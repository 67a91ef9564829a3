//! Homag BHX drilling machine.

use std::sync::Arc;

use tracing::info;

use crate::command::{encode, CommandSender};
use crate::config::BridgeConfig;
use crate::error::Error;
use crate::events::Listener;
use crate::machine::{Machine, MachineState, MesExporter, MethodDesc, VarDesc, VarType, Variant};

pub const SEND_PROGRAM: &str = "send_program";

static VARIABLES: [VarDesc; 6] = [
    VarDesc::new("log_date", VarType::String),
    VarDesc::new("log_time", VarType::String),
    VarDesc::new("action", VarType::String),
    VarDesc::new("first_number", VarType::Int),
    VarDesc::new("program", VarType::String),
    VarDesc::new("second_number", VarType::Int),
];

static METHODS: [MethodDesc; 1] = [MethodDesc {
    name: SEND_PROGRAM,
    args: &[("program_name", VarType::String)],
    returns: VarType::Boolean,
}];

/// The BHX: log-driven state plus a program-load command.
pub struct Bhx {
    state: Arc<MachineState>,
    host: String,
    port: u16,
    field_width: usize,
    sender: CommandSender,
}

impl Bhx {
    pub fn new(
        state: Arc<MachineState>,
        host: impl Into<String>,
        port: u16,
        field_width: usize,
        sender: CommandSender,
    ) -> Self {
        Self {
            state,
            host: host.into(),
            port,
            field_width,
            sender,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        let general = &config.general;
        let mes = MesExporter::new(
            config.mes_files.write_mes_files,
            config.mes_files.mes_input_folder.clone(),
        );
        Self::new(
            Arc::new(MachineState::new(mes)),
            general.ip_address.clone(),
            general.port,
            general.tcp_string_length,
            CommandSender::new(general.connect_timeout(), general.write_timeout()),
        )
    }

    /// The state the log watcher feeds.
    pub fn state(&self) -> Arc<MachineState> {
        Arc::clone(&self.state)
    }

    /// Ask the machine to load `program_name`.
    ///
    /// A name that doesn't fit the command field is an error; a delivery
    /// failure is `Ok(false)`.
    pub fn send_program(&self, program_name: &str) -> Result<bool, Error> {
        let message = encode(program_name, self.field_width)?;
        let sent = self.sender.send(&self.host, self.port, &message);
        if sent {
            info!(program = program_name, "Requested program load");
        }
        Ok(sent)
    }
}

impl Machine for Bhx {
    fn name(&self) -> &str {
        "BHX"
    }

    fn variables(&self) -> &[VarDesc] {
        &VARIABLES
    }

    fn methods(&self) -> &[MethodDesc] {
        &METHODS
    }

    fn subscribe(&self, listener: Arc<dyn Listener<str>>) -> bool {
        self.state.subscribe(listener)
    }

    fn unsubscribe(&self, listener: &Arc<dyn Listener<str>>) -> bool {
        self.state.unsubscribe(listener)
    }

    fn call(&self, method: &str, args: &[Variant]) -> Result<Variant, Error> {
        match (method, args) {
            (SEND_PROGRAM, [Variant::String(program_name)]) => {
                self.send_program(program_name).map(Variant::Boolean)
            }
            (SEND_PROGRAM, _) => Err(Error::BadArguments {
                method: method.to_string(),
                reason: "expected one string argument".to_string(),
            }),
            _ => Err(Error::UnknownMethod(method.to_string())),
        }
    }
}
