//! Run the bridge until interrupted.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::error::Error;
use crate::machine::{Bhx, Machine};
use crate::server::VariableTable;
use crate::watcher::{Field, LogFileWatcher};

/// Start the log watcher and keep the server variables current until Ctrl-C.
pub async fn run(config: BridgeConfig) -> Result<(), Error> {
    if !config.machine.bhx {
        warn!("No machine enabled in config, nothing to do");
        return Ok(());
    }

    let bhx = Bhx::from_config(&config);
    let variables = Arc::new(VariableTable::new(bhx.variables()));
    bhx.subscribe(variables.clone());

    let watcher = LogFileWatcher::new(
        config.general.bhx_logfolder.clone(),
        config.general.bhx_logfile.clone(),
    )
    .with_poll_interval(config.watcher.poll_interval());
    watcher.subscribe(bhx.state());

    let cancel = CancellationToken::new();
    let handle = watcher.spawn(cancel.clone())?;

    info!(
        machine = bhx.name(),
        server = %format!("{}:{}", config.server.ip_address, config.server.port),
        mes = config.mes_files.write_mes_files,
        "Bridge running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    cancel.cancel();

    let joined = tokio::task::spawn_blocking(move || handle.join()).await;
    if !matches!(joined, Ok(Ok(()))) {
        warn!("Log watcher did not shut down cleanly");
    }

    let state = bhx.state();
    info!(
        last_program = state.get(Field::Program).as_deref().unwrap_or("-"),
        open_mes_cycles = state.pending_mes_entries(),
        variables = ?variables.snapshot(),
        "Final machine state"
    );
    Ok(())
}
