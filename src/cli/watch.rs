use std::path::Path;
use std::sync::Arc;

use owo_colors::OwoColorize;
use tokio::signal;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::sync::CountSynchronizer;

/// Run the synchronizer in the foreground until Ctrl-C.
pub async fn execute_watch<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    config.logging.init();

    let table = config.sync.table.clone();
    let transport = Arc::new(config.transport());
    let synchronizer = CountSynchronizer::new(transport, config.sync_config());

    println!("Watching {}...", table.bold());

    let printed_table = table.clone();
    let mut handle = synchronizer.start(move |count| {
        println!("{} {}: {}", "●".green(), printed_table, count.bold());
    });

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.stop();

    Ok(())
}
