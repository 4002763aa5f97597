use std::path::Path;

use owo_colors::OwoColorize;

use crate::config::Config;
use crate::error::Result;
use crate::transport::Transport;

/// Run one count-only query and print the result.
pub async fn execute_count<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    config.logging.init();

    let filter = config.filter();
    let transport = config.transport();
    let count = transport
        .count_rows(&config.sync.table, filter.as_ref())
        .await?;

    match filter {
        Some(filter) => println!(
            "{} rows in {} where {}",
            count.bold(),
            config.sync.table,
            filter
        ),
        None => println!("{} rows in {}", count.bold(), config.sync.table),
    }

    Ok(())
}
