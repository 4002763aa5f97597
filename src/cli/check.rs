use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Validate the configuration file.
pub async fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(&config_path)?;

    println!("Configuration OK");
    println!("  REST: {}", config.backend.rest_url);
    println!("  Realtime: {}", config.backend.realtime_url);
    println!("  Table: {}", config.sync.table);
    if let Some(filter) = config.filter() {
        println!("  Filter: {filter}");
    }
    println!(
        "  Fallback: {}s grace, {}s poll interval",
        config.sync.grace_period_secs, config.sync.poll_interval_secs
    );

    Ok(())
}

/// Probe REST and websocket connectivity to the backend.
pub async fn execute_connection<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("Testing connection...");
    println!("  REST: {}", config.backend.rest_url);
    println!("  Realtime: {}", config.backend.realtime_url);
    println!();

    print!("Testing count query... ");
    let transport = config.transport();
    match transport
        .count_rows(&config.sync.table, config.filter().as_ref())
        .await
    {
        Ok(count) => println!("✓ OK ({count} rows)"),
        Err(e) => {
            println!("✗ Failed");
            return Err(Error::Connection(e.to_string()));
        }
    }

    print!("Testing websocket... ");
    let ws_url = format!(
        "{}/websocket?apikey={}&vsn=1.0.0",
        config.backend.realtime_url.trim_end_matches('/'),
        config.backend.api_key
    );
    match tokio_tungstenite::connect_async(&ws_url).await {
        Ok((_, _)) => println!("✓ OK"),
        Err(e) => {
            println!("✗ Failed");
            return Err(Error::Connection(e.to_string()));
        }
    }

    println!();
    println!("All connection tests passed.");

    Ok(())
}
