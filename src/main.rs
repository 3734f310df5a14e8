// src/main.rs - kettle-host entry point
use clap::{Parser, Subcommand};
use kettle_rs::config::{self, Config};
use kettle_rs::KettleHost;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "kettle-host", version, about = "Hysteresis control for multi-phase kettle heaters.")]
struct Cli {
    /// Override the configured log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start every configured kettle and run until Ctrl-C
    Run {
        #[arg(short, long, default_value = "kettle.toml")]
        config: PathBuf,
    },
    /// Validate a configuration file and print a summary
    Check {
        #[arg(short, long, default_value = "kettle.toml")]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> &PathBuf {
        match self {
            Command::Run { config } | Command::Check { config } => config,
        }
    }
}

fn init_logging(level: &str) {
    let parsed = tracing::Level::from_str(level);
    let max_level = parsed.as_ref().copied().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(max_level).init();
    if let Err(e) = parsed {
        tracing::warn!("Log level '{}' not understood ({}), using {}", level, e, max_level);
    }
}

fn print_summary(config: &Config) {
    println!("Configuration OK");
    for heater in &config.heaters {
        println!(
            "  heater '{}': channels {:?} ({}) under {}",
            heater.id,
            heater.channels,
            heater.polarity,
            heater.gpio_root.display()
        );
    }
    for kettle in &config.kettles {
        println!(
            "  kettle '{}': heater '{}', target {:.1}°C, tick {} ms, sensor {}",
            kettle.name,
            kettle.heater,
            kettle.target_temp,
            kettle.tick_interval_ms,
            kettle.sensor_path.display()
        );
        for (index, phase) in kettle.phases.iter().enumerate() {
            println!(
                "    phase {}: on at +{:.1}, band down to +{:.1}",
                index + 1,
                phase.on_offset,
                phase.off_offset
            );
        }
    }
}

async fn log_heater_states(host: &KettleHost) {
    let mut ids: Vec<String> = host.registry().ids().map(str::to_string).collect();
    ids.sort();
    for id in ids {
        match host.heater_state(&id).await {
            Ok(state) => tracing::info!(
                "Heater '{}': level {} on={} energized={:?} ({})",
                id,
                state.current_level,
                state.is_on,
                state.energized,
                state.polarity
            ),
            Err(e) => tracing::warn!("Heater '{}': no state: {}", id, e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();
    let config_path = cli.command.config_path().clone();
    let loaded = config::load_config(&config_path);

    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level);

    let config = loaded.map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", config_path.display(), e);
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    match cli.command {
        Command::Check { .. } => {
            print_summary(&config);
            Ok(())
        }
        Command::Run { .. } => {
            tracing::info!("Starting kettle-host {}", env!("CARGO_PKG_VERSION"));
            let mut host = KettleHost::new(config)?;
            host.start()?;

            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Shutdown requested");
            let result = host.shutdown().await;
            log_heater_states(&host).await;
            result?;
            Ok(())
        }
    }
}
