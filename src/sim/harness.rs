//! CLI entry point for the simulation harness: runs one configured kettle
//! against a simulated vessel and writes a CSV trace.

use clap::Parser;
use kettle_rs::actuator::PowerActuator;
use kettle_rs::config;
use kettle_rs::controller::{HysteresisController, TickOutcome};
use kettle_rs::hardware::Polarity;
use kettle_rs::notify::{Notifier, TracingNotifier};
use kettle_rs::registry::SharedActuator;
use kettle_rs::sensor::Setpoint;
use kettle_simulator::{SimVessel, TraceRow, TraceWriter, VesselParams};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Simulation Harness CLI
#[derive(Parser, Debug)]
#[command(name = "sim-harness", about = "Closed-loop kettle simulation with CSV output.")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, default_value = "kettle.toml")]
    config: PathBuf,

    /// Kettle to simulate (defaults to the first configured)
    #[arg(short, long)]
    kettle: Option<String>,

    /// Simulated duration in seconds
    #[arg(long, default_value_t = 3600.0)]
    seconds: f64,

    /// Starting vessel temperature (defaults to ambient)
    #[arg(long)]
    start_temp: Option<f64>,

    /// Change the target to TEMP after AT seconds (e.g. --retarget 1800=66.0)
    #[arg(long, value_parser = parse_retarget)]
    retarget: Option<(f64, f64)>,

    /// Heating power per phase in watts
    #[arg(long, default_value_t = 2000.0)]
    watts_per_phase: f64,

    /// Peak-to-peak sensor noise in °C
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// First-order sensor lag coefficient (1/s)
    #[arg(long, default_value_t = 0.0)]
    lag: f64,

    /// CSV trace output
    #[arg(short, long, default_value = "sim_trace.csv")]
    output: PathBuf,
}

fn parse_retarget(s: &str) -> Result<(f64, f64), String> {
    let (at, temp) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid AT=TEMP: no `=` found in '{}'.", s))?;
    let at = at.trim().parse().map_err(|_| format!("Invalid time '{}'", at))?;
    let temp = temp.trim().parse().map_err(|_| format!("Invalid temperature '{}'", temp))?;
    Ok((at, temp))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    tracing_subscriber::fmt()
        .with_max_level(config.logging.level.parse().unwrap_or(tracing::Level::INFO))
        .init();

    let kettle = match &cli.kettle {
        Some(name) => config.kettle(name).ok_or_else(|| format!("Unknown kettle '{}'", name))?,
        None => config.kettles.first().ok_or("No kettles configured")?,
    };
    let heater = config
        .heater(&kettle.heater)
        .ok_or_else(|| format!("Unknown heater '{}'", kettle.heater))?;

    let params = VesselParams {
        watts_per_phase: cli.watts_per_phase,
        sensor_noise: cli.noise,
        sensor_lag: cli.lag,
        ..VesselParams::default()
    };
    let start_temp = cli.start_temp.unwrap_or(params.ambient_temp);
    let vessel = SimVessel::new(params, start_temp, &heater.channels, heater.polarity == Polarity::Low);

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let mut actuator = PowerActuator::new(
        heater.id.clone(),
        &heater.channels,
        heater.polarity,
        Box::new(vessel.clone()),
        notifier.clone(),
    )?;
    actuator.init();
    let actuator: SharedActuator = Arc::new(Mutex::new(actuator));

    let setpoint = Setpoint::new(kettle.target_temp);
    let mut controller = HysteresisController::new(
        kettle.name.clone(),
        kettle.thresholds()?,
        actuator.clone(),
        vessel.clone(),
        setpoint.clone(),
    )
    .with_tick_interval(kettle.tick_interval())?
    .with_notifier(notifier);

    let dt = kettle.tick_interval().as_secs_f64();
    let steps = (cli.seconds / dt).ceil() as u64;
    let mut trace = TraceWriter::create(&cli.output)?;
    tracing::info!(
        "Simulating kettle '{}' for {:.0} s ({} ticks of {:.3} s)",
        kettle.name,
        cli.seconds,
        steps,
        dt
    );

    for _ in 0..steps {
        if let Some((at, temp)) = cli.retarget {
            if vessel.elapsed_s() >= at && setpoint.get() != temp {
                setpoint.set(temp);
            }
        }

        let (measured_temp, fail_safe) = match controller.tick().await {
            TickOutcome::Applied(report) => (report.state.measured_temp, false),
            TickOutcome::FailSafe { .. } => (vessel.temperature(), true),
            TickOutcome::Stopped => break,
        };
        let level = actuator.lock().await.current_level();
        trace.write(&TraceRow {
            time_s: vessel.elapsed_s(),
            measured_temp,
            target_temp: setpoint.get(),
            active_phases: vessel.energized_phases(),
            power_percent: level.percent(),
            fail_safe,
        })?;
        vessel.step(dt);
    }

    controller.stop().await;
    let rows = trace.rows();
    trace.finish()?;
    tracing::info!(
        "Wrote {} rows to {}; final temperature {:.2}°C",
        rows,
        cli.output.display(),
        vessel.temperature()
    );
    Ok(())
}
