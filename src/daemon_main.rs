use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use five_pin_lane::config::LaneConfig;
use five_pin_lane::hardware::{BallInput, PulseInput};
use five_pin_lane::logging;
use five_pin_lane::sensor::{BallSensorDaemon, SocketServer};
use five_pin_lane::AppResult;

const LOG_TARGET_STARTUP: &str = "five_pin_lane::startup";

/// Ball sensor daemon: polls the ball-presence input and serves detections
/// on the lane socket.
#[derive(Parser, Debug)]
#[command(name = "ball-sensor-daemon", version, about, long_about = None)]
struct Cli {
    /// Lane configuration file (default: <config_dir>/FivePinLane/lane.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Socket path, overriding the configuration
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Debounce in milliseconds, overriding the configuration
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Simulate a ball every N milliseconds instead of reading GPIO
    #[arg(long)]
    simulate_interval_ms: Option<u64>,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    logging::initialize_tracing("ball-sensor-daemon");
    logging::log_runtime_environment("ball-sensor-daemon");

    let path = match &cli.config {
        Some(path) => path.clone(),
        None => LaneConfig::config_path().context("No configuration directory")?,
    };
    let config = LaneConfig::load_from(&path).with_context(|| format!("Loading {}", path.display()))?;
    let socket = cli.socket.clone().unwrap_or_else(|| config.sensor.socket_path.clone());
    let debounce_ms = cli.debounce_ms.unwrap_or(config.sensor.debounce_ms);

    let input = open_input(&config, cli.simulate_interval_ms)?;
    let server = SocketServer::bind(&socket).with_context(|| format!("Binding {}", socket.display()))?;

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Ball sensor daemon on {} (debounce {} ms)",
        socket.display(),
        debounce_ms
    );

    let mut daemon = BallSensorDaemon::new(input, debounce_ms)
        .with_server(server)
        .with_poll_interval(Duration::from_micros(config.sensor.poll_interval_us));
    daemon.run();
    Ok(())
}

fn open_input(config: &LaneConfig, simulate_interval_ms: Option<u64>) -> AppResult<Box<dyn BallInput>> {
    if let Some(interval) = simulate_interval_ms {
        let period = Duration::from_millis(interval.max(1));
        tracing::info!(target: LOG_TARGET_STARTUP, "Simulating a ball every {period:?}");
        return Ok(Box::new(PulseInput::new(period, period / 10)));
    }
    open_gpio_input(config)
}

#[cfg(feature = "hardware")]
fn open_gpio_input(config: &LaneConfig) -> AppResult<Box<dyn BallInput>> {
    let input = five_pin_lane::hardware::rpi::GpioBallInput::open(config.wiring.ball_sensor_gpio)
        .context("Claiming the ball sensor line")?;
    Ok(Box::new(input))
}

#[cfg(not(feature = "hardware"))]
fn open_gpio_input(_config: &LaneConfig) -> AppResult<Box<dyn BallInput>> {
    Err(five_pin_lane::HardwareError::Unavailable(
        "built without the `hardware` feature, pass --simulate-interval-ms".to_string(),
    ))
    .context("Opening the ball sensor")
}
