use anyhow::{bail, Context};
use clap::Parser;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use five_pin_lane::config::{LaneConfig, SensorTransport};
use five_pin_lane::hardware::{ActuatorBank, AnalogFrontEnd, BallInput, SimBallInput, SimRig};
use five_pin_lane::logging;
use five_pin_lane::machine::{PinMachineController, PinState};
use five_pin_lane::messaging::{EventBus, LaneEvent, SensorMessage};
use five_pin_lane::scoring::{GameSetup, GameStore, ScoringEngine, SessionExtension, SessionMode};
use five_pin_lane::sensor::{
    bridge_channel, spawn_channel_forwarder, Backoff, BallSensorDaemon, BridgeInput, ControlSink, LaneHandle,
    NoControl, SensorBridge, StreamClient, StreamWriter,
};
use five_pin_lane::utils::unix_timestamp;
use five_pin_lane::AppResult;

const LOG_TARGET_STARTUP: &str = "five_pin_lane::startup";

/// Lane controller: pin machine, scoring and the sensor bridge for one lane.
#[derive(Parser, Debug)]
#[command(name = "lane-controller", version, about, long_about = None)]
struct Cli {
    /// Lane configuration file (default: <config_dir>/FivePinLane/lane.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against the simulated rig; type `ball <pattern>` to throw
    #[arg(long)]
    simulate: bool,

    /// Sensor daemon socket path
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Run the ball sensor on a thread of this process instead of the daemon
    #[arg(long)]
    in_process: bool,

    /// Roster for a fresh game, comma separated
    #[arg(long, value_delimiter = ',')]
    bowlers: Vec<String>,

    /// Games in the session
    #[arg(long, conflicts_with = "minutes")]
    games: Option<u32>,

    /// Minutes in a time-boxed session
    #[arg(long)]
    minutes: Option<u32>,

    /// Ignore a saved game and start over
    #[arg(long)]
    fresh: bool,
}

/// Controller hardware plus the simulated rig when simulating.
struct Rig {
    analog: Box<dyn AnalogFrontEnd>,
    actuators: Box<dyn ActuatorBank>,
    sim: Option<SimRig>,
}

/// Where simulated balls come from.
enum BallSource {
    /// Pulses the in-process daemon's simulated sensor
    Sensor(SimBallInput),
    /// Injects detections straight into the bridge queue
    Queue(Sender<BridgeInput>),
}

/// Threads feeding the bridge, stopped after it returns.
struct Feed {
    control: Arc<dyn ControlSink>,
    writer: Option<StreamWriter>,
    ball_source: Option<BallSource>,
    stop: Vec<Arc<std::sync::atomic::AtomicBool>>,
    threads: Vec<JoinHandle<()>>,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    logging::initialize_tracing("lane-controller");
    logging::log_runtime_environment("lane-controller");

    let config = load_config(&cli)?;
    let rig = open_rig(&config, cli.simulate)?;
    let engine = build_engine(&config, &cli)?;

    let controller = PinMachineController::new(rig.analog, rig.actuators, config.machine.clone());
    let (queue_tx, queue_rx) = bridge_channel(config.sensor.channel_capacity);
    let handle = LaneHandle::new(queue_tx.clone(), controller.reset_request());
    let bus = EventBus::new();

    let mut feed = start_feed(&config, cli.simulate, &queue_tx)?;
    feed.threads.push(spawn_event_logger(&bus, feed.writer.clone())?);
    // Blocks on stdin; left detached at shutdown.
    let _console = spawn_console(handle.clone(), rig.sim.clone(), feed.ball_source.take(), cli.simulate)?;
    drop(queue_tx);

    let bridge = SensorBridge::new(controller, engine, Arc::clone(&feed.control), queue_rx, bus)
        .with_tick(Duration::from_millis(config.tick_ms));
    let bridge = bridge.run();

    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Lane {} stopped after game {}",
        config.lane_id,
        bridge.engine().session().game_number()
    );
    for flag in &feed.stop {
        flag.store(false, Ordering::Relaxed);
    }
    drop(bridge);
    for thread in feed.threads {
        let _ = thread.join();
    }
    Ok(())
}

fn load_config(cli: &Cli) -> AppResult<LaneConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => LaneConfig::config_path().context("No configuration directory")?,
    };
    let mut config = LaneConfig::load_from(&path).with_context(|| format!("Loading {}", path.display()))?;

    if let Some(socket) = &cli.socket {
        config.sensor.socket_path = socket.clone();
    }
    if cli.in_process {
        config.sensor.transport = SensorTransport::InProcess;
    }
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Lane {} at {}, transport {:?}, socket {}",
        config.lane_id,
        config.venue_name,
        config.sensor.transport,
        config.sensor.socket_path.display()
    );
    Ok(config)
}

fn build_engine(config: &LaneConfig, cli: &Cli) -> AppResult<ScoringEngine> {
    let session = match (cli.games, cli.minutes) {
        (_, Some(minutes)) => SessionMode::Time { minutes },
        (Some(total), None) => SessionMode::Games { total },
        (None, None) => SessionMode::Games { total: 1 },
    };
    let setup = GameSetup::from_config(config, session);
    let store = GameStore::new(config.session.save_dir.clone());
    let now = Instant::now();

    let saved = if cli.fresh {
        None
    } else {
        match store.load_current() {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET_STARTUP, "Saved game unreadable, starting fresh: {e:#}");
                None
            }
        }
    };

    let engine = match saved {
        Some(snapshot) if snapshot.lane_id == config.lane_id => ScoringEngine::recover(setup, snapshot, now),
        _ => {
            let names = if cli.bowlers.is_empty() {
                config.session.default_bowlers.clone()
            } else {
                cli.bowlers.clone()
            };
            if names.is_empty() {
                bail!("No bowlers configured");
            }
            ScoringEngine::with_names(setup, names, now)
        }
    };
    Ok(engine.with_store(store))
}

fn open_rig(config: &LaneConfig, simulate: bool) -> AppResult<Rig> {
    if simulate {
        let sim = SimRig::new();
        return Ok(Rig {
            analog: Box::new(sim.analog()),
            actuators: Box::new(sim.actuators()),
            sim: Some(sim),
        });
    }
    open_hardware_rig(config)
}

#[cfg(feature = "hardware")]
fn open_hardware_rig(config: &LaneConfig) -> AppResult<Rig> {
    use five_pin_lane::hardware::rpi;

    let analog = rpi::open_adc_front_end(&config.wiring).context("Opening the pin sensors")?;
    let actuators = rpi::GpioActuators::open(&config.wiring).context("Claiming actuator lines")?;
    Ok(Rig {
        analog: Box::new(analog),
        actuators: Box::new(actuators),
        sim: None,
    })
}

#[cfg(not(feature = "hardware"))]
fn open_hardware_rig(_config: &LaneConfig) -> AppResult<Rig> {
    Err(five_pin_lane::HardwareError::Unavailable(
        "built without the `hardware` feature, run with --simulate".to_string(),
    ))
    .context("Opening the pin machine")
}

#[cfg(feature = "hardware")]
fn open_ball_input(config: &LaneConfig) -> AppResult<Box<dyn BallInput>> {
    let input = five_pin_lane::hardware::rpi::GpioBallInput::open(config.wiring.ball_sensor_gpio)
        .context("Claiming the ball sensor line")?;
    Ok(Box::new(input))
}

#[cfg(not(feature = "hardware"))]
fn open_ball_input(_config: &LaneConfig) -> AppResult<Box<dyn BallInput>> {
    Err(five_pin_lane::HardwareError::Unavailable("no ball sensor backend".to_string()))
        .context("Opening the ball sensor")
}

fn start_feed(config: &LaneConfig, simulate: bool, queue: &Sender<BridgeInput>) -> AppResult<Feed> {
    match config.sensor.transport {
        SensorTransport::InProcess => {
            let (detections_tx, detections_rx) = bounded::<SensorMessage>(config.sensor.channel_capacity.max(1));
            let (control_tx, control_rx) = unbounded();

            let (input, ball_source) = if simulate {
                let sim = SimBallInput::new();
                let input: Box<dyn BallInput> = Box::new(sim.clone());
                (input, Some(BallSource::Sensor(sim)))
            } else {
                (open_ball_input(config)?, None)
            };

            let mut daemon = BallSensorDaemon::new(input, config.sensor.debounce_ms)
                .with_channel(detections_tx)
                .with_control(control_rx)
                .with_poll_interval(Duration::from_micros(config.sensor.poll_interval_us.max(50)));
            let running = daemon.running_flag();
            let daemon_thread = thread::Builder::new()
                .name("ball-sensor".to_string())
                .spawn(move || daemon.run())
                .context("Starting the ball sensor thread")?;
            let forwarder =
                spawn_channel_forwarder(detections_rx, queue.clone()).context("Starting the detection forwarder")?;

            Ok(Feed {
                control: Arc::new(control_tx),
                writer: None,
                ball_source,
                stop: vec![running],
                threads: vec![daemon_thread, forwarder],
            })
        }
        SensorTransport::Stream => {
            let backoff = Backoff::new(
                Duration::from_millis(config.sensor.reconnect_initial_ms),
                Duration::from_millis(config.sensor.reconnect_max_ms),
            );
            let client = StreamClient::new(&config.sensor.socket_path, backoff, queue.clone());
            let writer = client.writer();
            let running = client.running_flag();
            let thread = client.spawn().context("Starting the sensor stream client")?;

            Ok(Feed {
                control: Arc::new(NoControl),
                writer: Some(writer),
                ball_source: simulate.then(|| BallSource::Queue(queue.clone())),
                stop: vec![running],
                threads: vec![thread],
            })
        }
    }
}

/// Log lane events and report rack changes to the daemon.
fn spawn_event_logger(bus: &EventBus, writer: Option<StreamWriter>) -> AppResult<JoinHandle<()>> {
    let (events, _) = bus.subscribe();
    thread::Builder::new()
        .name("lane-events".to_string())
        .spawn(move || log_events(events, writer))
        .context("Starting the event logger")
}

fn log_events(events: Receiver<LaneEvent>, writer: Option<StreamWriter>) {
    for event in events.iter() {
        match &event {
            LaneEvent::Shutdown => break,
            LaneEvent::BallDetected { .. } | LaneEvent::PinSetReported { .. } => {
                tracing::debug!("{}", event.description());
            }
            LaneEvent::ErrorOccurred { .. } => tracing::error!("{}", event.description()),
            LaneEvent::RackChanged { pins, .. } => {
                tracing::info!("{}", event.description());
                if let Some(writer) = &writer {
                    writer.send_pin_set(*pins);
                }
            }
            _ => tracing::info!("{}", event.description()),
        }
    }
}

/// Operator console on stdin.
///
/// `reset`, `skip`, `hold`, `next`, `clear`, `strike <n>`, `pick <n>`,
/// `games <n>`, `minutes <n>`, `quit`; with `--simulate` also `ball <pattern>`.
fn spawn_console(
    handle: LaneHandle,
    rig: Option<SimRig>,
    balls: Option<BallSource>,
    quit_on_eof: bool,
) -> AppResult<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if !run_console_line(&handle, rig.as_ref(), balls.as_ref(), line.trim()) {
                    return;
                }
            }
            if quit_on_eof {
                handle.shutdown();
            }
        })
        .context("Starting the operator console")
}

fn run_console_line(handle: &LaneHandle, rig: Option<&SimRig>, balls: Option<&BallSource>, line: &str) -> bool {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let number = words.next().and_then(|w| w.parse::<u32>().ok());

    match (command, number) {
        ("", _) => {}
        ("quit" | "exit", _) => {
            handle.shutdown();
            return false;
        }
        ("reset", _) => {
            handle.manual_reset();
        }
        ("skip", _) => {
            handle.skip_bowler();
        }
        ("hold", _) => {
            handle.toggle_hold();
        }
        ("next", _) => {
            handle.start_next_game();
        }
        ("clear", _) => {
            handle.clear_fault();
        }
        ("strike", Some(n)) if n >= 1 => {
            handle.use_free_strike(n as usize - 1);
        }
        ("pick", Some(n)) => {
            handle.select_candidate(n as usize);
        }
        ("games", Some(n)) => {
            handle.extend_session(SessionExtension::AddGames(n));
        }
        ("minutes", Some(n)) => {
            handle.extend_session(SessionExtension::AddMinutes(n));
        }
        ("ball", _) => throw_simulated(rig, balls, line),
        _ => println!("Unknown command: {line}"),
    }
    true
}

fn throw_simulated(rig: Option<&SimRig>, balls: Option<&BallSource>, line: &str) {
    let (Some(rig), Some(balls)) = (rig, balls) else {
        println!("`ball` needs --simulate");
        return;
    };
    let pattern = line.split_whitespace().nth(1).unwrap_or("00000");
    let Some(pins) = PinState::from_pattern(pattern) else {
        println!("Pattern must be five 0/1 digits, L2 first (e.g. 00100)");
        return;
    };

    rig.knock(pins);
    match balls {
        BallSource::Sensor(input) => input.pulse(),
        BallSource::Queue(queue) => {
            let _ = queue.send(BridgeInput::Sensor(SensorMessage::BallDetected {
                timestamp: unix_timestamp(),
            }));
        }
    }
}
