//! # VCU Control Unit
//!
//! Composition root: loads the configuration, builds every component once,
//! and runs each on its own periodic thread until Ctrl-C.
//!
//! - `--simulate` (or no SocketCAN support compiled in): loopback bus with
//!   a simulated inverter node, battery and a scripted driver.
//! - otherwise: SocketCAN on `bus.interface`. Board I/O drivers are not
//!   part of this binary, so the switch panel, pedals and BMS are static
//!   bench inputs (SDC closed, nothing pressed) and the car never leaves
//!   `Idle`.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use vcu_common::prelude::{LogLevel, VcuConfig};
use vcu_control_unit::can::{CanBus, CanInterface};
use vcu_control_unit::canopen::{CanOpenDevice, CanOpenHost};
use vcu_control_unit::clock::{Clock, MonotonicClock};
use vcu_control_unit::config::load_config;
use vcu_control_unit::inverter::InverterSupervisor;
use vcu_control_unit::queue::Timeout;
use vcu_control_unit::runtime::{CycleStats, RuntimeError, TaskPriority, rt_setup, spawn_periodic};
use vcu_control_unit::sim::{SIM_NODE_PERIOD_MS, SIM_PRECHARGE_MS, ScriptedDriver, SimWorld};
use vcu_control_unit::telemetry::TelemetryLogger;
use vcu_control_unit::tractive::TractiveSupervisor;

/// VCU Control Unit: tractive-system supervisor and inverter control
#[derive(Parser, Debug)]
#[command(name = "vcu_control_unit")]
#[command(version)]
#[command(about = "Tractive-system supervisor, pedal plausibility and CANopen inverter control")]
struct Args {
    /// Path to the VCU configuration TOML.
    #[arg(long, default_value = "config/vcu.toml")]
    config: PathBuf,

    /// Run against the simulated vehicle on a loopback bus.
    #[arg(long)]
    simulate: bool,

    /// Override `bus.interface` from the configuration.
    #[arg(long, value_name = "IFACE")]
    can_interface: Option<String>,

    /// Enable verbose logging (DEBUG level, overrides `shared.log_level`).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // The configured log level is needed before the subscriber exists.
    let loaded = load_config(&args.config);
    let level = loaded
        .as_ref()
        .map_or(LogLevel::default(), |cfg| cfg.shared.log_level);
    setup_tracing(&args, level);

    info!("VCU Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match loaded {
        Ok(cfg) => run(&args, cfg),
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("VCU Control Unit shutdown complete");
}

fn run(args: &Args, mut cfg: VcuConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !args.config.exists() {
        warn!(path = %args.config.display(), "configuration file not found, running on defaults");
    }
    if let Some(iface) = &args.can_interface {
        cfg.bus.interface = iface.clone();
    }
    info!(
        service = %cfg.shared.service_name,
        tick_ms = cfg.timing.supervisor_tick_ms,
        inverter_node = cfg.inverter.node_id,
        log_level = cfg.shared.log_level.as_directive(),
        "config OK"
    );

    rt_setup()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
    let handles = if args.simulate || !cfg!(feature = "socketcan") {
        if !args.simulate {
            warn!("built without SocketCAN support, running the simulated vehicle");
        }
        start_simulated(&cfg, clock, &running)?
    } else {
        start_bus(&cfg, clock, &running)?
    };
    info!(tasks = handles.len(), "all tasks running");

    while running.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(100));
    }

    for (name, handle) in handles {
        match handle.join() {
            Ok(stats) => info!(
                task = name,
                cycles = stats.cycle_count,
                overruns = stats.overruns,
                max_cycle_ns = stats.max_cycle_ns,
                "task joined"
            ),
            Err(_) => error!(task = name, "task panicked"),
        }
    }
    Ok(())
}

type Tasks = Vec<(&'static str, JoinHandle<CycleStats>)>;

/// The components every mode runs.
struct Core<I: CanInterface> {
    bus: Arc<CanBus<I>>,
    device: Arc<CanOpenDevice>,
    inverter: Arc<InverterSupervisor>,
    host: CanOpenHost,
    supervisor: Arc<TractiveSupervisor>,
}

fn spawn_core<I: CanInterface + 'static>(
    cfg: &VcuConfig,
    core: Core<I>,
    clock: Arc<dyn Clock>,
    running: &Arc<AtomicBool>,
) -> Result<Tasks, RuntimeError> {
    let t = &cfg.timing;
    let mut tasks = Tasks::new();

    let bus = core.bus;
    tasks.push((
        "bus-rx",
        spawn_periodic("bus-rx", TaskPriority::BusReceive, ms(t.bus_poll_ms), running.clone(), move || {
            if let Err(e) = bus.pump() {
                warn!(error = %e, "bus receive failed");
            }
        })?,
    ));

    let device = core.device;
    let poll = ms(t.bus_poll_ms);
    tasks.push((
        "canopen",
        spawn_periodic("canopen", TaskPriority::CanOpen, poll, running.clone(), move || {
            // Block for the first frame, then take whatever else is queued.
            if device.process(Timeout::After(poll / 2)).is_some() {
                device.process_pending();
            }
        })?,
    ));

    let (inverter, c) = (core.inverter, clock.clone());
    tasks.push((
        "inverter",
        spawn_periodic("inverter", TaskPriority::Inverter, ms(t.inverter_tick_ms), running.clone(), move || {
            inverter.tick(c.now_ms());
        })?,
    ));

    let (supervisor, c) = (core.supervisor.clone(), clock);
    tasks.push((
        "supervisor",
        spawn_periodic("supervisor", TaskPriority::Supervisor, ms(t.supervisor_tick_ms), running.clone(), move || {
            supervisor.tick(c.now_ms());
        })?,
    ));

    let host = core.host;
    tasks.push((
        "host",
        spawn_periodic("host", TaskPriority::Host, ms(t.host_period_ms), running.clone(), move || {
            if let Err(e) = host.tick() {
                warn!(error = %e, "host SYNC/heartbeat not sent");
            }
        })?,
    ));

    let supervisor = core.supervisor;
    let mut logger = TelemetryLogger::new();
    tasks.push((
        "telemetry",
        spawn_periodic("telemetry", TaskPriority::Telemetry, ms(t.telemetry_period_ms), running.clone(), move || {
            logger.report(&supervisor.snapshot());
        })?,
    ));

    Ok(tasks)
}

fn start_simulated(
    cfg: &VcuConfig,
    clock: Arc<dyn Clock>,
    running: &Arc<AtomicBool>,
) -> Result<Tasks, Box<dyn std::error::Error>> {
    let world = SimWorld::new(cfg, SIM_PRECHARGE_MS)?;
    info!(precharge_ms = SIM_PRECHARGE_MS, "simulated vehicle ready");

    let (node, battery, io, adc, loopback) = (
        world.node.clone(),
        world.battery.clone(),
        world.io.clone(),
        world.adc.clone(),
        world.loopback.clone(),
    );
    let supervisor = world.supervisor.clone();
    let c = clock.clone();
    let mut driver = ScriptedDriver::new();
    let mut last_publish = 0;
    let sim = spawn_periodic("sim", TaskPriority::Host, ms(cfg.timing.supervisor_tick_ms), running.clone(), move || {
        let now = c.now_ms();
        node.poll();
        battery.tick(now);
        driver.step(&io, &adc, supervisor.state(), now);
        if now.saturating_sub(last_publish) >= SIM_NODE_PERIOD_MS {
            node.publish();
            last_publish = now;
        }
        // Nobody reads the transmit log in a live run.
        loopback.take_sent();
    })?;

    let core = Core {
        bus: world.bus,
        device: world.device,
        inverter: world.inverter,
        host: world.host,
        supervisor: world.supervisor,
    };
    let mut tasks = spawn_core(cfg, core, clock, running)?;
    tasks.push(("sim", sim));
    Ok(tasks)
}

#[cfg(feature = "socketcan")]
fn start_bus(
    cfg: &VcuConfig,
    clock: Arc<dyn Clock>,
    running: &Arc<AtomicBool>,
) -> Result<Tasks, Box<dyn std::error::Error>> {
    use vcu_control_unit::can::socketcan::SocketCanInterface;
    use vcu_control_unit::sim::{SimAdc, SimBattery, SimIo};
    use vcu_control_unit::tractive::Collaborators;

    let iface = Arc::new(SocketCanInterface::open(&cfg.bus.interface)?);
    info!(interface = %cfg.bus.interface, "CAN bus open");
    let bus = Arc::new(CanBus::new(iface, cfg.bus.max_reads));

    let device = Arc::new(CanOpenDevice::new(
        bus.clone(),
        cfg.inverter.node_id,
        &cfg.inverter.tpdo_bases,
        cfg.bus.queue_capacity,
    )?);
    let inverter = Arc::new(InverterSupervisor::new(device.clone(), &cfg.inverter));
    let host = CanOpenHost::new(bus.clone(), cfg.bus.vcu_node_id)?;

    warn!("no board I/O backend: switch panel, pedals and BMS are static bench inputs");
    let supervisor = Arc::new(TractiveSupervisor::new(
        cfg,
        Collaborators {
            io: Arc::new(SimIo::new()),
            adc: Arc::new(SimAdc::new(cfg)),
            battery: Arc::new(SimBattery::new(SIM_PRECHARGE_MS)),
            inverter: inverter.clone(),
        },
    ));

    let core = Core {
        bus,
        device,
        inverter,
        host,
        supervisor,
    };
    Ok(spawn_core(cfg, core, clock, running)?)
}

#[cfg(not(feature = "socketcan"))]
fn start_bus(
    _cfg: &VcuConfig,
    _clock: Arc<dyn Clock>,
    _running: &Arc<AtomicBool>,
) -> Result<Tasks, Box<dyn std::error::Error>> {
    Err("built without the `socketcan` feature".into())
}

#[inline]
fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let directive: Directive = if args.verbose {
        Level::DEBUG.into()
    } else {
        configured
            .as_directive()
            .parse()
            .unwrap_or_else(|_| Level::INFO.into())
    };

    let filter = EnvFilter::from_default_env().add_directive(directive);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_thread_names(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_thread_names(true)
            .init();
    }
}
