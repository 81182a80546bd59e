// Macrokb CLI
// Daemon driving one chord session per configured keyboard

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use macrokb_core::config::{Config, DEFAULT_DEVICE_MATCH};
use macrokb_core::{
    dump_devices, list_keyboards, DeviceSession, GrabbedDevice, LightAnimator, ModeSlot,
    SessionConfig,
};

/// Daemon for multiple macro keyboards
#[derive(Parser, Debug)]
#[command(name = "macrokb")]
#[command(author = "macrokb contributors")]
#[command(version)]
#[command(about = "Chord macros for dedicated evdev keyboards", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Dump matching device capabilities to stdout and exit
    #[arg(short, long)]
    dump_data: bool,

    /// Disable the LED animation
    #[arg(short = 'l', long)]
    no_lights: bool,

    /// Log every key event. This leaks passwords typed on grabbed keyboards.
    #[arg(short, long)]
    print_keys: bool,

    /// Enable the passthrough toggle key (also disables lights)
    #[arg(short = 'e', long)]
    non_exclusive: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,
}

impl Args {
    fn lights_enabled(&self) -> bool {
        !self.no_lights && !self.non_exclusive
    }
}

/// One session's final outcome, reported to the supervisor
struct Outcome {
    label: String,
    result: Result<(), String>,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path().context("Could not determine config directory")?,
    };
    if !path.exists() {
        bail!("Config file not found: {}", path.display());
    }
    Config::from_toml_path(&path).with_context(|| format!("Failed to load {}", path.display()))
}

fn run_session(
    path: &Path,
    modes: Vec<ModeSlot>,
    config: SessionConfig,
    lights: Option<Duration>,
) -> Result<()> {
    let source = GrabbedDevice::open(path)?;

    let _lights = lights.and_then(|interval| match LightAnimator::start(path, interval) {
        Ok(animator) => Some(animator),
        Err(e) => {
            log::warn!("LED animation unavailable for {}: {}", path.display(), e);
            None
        }
    });

    let mut session = DeviceSession::new(source, modes, config)?;
    session.run()?;
    Ok(())
}

fn spawn_session(
    label: String,
    path: PathBuf,
    modes: Vec<ModeSlot>,
    config: SessionConfig,
    lights: Option<Duration>,
    outcomes: mpsc::Sender<Outcome>,
) -> Result<()> {
    thread::Builder::new()
        .name(label.clone())
        .spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                run_session(&path, modes, config, lights)
            }));
            let result = match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(_) => Err("session panicked".to_string()),
            };
            let _ = outcomes.send(Outcome { label, result });
        })
        .context("Failed to spawn session thread")?;
    Ok(())
}

fn spawn_signal_handler() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signals")?;
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log::info!("Received signal {}, shutting down", signal);
            std::process::exit(0);
        }
    });
    Ok(())
}

fn run(args: Args) -> Result<()> {
    if args.dump_data {
        let pattern = match load_config(args.config.as_deref()) {
            Ok(config) => config.general.device_match,
            Err(e) => {
                log::debug!("using default device match: {:#}", e);
                DEFAULT_DEVICE_MATCH.to_string()
            }
        };
        print!("{}", dump_devices(&pattern)?);
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let registry = config.to_registry().context("Invalid bind tables")?;

    if args.check_config {
        for name in registry.keyboard_names() {
            println!("{}: {} mode(s)", name, registry.mode_count(name));
        }
        println!("Configuration is valid");
        return Ok(());
    }

    if registry.is_empty() {
        bail!("No bind tables configured");
    }
    if args.print_keys {
        log::warn!("Printing key events; anything typed on a grabbed keyboard ends up in the log");
    }

    let session_config = SessionConfig {
        mode_advance_key: config.general.mode_advance_key.clone(),
        passthrough_toggle_key: args
            .non_exclusive
            .then(|| config.general.passthrough_toggle_key.clone()),
        print_keys: args.print_keys,
    };
    let lights = args.lights_enabled().then_some(config.general.light_interval);

    spawn_signal_handler()?;

    let keyboards = list_keyboards(&config.general.device_match);
    let (tx, rx) = mpsc::channel();
    let mut running = 0;

    for name in registry.keyboard_names() {
        let Some(paths) = keyboards.get(name) else {
            log::info!("'{}' is configured but not connected", name);
            continue;
        };
        for path in paths {
            let label = format!("{} ({})", name, path.display());
            log::info!("starting session for {}", label);
            spawn_session(
                label,
                path.clone(),
                registry.modes_for(name),
                session_config.clone(),
                lights,
                tx.clone(),
            )?;
            running += 1;
        }
    }
    drop(tx);

    if running == 0 {
        bail!("No configured keyboard is connected");
    }

    for outcome in rx {
        match outcome.result {
            Ok(()) => log::info!("session {} ended", outcome.label),
            Err(e) => {
                log::error!("session {} failed: {}", outcome.label, e);
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
