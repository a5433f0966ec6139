//! Pinchbar - system-wide gesture and scroll remapping for macOS

use pinchbar::app::cli::{Cli, Commands, ConfigAction};
use pinchbar::app::config::Config;
use pinchbar::mapping::{PinchSettings, Replacement};
use pinchbar::preset::Preset;
use pinchbar::replay::Replay;
use pinchbar::time::timebase::MachTimebase;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    // Logs go to stderr so replay output on stdout stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    MachTimebase::init();

    let config = if let Some(path) = &cli.config {
        Config::load(path)?
    } else {
        Config::load_default()?
    };

    match cli.command {
        Commands::Run {
            duration,
            app,
            log_events,
        } => {
            run_engine(duration, app, log_events, &config)?;
        }
        Commands::Replay { input, output, app } => {
            run_replay(input, output, app, &config)?;
        }
        Commands::Presets { detailed } => {
            run_presets(detailed, &config);
        }
        Commands::Check { prompt } => {
            run_check(prompt)?;
        }
        Commands::Init { force } => {
            run_init(force, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, &config, cli.config)?;
        }
    }

    Ok(())
}

#[cfg(target_os = "macos")]
fn run_engine(duration: u64, app: Option<String>, log_events: bool, config: &Config) -> anyhow::Result<()> {
    use parking_lot::Mutex;
    use pinchbar::chain::Dispatcher;
    use pinchbar::sensor::{multitouch, TouchState};
    use pinchbar::tap::{self, EventTap, FrontmostWatcher};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use tracing::{debug, warn};

    let touch_state = Arc::new(TouchState::new());
    touch_state.set_tap_to_click_source(multitouch::tap_to_click_preference);
    if let Err(e) = multitouch::start(Arc::clone(&touch_state)) {
        warn!("Touch sensor unavailable: {}", e);
        warn!("Mappings that depend on finger counts will stay inactive");
    }

    let mut watcher = FrontmostWatcher::new();
    let mut active_app = match &app {
        Some(app) => Some(app.clone()),
        None => {
            watcher.poll();
            watcher.current().map(str::to_string)
        }
    };
    let preset_of = |app: Option<&str>| app.and_then(|a| config.preset_for(a)).map(|(name, _)| name.to_string());
    let mut active_preset = preset_of(active_app.as_deref());

    let chain = config.chain_for(active_app.as_deref());
    info!("Active chain: {}", chain.names().join(" -> "));

    let dispatcher = Dispatcher::new(chain, touch_state.clone())
        .with_timing(config.engine.timing)
        .with_event_logging(log_events || config.engine.log_events);
    let dispatcher = Arc::new(Mutex::new(dispatcher));

    // Discrete trackpad taps come from the multitouch thread
    let tap_dispatcher = Arc::clone(&dispatcher);
    touch_state.set_tap_callback(move |_count| {
        let events = tap_dispatcher.lock().on_trackpad_tap(tap::convert::pointer_location());
        tap::post_events(&events);
    });

    let mut event_tap = EventTap::new(Duration::from_millis(config.engine.tap_retry_ms));
    if let Err(e) = event_tap.start(Arc::clone(&dispatcher)) {
        warn!("Please enable Accessibility permissions in System Settings > Privacy & Security > Accessibility");
        return Err(e.into());
    }

    info!("Remapping... Press Ctrl+C to stop");

    let start_time = Instant::now();
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_handler = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_handler.store(true, Ordering::SeqCst);
    })?;

    let poll_interval = Duration::from_millis(config.engine.frontmost_poll_ms);
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            break;
        }
        if duration > 0 && start_time.elapsed().as_secs() >= duration {
            break;
        }

        tap::frontmost::run_loop_wait(poll_interval);

        if app.is_none() && watcher.poll() {
            active_app = watcher.current().map(str::to_string);
            let preset = preset_of(active_app.as_deref());
            info!("Frontmost application: {}", active_app.as_deref().unwrap_or("-"));
            if preset != active_preset {
                dispatcher.lock().set_chain(config.chain_for(active_app.as_deref()));
                info!("Preset: {}", preset.as_deref().unwrap_or("none"));
                active_preset = preset;
            }
        }
    }

    event_tap.stop();

    let stats = dispatcher.lock().stats();
    info!(
        "Stopped after {:.1}s: {} events in, {} out, {} dropped, {} tap re-enables",
        start_time.elapsed().as_secs_f64(),
        stats.events_in,
        stats.events_out,
        stats.events_dropped,
        stats.tap_reenabled
    );
    debug!(
        "Touch frames: {}, taps: {}",
        touch_state.stats().frames.load(Ordering::Relaxed),
        touch_state.stats().taps.load(Ordering::Relaxed)
    );
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_engine(_duration: u64, _app: Option<String>, _log_events: bool, _config: &Config) -> anyhow::Result<()> {
    anyhow::bail!("The event tap is only available on macOS; use 'pinchbar replay' to run scripts")
}

fn run_replay(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    app: Option<String>,
    config: &Config,
) -> anyhow::Result<()> {
    let chain = config.chain_for(app.as_deref());
    info!("Replaying through: {}", chain.names().join(" -> "));

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Script file not found: {:?}", path);
            }
            Box::new(BufReader::new(std::fs::File::open(path)?))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(std::fs::File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut replay = Replay::new(chain).with_event_logging(config.engine.log_events);
    let summary = replay.run(reader, writer)?;

    if let Some(path) = output {
        info!("Wrote {} output events to {:?}", summary.events_out, path);
    }
    Ok(())
}

fn describe_pinch(settings: &PinchSettings) -> String {
    match settings.replace_with {
        None => format!("pinch [{}] x{}", settings.flags, settings.sensitivity),
        Some(Replacement::Wheel) => format!("wheel [{}] x{}", settings.flags, settings.sensitivity),
        Some(Replacement::Keys { code_a, code_b }) => format!(
            "keys {}/{} [{}] x{}",
            code_a, code_b, settings.flags, settings.sensitivity
        ),
    }
}

fn run_presets(detailed: bool, config: &Config) {
    let builtin = Preset::builtin();

    println!("Presets:");
    for (name, preset) in &config.presets {
        let origin = match builtin.get(name) {
            Some(b) if b == preset => "built-in",
            Some(_) => "overridden",
            None => "user",
        };
        println!("  {}  ({} entries, {})", name, preset.mappings.len(), origin);
        if detailed {
            for (flags, settings) in &preset.mappings {
                println!("    [{}] -> {}", flags, describe_pinch(settings));
            }
        }
    }

    println!("\nApplications:");
    for (app, preset) in &config.app_presets {
        println!("  {} -> {}", app, preset);
    }
    if config.app_presets.is_empty() {
        println!("  (none)");
    }

    println!("\nGlobal mappings:");
    for mapping in &config.global_mappings {
        println!("  {}", mapping.name());
    }
}

#[cfg(target_os = "macos")]
fn run_check(prompt: bool) -> anyhow::Result<()> {
    use pinchbar::sensor::multitouch;
    use pinchbar::tap;

    let trusted = if prompt {
        tap::request_accessibility_permissions()
    } else {
        tap::check_accessibility_permissions()
    };

    println!("Accessibility: {}", if trusted { "granted" } else { "NOT granted" });
    println!(
        "Tap to click: {}",
        if multitouch::tap_to_click_preference() { "on" } else { "off" }
    );
    if let Some(app) = tap::frontmost_application_name() {
        println!("Frontmost application: {}", app);
    }

    if !trusted {
        anyhow::bail!("Enable Accessibility permissions in System Settings > Privacy & Security > Accessibility");
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_check(_prompt: bool) -> anyhow::Result<()> {
    println!("Accessibility: not applicable on this platform");
    Ok(())
}

fn run_init(force: bool, config: &Config) -> anyhow::Result<()> {
    let config_path = Config::default_path();

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite.",
            config_path
        );
    }

    config.save_default()?;
    println!("Created config at {:?}", config_path);
    println!("\nConfig content:\n{}", config.to_toml()?);

    Ok(())
}

fn run_config(action: ConfigAction, config: &Config, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let active_path = config_path.unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", active_path);
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", active_path.display());
        }
        ConfigAction::Validate { file } => {
            match file {
                Some(file) => {
                    Config::load(&file)?;
                    println!("{}: OK", file.display());
                }
                None => {
                    config.validate()?;
                    println!("{}: OK", active_path.display());
                }
            }
        }
    }

    Ok(())
}
