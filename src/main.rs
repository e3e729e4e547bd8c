//! Head pointer demo: drives the control loop from a synthetic tracker.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use head_pointer::{
    app::ControlLoop,
    config::{Config, EXAMPLE_CONFIG},
    cursor_control::X11Pointer,
    event_trigger::Labels,
    geometry::Rect,
    gesture_stream::{GestureHost, GestureStream, LoggingHost, StreamSettings},
    tracking::SyntheticTracker,
};
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HostKind {
    /// Log gestures without injecting anything
    Log,
    /// Inject pointer events into the X11 display
    X11,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Number of ticks to run (runs until interrupted when omitted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Where gestures are sent
    #[arg(long, value_enum, default_value = "log")]
    host: HostKind,

    /// Frames between synthetic mouth-open pulses (0 disables)
    #[arg(long, default_value = "90")]
    pulse_every: u64,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// List trigger bindings from the configuration and exit
    #[arg(long)]
    list_bindings: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {}. Using defaults.", e);
                Config::with_default_triggers()
            }
        }
    } else {
        Config::with_default_triggers()
    };

    config.sanitize();

    if args.list_bindings {
        let labels = Labels::new();
        for (event, binding) in config.trigger_bindings() {
            println!(
                "{:<22} {:<24} > {:.2}",
                labels.event(event),
                labels.blendshape(binding.blendshape),
                binding.threshold
            );
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(async move {
        let host: Arc<dyn GestureHost> = match args.host {
            HostKind::Log => Arc::new(LoggingHost),
            HostKind::X11 => {
                let pointer = X11Pointer::new().context("X11 host requested but unavailable")?;
                let (width, height) = pointer.screen_size();
                config.screen.width = f64::from(width);
                config.screen.height = f64::from(height);
                info!("Using X11 screen {:?}", Rect::from_size(config.screen.width, config.screen.height));
                Arc::new(pointer)
            }
        };

        let stream = GestureStream::spawn(host, StreamSettings::from(&config.stream));
        let mut control = ControlLoop::new(config, stream.clone());

        info!("Head Pointer - synthetic tracker demo");
        let summary = control.run(SyntheticTracker::new(args.pulse_every), args.ticks).await?;

        // Let the final segment drain before shutting the worker down
        tokio::time::sleep(StreamSettings::default().default_segment * 4).await;
        stream.shutdown()?;
        info!("{:?}", summary);
        Ok::<(), anyhow::Error>(())
    })
}
