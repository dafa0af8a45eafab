use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use wobblaz::{
    Clock, EnvironmentFlags, FlagGovernor, FrameScheduler, JsonFileStore, ManualClock,
    MemoryStore, OverrideStore, Priority, SchedulerConfig, StaticProbe, TaskOptions,
};

#[derive(Parser, Debug)]
#[command(name = "wobblaz", version)]
struct Cli {
    /// Log scheduler and flag decisions to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive animation flags for a described device and print the diagnostics as JSON.
    Flags(FlagsArgs),
    /// Run a synthetic workload through the frame scheduler and print its statistics.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct FlagsArgs {
    /// Logical CPU cores.
    #[arg(long)]
    cores: Option<u32>,

    /// Device memory in GiB.
    #[arg(long)]
    memory: Option<f64>,

    /// WebGL renderer string.
    #[arg(long)]
    renderer: Option<String>,

    /// The primary pointer cannot hover.
    #[arg(long, default_value_t = false)]
    no_hover: bool,

    /// Report touch support.
    #[arg(long, default_value_t = false)]
    touch: bool,

    /// The user prefers reduced motion.
    #[arg(long, default_value_t = false)]
    reduced_motion: bool,

    /// JSON file holding persisted environment overrides.
    #[arg(long)]
    overrides: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Frames to run.
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Tasks scheduled before every frame.
    #[arg(long, default_value_t = 4)]
    tasks: usize,

    /// Time each task spends working, in milliseconds.
    #[arg(long, default_value_t = 3.0)]
    cost: f64,

    /// Display refresh rate.
    #[arg(long, default_value_t = 60.0)]
    refresh_hz: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    match cli.cmd {
        Command::Flags(args) => cmd_flags(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn cmd_flags(args: FlagsArgs) -> anyhow::Result<()> {
    let probe = StaticProbe {
        hardware_concurrency: args.cores,
        device_memory_gb: args.memory,
        gpu_renderer: args.renderer,
        max_touch_points: args.touch.then_some(5),
        hover_capable: Some(!args.no_hover),
        prefers_reduced_motion: Some(args.reduced_motion),
        device_pixel_ratio: None,
    };
    let store: Rc<dyn OverrideStore> = match args.overrides {
        Some(path) => Rc::new(JsonFileStore::new(path)),
        None => Rc::new(MemoryStore::new()),
    };

    let governor = FlagGovernor::load(EnvironmentFlags::from_process_env(), &probe, store);
    let json = serde_json::to_string_pretty(&governor.debug_info())
        .context("serialize flag diagnostics")?;
    println!("{json}");
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let config = SchedulerConfig::for_refresh_rate(args.refresh_hz)?;
    let frame_ms = config.frame_target_ms;
    let clock = ManualClock::new(0.0);
    let scheduler = FrameScheduler::new(config, Rc::new(clock.clone()));

    let priorities = [Priority::Low, Priority::Medium, Priority::High, Priority::Critical];
    let mut next_frame = frame_ms;
    for frame in 0..args.frames {
        for n in 0..args.tasks {
            let work_clock = clock.clone();
            let cost = args.cost;
            let opts = TaskOptions::new(priorities[n % priorities.len()]).cost(cost);
            scheduler.schedule(
                format!("task-{n}"),
                move || {
                    work_clock.advance(cost);
                    Ok(())
                },
                opts,
            );
        }

        clock.set(next_frame);
        let report = scheduler.on_frame(next_frame);
        tracing::debug!(frame, executed = report.executed, queued = report.queued, "frame");
        // Work that overran the frame pushes the next callback out.
        next_frame = (next_frame + frame_ms).max(clock.now_ms());
    }

    let summary = serde_json::json!({
        "stats": scheduler.stats(),
        "recommended_quality": scheduler.recommended_quality(),
        "under_pressure": scheduler.is_under_pressure(),
    });
    let json = serde_json::to_string_pretty(&summary).context("serialize scheduler stats")?;
    println!("{json}");
    Ok(())
}
