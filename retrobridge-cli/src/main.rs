//! retrobridge - run a libretro core headless.
//!
//! Loads a core, optionally loads content, runs a fixed number of frames and can capture the
//! last frame, the audio output and the final save state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use retrobridge_core::capture::{write_png, WavRecorder};
use retrobridge_core::config;
use retrobridge_core::{
    audio_ring, frame_mailbox, AudioReceiver, CoreModule, Host, HostConfig, SaveState, SharedInput,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "retrobridge")]
#[command(about = "Headless libretro host")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a core and run it
    Run {
        /// Path to the core library
        #[arg(long)]
        core: PathBuf,

        /// Content file (omit for cores that run without content)
        #[arg(long)]
        content: Option<PathBuf>,

        /// Frames to run
        #[arg(long, default_value_t = 600)]
        frames: u64,

        /// Host configuration (default: the platform config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the last presented frame as PNG
        #[arg(long)]
        screenshot: Option<PathBuf>,

        /// Record audio to a WAV file
        #[arg(long)]
        wav: Option<PathBuf>,

        /// Write a save state after the last frame
        #[arg(long)]
        save_state: Option<PathBuf>,

        /// Restore a save state before the first frame (after it, for cores that must run once)
        #[arg(long)]
        load_state: Option<PathBuf>,
    },

    /// Print what a core reports about itself
    Info {
        /// Path to the core library
        #[arg(long)]
        core: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            core,
            content,
            frames,
            config,
            screenshot,
            wav,
            save_state,
            load_state,
        } => run(RunArgs {
            core,
            content,
            frames,
            config,
            screenshot,
            wav,
            save_state,
            load_state,
        }),
        Commands::Info { core } => print_info(&core),
    }
}

struct RunArgs {
    core: PathBuf,
    content: Option<PathBuf>,
    frames: u64,
    config: Option<PathBuf>,
    screenshot: Option<PathBuf>,
    wav: Option<PathBuf>,
    save_state: Option<PathBuf>,
    load_state: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<HostConfig> {
    if let Some(path) = path {
        return HostConfig::load(path).with_context(|| format!("loading {}", path.display()));
    }
    match config::default_path() {
        Some(path) => HostConfig::load_or_default(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(HostConfig::default()),
    }
}

fn open_core(path: &Path) -> Result<CoreModule> {
    // SAFETY: the user chose to run this library as a libretro core.
    unsafe { CoreModule::load(path) }.with_context(|| format!("loading core {}", path.display()))
}

/// Stand-in for an audio device: drains the ring on its own thread.
fn spawn_audio_drain(
    mut receiver: AudioReceiver,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<u64> {
    thread::spawn(move || {
        let mut buf = vec![0i16; 4096];
        let mut total = 0u64;
        loop {
            if let Some(rate) = receiver.poll_events() {
                info!(sample_rate = rate, "audio device reconfigured");
            }
            let available = receiver.available().min(buf.len());
            if available > 0 {
                total += receiver.pull_i16(&mut buf[..available]) as u64;
            } else if stop.load(Ordering::Acquire) {
                break;
            } else {
                thread::sleep(Duration::from_millis(2));
            }
        }
        if receiver.dropped() > 0 {
            warn!(dropped = receiver.dropped(), "audio samples dropped by a full ring");
        }
        total
    })
}

/// Cores that must run once before serializing get a single frame first.
fn ready_for_states(host: &mut Host) -> Result<()> {
    if !host.states_ready() {
        info!("running one frame before touching save states");
        host.run()?;
    }
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let core = open_core(&args.core)?;
    let mut host = Host::new(core, &config);

    let (frames_tx, frames_rx) = frame_mailbox();
    host.set_frame_sink(Some(Box::new(frames_tx)));
    host.set_input_source(Some(Box::new(SharedInput::new())));

    let stop = Arc::new(AtomicBool::new(false));
    let drain = match &args.wav {
        Some(path) => {
            host.set_audio_sink(Some(Box::new(WavRecorder::new(path))));
            None
        }
        None => {
            let (ring, receiver) = audio_ring(config.audio.ring_capacity_frames);
            host.set_audio_sink(Some(Box::new(ring)));
            Some(spawn_audio_drain(receiver, stop.clone()))
        }
    };

    host.load_game(args.content.as_deref()).context("loading content")?;

    if let Some(path) = &args.load_state {
        let state = SaveState::read(path).with_context(|| format!("reading {}", path.display()))?;
        ready_for_states(&mut host)?;
        host.load_state(&state).context("restoring save state")?;
    }

    while host.frame_count() < args.frames {
        host.run()?;
        for message in host.drain_messages() {
            info!(target: "retrobridge::osd", "{}", message.text);
        }
        if host.shutdown_requested() {
            info!(frame = host.frame_count(), "core requested shutdown");
            break;
        }
    }

    if let Some(path) = &args.save_state {
        ready_for_states(&mut host)?;
        let state = host.save_state().context("serializing state")?;
        state.write(path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), size = state.len(), "save state written");
    }

    let stats = host.bridge().video.stats();
    let frame_count = host.frame_count();
    // Drops the consumers and finalizes any WAV recording.
    drop(host);

    stop.store(true, Ordering::Release);
    if let Some(drain) = drain {
        match drain.join() {
            Ok(samples) => info!(samples, "audio drained"),
            Err(_) => warn!("audio drain thread panicked"),
        }
    }

    if let Some(path) = &args.screenshot {
        let Some(frame) = frames_rx.take() else {
            bail!("the core presented no frame to capture");
        };
        write_png(path, &frame)?;
    }

    info!(
        frames = frame_count,
        presented = stats.presented,
        duplicated = stats.duplicated,
        dropped = frames_rx.dropped(),
        "run finished"
    );
    Ok(())
}

fn print_info(path: &Path) -> Result<()> {
    let core = open_core(path)?;
    let info = core.system_info();
    println!("name:          {}", info.library_name);
    println!("version:       {}", info.library_version);
    println!("extensions:    {}", info.valid_extensions.join(", "));
    println!("need fullpath: {}", info.need_fullpath);
    println!("block extract: {}", info.block_extract);

    let mut host = Host::new(core, &HostConfig::default());
    println!("runs without content: {}", host.bridge().env.support_no_game());
    for subsystem in host.bridge().env.subsystems() {
        println!(
            "subsystem {} ({}): {} slots",
            subsystem.ident,
            subsystem.description,
            subsystem.roms.len()
        );
    }
    let options = host.with_options_mut(|options| options.options().to_vec());
    for option in options {
        let values: Vec<&str> = option.values.iter().map(|v| v.value.as_str()).collect();
        println!("option {} = {} [{}]", option.key, option.default, values.join("|"));
    }
    Ok(())
}
