//! sonora-play
//!
//! Command-line front end for the engine: expands folders into audio files,
//! loads them into a `Player` and plays them through in order, advancing on
//! end-of-stream and on playback errors. With `--scan` nothing is played;
//! every file is probed and its tags are printed.
//!
//! Settings come from `engine.toml` (see `config.rs`); flags given here win.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sonora_engine::config::Config;
use sonora_engine::core::library;
use sonora_engine::core::logger::EventLogger;
use sonora_engine::core::stats::PlayStats;
use sonora_engine::core::stream::tag;
use sonora_engine::core::types::format_clock;
use sonora_engine::{
    FileProber, Notification, NullFactory, Player, PlayerOptions, PlayerState, RodioFactory,
    StreamRef,
};

#[derive(Parser, Debug)]
#[command(name = "sonora-play")]
#[command(about = "Play audio files and folders through the Sonora engine")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "SONORA_CONFIG")]
    config: Option<PathBuf>,

    /// Initial volume
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    volume: Option<u8>,

    /// Start over after the last item
    #[arg(long)]
    repeat: bool,

    /// Shuffle play order
    #[arg(long)]
    random: bool,

    /// Start muted
    #[arg(long)]
    mute: bool,

    /// Probe and print tags only, no audio output
    #[arg(long)]
    scan: bool,

    /// Now-playing pattern (%a artist, %b album, %t title, %g genre, %n track, %d date)
    #[arg(long)]
    format: Option<String>,

    /// Files or folders to play
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    apply_args(&mut config, &args);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let files = library::scan_paths(&args.paths).context("Failed to read input paths")?;
    if files.is_empty() {
        bail!("No playable files found");
    }
    info!("{} file(s) found", files.len());

    if args.scan {
        scan(&config, &files)
    } else {
        play(&config, &files)
    }
}

fn apply_args(config: &mut Config, args: &Args) {
    if let Some(v) = args.volume {
        config.volume = v;
    }
    config.repeat |= args.repeat;
    config.random |= args.random;
    config.mute |= args.mute;
    if let Some(f) = &args.format {
        config.now_playing_format = f.clone();
    }
}

/// Probe every file and print what was found.
fn scan(config: &Config, files: &[PathBuf]) -> Result<()> {
    let options = PlayerOptions {
        auto_parse: true,
        auto_play: false,
        ..config.player_options()
    };
    let mut player = Player::new(Box::new(NullFactory::new()), Box::new(FileProber), options);
    player.insert_paths(files, None).context("Failed to add files")?;

    let tick = Duration::from_millis(config.tick_ms);
    while !player.parser().is_idle() {
        player.iterate(tick);
    }

    for stream in player.streams() {
        println!("{}", stream.uri());
        println!("  length: {}", format_clock(stream.length()));
        for name in stream.tag_names() {
            if name == tag::URI {
                continue;
            }
            if let Some(value) = stream.tag(&name) {
                println!("  {name}: {value}");
            }
        }
    }
    Ok(())
}

fn play(config: &Config, files: &[PathBuf]) -> Result<()> {
    let mut player = Player::new(
        Box::new(RodioFactory),
        Box::new(FileProber),
        config.player_options(),
    );
    let events = player.subscribe();
    let mut stats = PlayStats::watch(&mut player);
    let mut logger = config.log_events.then(|| EventLogger::watch(&mut player));

    player.set_repeat(config.repeat)?;
    player.set_random(config.random)?;
    player.insert_paths(files, None).context("Failed to add files")?;

    if player.current().is_none() && !advance(&mut player)? {
        bail!("None of the files could be opened");
    }
    if player.state() != PlayerState::Play {
        player.play().context("Failed to start playback")?;
    }

    let tick = Duration::from_millis(config.tick_ms);
    let format = config.now_playing_format.as_str();
    let mut running = true;

    while running {
        player.iterate(tick);

        if let Some(l) = logger.as_mut() {
            l.flush();
        }
        if stats.update() {
            debug!("played enough to count as listened");
        }

        let pending: Vec<Notification> = events.try_iter().collect();
        for n in pending {
            match n {
                Notification::Change { to: Some(_), .. } => {
                    if let Some(s) = player.current_stream().filter(|s| s.all_tags()) {
                        print_now_playing(&s, format);
                    }
                }
                Notification::AllTags { stream } => {
                    if player
                        .current_stream()
                        .is_some_and(|s| Rc::ptr_eq(&s, &stream))
                    {
                        print_now_playing(&stream, format);
                    }
                }
                Notification::Error { stream, message } => {
                    let uri = stream.as_ref().map(|s| s.uri()).unwrap_or("?");
                    warn!("{uri}: {message}");
                    running = advance(&mut player)?;
                }
                Notification::Eos { .. } => {
                    running = advance(&mut player)?;
                }
                _ => {}
            }
        }
    }

    info!("Done");
    Ok(())
}

/// Move to the next playable item and keep playing. False when there is
/// nothing left.
fn advance(player: &mut Player) -> Result<bool> {
    let total = player.total();
    let mut candidate = player.get_next();

    for _ in 0..total {
        let Some(pos) = candidate else {
            break;
        };
        match player.go_to(Some(pos)) {
            Ok(()) => {
                if player.state() != PlayerState::Play {
                    player.play()?;
                }
                return Ok(true);
            }
            Err(e) => {
                warn!("Skipping item {pos}: {e}");
                // The cursor is gone after a failed load; continue from `pos`.
                candidate = if pos + 1 < total {
                    Some(pos + 1)
                } else if player.repeat() {
                    Some(0)
                } else {
                    None
                };
            }
        }
    }

    Ok(false)
}

fn print_now_playing(stream: &StreamRef, format: &str) {
    let line = if stream.tag(tag::TITLE).is_some() {
        stream.expand(format)
    } else {
        stream
            .local_path()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| stream.uri().to_owned())
    };
    println!("> {line} [{}]", format_clock(stream.length()));
}
