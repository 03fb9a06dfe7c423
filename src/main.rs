use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use brrtfetch::{
    cache::{FrameCache, SourceIdentity},
    config::{self, Sizing},
    engine::source::DecodedGif,
    info,
    player::{Host, Player, events::SignalEvents},
    renderer::pipeline::Pipeline,
    types::{RenderConfig, RenderedFrame},
};

const USAGE: &str = "Usage: brrtfetch [options] /path/to/file.gif";

#[derive(Parser, Debug)]
#[command(name = "brrtfetch", version, about = "Animated GIF beside your system info")]
struct Cli {
    /// Width in columns (0 = auto-scale).
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    width: i32,

    /// Height in rows (-1 = keep aspect ratio).
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    height: i32,

    /// Percentage of the terminal to use when autoscaling.
    #[arg(long, default_value_t = 40)]
    scale: u32,

    /// Frames per second.
    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Render in truecolor (`--color false` for monochrome blocks).
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    /// Brightness multiplier for the monochrome threshold.
    #[arg(long, default_value_t = 1.2)]
    multiplier: f64,

    /// Dither intensity between 0 and 1 (0 = off).
    #[arg(long, default_value_t = 0.0)]
    dither: f64,

    /// Command whose output is shown next to the GIF.
    #[arg(long, default_value = "fastfetch --logo-type none")]
    info: String,

    /// Rows to skip before the info panel starts.
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// GIF to play.
    gif: Option<PathBuf>,
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logging is opt-in through `BRRTFETCH_LOG`; stderr shares the screen
/// with the animation.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("BRRTFETCH_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let Some(gif_path) = cli.gif.as_deref() else {
        println!("{USAGE}");
        return Ok(());
    };
    let gif_path = std::path::absolute(gif_path)
        .with_context(|| format!("Failed to resolve {}", gif_path.display()))?;

    let events = SignalEvents::install(cli.fps).context("Failed to install signal handlers")?;

    let base = RenderConfig {
        width: 0,
        height: 0,
        fps: cli.fps.max(1),
        color: cli.color,
        dither: cli.dither.clamp(0.0, 1.0),
        multiplier: cli.multiplier,
    };
    let sizing = Sizing {
        width: cli.width,
        height: cli.height,
        scale: cli.scale,
    };
    let host = GifHost::open(&gif_path, base, sizing, cli.info.clone());

    let out = BufWriter::with_capacity(128 * 1024, io::stdout());
    let mut player = Player::new(out, host, cli.offset);
    player.play(events)
}

/// Wires the GIF, the frame cache and the info command to the player.
struct GifHost {
    gif: DecodedGif,
    identity: Option<SourceIdentity>,
    base: RenderConfig,
    sizing: Sizing,
    info_command: String,
    cache: FrameCache,
    pipeline: Pipeline,
}

impl GifHost {
    fn open(path: &Path, base: RenderConfig, sizing: Sizing, info_command: String) -> Self {
        let identity = SourceIdentity::of(path)
            .inspect_err(|e| debug!("no cache identity for {}: {e}", path.display()))
            .ok();
        GifHost {
            gif: DecodedGif::load_or_empty(path),
            identity,
            base,
            sizing,
            info_command,
            cache: FrameCache::in_temp_dir(),
            pipeline: Pipeline::default(),
        }
    }
}

impl Host for GifHost {
    fn terminal_size(&mut self) -> (u16, u16) {
        config::terminal_size()
    }

    fn layout(&mut self, term: (u16, u16)) -> RenderConfig {
        self.sizing
            .resolve(&self.base, term, (self.gif.width, self.gif.height))
    }

    fn frames(&mut self, config: &RenderConfig) -> Vec<RenderedFrame> {
        let (gif, pipeline) = (&self.gif, &self.pipeline);
        self.cache
            .fetch(self.identity.as_ref(), config, || pipeline.render(gif, config))
    }

    fn info_lines(&mut self) -> Vec<Vec<u8>> {
        info::collect_lines(&self.info_command)
    }
}
