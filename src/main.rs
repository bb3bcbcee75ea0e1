//! gridtrack: plays a composition and sends triggers to a synth over OSC.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::{error, info, warn, LevelFilter, Metadata, Record};

use gridtrack::config::EngineConfig;
use gridtrack::model::Composition;
use gridtrack::player::Player;
use gridtrack::sequencer::{StartMode, TrackTarget};
use gridtrack::trigger::{OscEmitter, Trigger, TriggerSink};
use gridtrack::Error;

#[derive(Debug, Parser)]
#[command(name = "gridtrack", version, about = "Play a tracker composition")]
struct Cli {
    /// Composition file (YAML).
    composition: PathBuf,

    /// Config file; defaults to ~/.gridtrack/config.yaml.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    bpm: Option<f64>,

    /// Pulses per quarter note.
    #[arg(long)]
    ppq: Option<u32>,

    /// Loop one chain (hex id) instead of the song.
    #[arg(long, value_parser = parse_hex, conflicts_with = "phrase")]
    chain: Option<u8>,

    /// Loop one phrase (hex id) instead of the song.
    #[arg(long, value_parser = parse_hex)]
    phrase: Option<u8>,

    /// Play a single track (0-7).
    #[arg(long)]
    track: Option<usize>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    seed: Option<u64>,

    /// Print triggers instead of sending them.
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many ticks. With --dry-run, render as fast as possible.
    #[arg(long)]
    ticks: Option<u64>,

    /// More output (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_hex(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x");
    u8::from_str_radix(digits, 16).map_err(|e| format!("not a hex id: {e}"))
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Prints each trigger on its own line.
struct PrintSink;

impl TriggerSink for PrintSink {
    fn emit(&mut self, tick: u64, trigger: Trigger) {
        println!("{tick:>6}  {trigger}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load(),
    };
    if let Some(bpm) = cli.bpm {
        config.bpm = bpm;
    }
    if let Some(ppq) = cli.ppq {
        config.ppq = ppq;
    }
    if let Some(host) = cli.host.clone() {
        config.osc_host = host;
    }
    if let Some(port) = cli.port {
        config.osc_port = port;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut composition = Composition::load(&cli.composition)?;
    for file in composition.files.iter_mut() {
        if !file.path.as_os_str().is_empty() {
            file.path = config.sample_path(&file.path);
        }
    }

    let mode = match (cli.chain, cli.phrase) {
        (Some(chain), _) => StartMode::Chain(chain),
        (None, Some(phrase)) => StartMode::Phrase(phrase),
        (None, None) => StartMode::Top,
    };
    let target = cli.track.map_or(TrackTarget::All, TrackTarget::One);

    let sink: Box<dyn TriggerSink + Send> = if cli.dry_run {
        Box::new(PrintSink)
    } else {
        Box::new(OscEmitter::connect(&config.osc_host, config.osc_port)?)
    };

    let clock = config.clock();
    info!(
        "{}: {:.1} BPM, PPQ {}, {mode:?}",
        cli.composition.display(),
        clock.bpm(),
        clock.ppq()
    );
    let mut player = Player::new(composition.into_shared(), clock.into_shared(), sink, config.seed);

    if let (true, Some(limit)) = (cli.dry_run, cli.ticks) {
        player.cue(mode, target);
        while player.is_playing() && player.current_tick() < limit {
            player.tick();
        }
        return Ok(());
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        warn!("cannot install Ctrl-C handler: {e}");
    }

    player.play(mode, target)?;
    while !interrupted.load(Ordering::Relaxed)
        && player.is_playing()
        && cli.ticks.map_or(true, |limit| player.current_tick() < limit)
    {
        thread::sleep(Duration::from_millis(10));
    }
    player.stop(TrackTarget::All, false);
    info!("stopped after {} ticks", player.current_tick());
    Ok(())
}
