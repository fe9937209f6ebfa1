//! Heron command line
//!
//! Plays a WAV file through the equalizer, records what was played and
//! writes the recording next to the session settings' output path.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use heron_core::{
    AudioBackend, CpalBackend, EqualizerSettings, FrameQueue, OfflineBackend, SessionSettings,
    SourceLoader, StreamController, StreamOutcome, WavRecordingWriter, WavSourceLoader,
};
use heron_dsp::{BandId, EqBand, DEFAULT_Q};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Play a file through a parametric equalizer and record the result
#[derive(Parser, Debug)]
#[command(name = "heron", version)]
#[command(about = "Stream a WAV file through a live equalizer and record it", long_about = None)]
struct Args {
    /// Input WAV file (16- or 24-bit integer PCM)
    input: PathBuf,

    /// Directory the recording is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Recording file name
    #[arg(short, long)]
    file_name: Option<String>,

    #[arg(long)]
    session_name: Option<String>,

    #[arg(long)]
    session_number: Option<u32>,

    /// Frames per callback buffer
    #[arg(long)]
    frame_size: Option<u32>,

    /// Band as id:freq:gain[:q], repeatable; replaces the default bands
    #[arg(short, long = "band", value_parser = parse_band)]
    bands: Vec<EqBand>,

    /// Named preset applied before any --band
    #[arg(short, long)]
    preset: Option<String>,

    /// Gain applied after band mixing (dB)
    #[arg(short, long, allow_hyphen_values = true)]
    global_gain: Option<f64>,

    /// Render without an audio device
    #[arg(long)]
    offline: bool,

    /// Output device name (default device otherwise)
    #[arg(long, conflicts_with = "offline")]
    device: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heron=info,heron_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let interrupt = Arc::new(AtomicBool::new(false));
    install_ctrlc_handler(Arc::clone(&interrupt))?;
    run(&args, interrupt)
}

fn run(args: &Args, interrupt: Arc<AtomicBool>) -> Result<()> {
    let source = WavSourceLoader
        .load(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let session = Arc::new(configure_session(args, &source)?);
    let equalizer = Arc::new(configure_equalizer(args)?);
    let queue = Arc::new(FrameQueue::new());

    let backend: Box<dyn AudioBackend> = if args.offline {
        Box::new(OfflineBackend::new())
    } else if let Some(name) = &args.device {
        Box::new(CpalBackend::with_device_name(name)?)
    } else {
        Box::new(CpalBackend::new()?)
    };

    let mut controller = StreamController::new(backend, source, session, equalizer, queue)?
        .with_interrupt(interrupt);
    if !args.offline {
        watch_stdin(controller.interrupt_handle());
    }

    info!("Starting stream...");
    controller.start_stream().context("Failed to start stream")?;

    if !args.offline {
        info!("Playback and recording in progress, press Enter or Ctrl-C to stop");
    }
    let outcome = controller.streaming();

    // A failed or interrupted session still keeps what was rendered
    let path = controller
        .save_recording(&WavRecordingWriter)
        .context("Failed to write recording")?;
    info!("Recording saved to {}", path.display());

    match outcome {
        StreamOutcome::Completed | StreamOutcome::Interrupted => Ok(()),
        StreamOutcome::Failed(reason) => bail!("Streaming failed: {reason}"),
    }
}

fn configure_session(args: &Args, source: &heron_core::LoadedSource) -> Result<SessionSettings> {
    let session = SessionSettings::new();

    // Stream format follows the input file
    session.set_sampling_rate(source.sample_rate)?;
    session.set_channels(source.channels)?;
    session.set_bit_depth(source.bit_depth.bits())?;

    session
        .set_directory(&args.output_dir)
        .with_context(|| format!("Invalid output directory {}", args.output_dir.display()))?;
    if let Some(name) = &args.file_name {
        session.set_file_name(name)?;
    }
    if let Some(name) = &args.session_name {
        session.set_session_name(name)?;
    }
    if let Some(number) = args.session_number {
        session.set_session_number(number)?;
    }
    if let Some(frames) = args.frame_size {
        session.set_frame_size(frames)?;
    }
    Ok(session)
}

fn configure_equalizer(args: &Args) -> Result<EqualizerSettings> {
    let settings = EqualizerSettings::default();

    if let Some(preset) = &args.preset {
        settings.apply_preset(preset)?;
    }
    if !args.bands.is_empty() {
        if args.preset.is_none() {
            settings.clear_bands();
        }
        for band in &args.bands {
            settings.upsert(*band);
        }
    }
    if let Some(gain) = args.global_gain {
        settings.set_global_gain(gain)?;
    }

    for band in settings.get_bands().values() {
        info!(
            "Band {}: {:.0} Hz, {:+.1} dB, Q {:.2}",
            band.id(),
            band.center_freq(),
            band.gain_db(),
            band.q_factor()
        );
    }
    Ok(settings)
}

/// Route SIGINT to the interrupt flag so the session tears down and saves.
/// A second Ctrl-C while teardown is still running exits at once.
fn install_ctrlc_handler(interrupt: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || on_ctrlc(&interrupt)).context("Failed to install Ctrl-C handler")
}

fn on_ctrlc(interrupt: &AtomicBool) {
    if raise_interrupt(interrupt) {
        std::process::exit(130);
    }
}

/// Raise the flag; true if it was already raised
fn raise_interrupt(interrupt: &AtomicBool) -> bool {
    interrupt.swap(true, Ordering::AcqRel)
}

/// Raise `interrupt` when a line arrives on stdin
fn watch_stdin(interrupt: Arc<AtomicBool>) {
    let spawned = thread::Builder::new()
        .name("heron-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            // EOF (non-interactive stdin) never interrupts
            if let Ok(n) = std::io::stdin().lock().read_line(&mut line) {
                if n > 0 {
                    raise_interrupt(&interrupt);
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Could not watch stdin for stop requests: {}", e);
    }
}

/// Parse `id:freq:gain[:q]`
fn parse_band(value: &str) -> Result<EqBand, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!("expected id:freq:gain[:q], got '{value}'"));
    }

    let id: BandId = parts[0]
        .parse()
        .map_err(|e| format!("bad band id '{}': {e}", parts[0]))?;
    let freq: f64 = parts[1]
        .parse()
        .map_err(|e| format!("bad frequency '{}': {e}", parts[1]))?;
    let gain: f64 = parts[2]
        .parse()
        .map_err(|e| format!("bad gain '{}': {e}", parts[2]))?;
    let q = match parts.get(3) {
        Some(q) => q.parse::<f64>().map_err(|e| format!("bad q '{q}': {e}"))?,
        None => DEFAULT_Q,
    };

    EqBand::new(id, freq, gain, q).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_band() {
        let band = parse_band("2:1000:-3.5").unwrap();
        assert_eq!(band.id(), 2);
        assert_eq!(band.center_freq(), 1000.0);
        assert_eq!(band.gain_db(), -3.5);
        assert_eq!(band.q_factor(), DEFAULT_Q);

        let band = parse_band("7:250:6:2").unwrap();
        assert_eq!(band.q_factor(), 2.0);
    }

    #[test]
    fn test_parse_band_rejects_garbage() {
        assert!(parse_band("1:1000").is_err());
        assert!(parse_band("1:1000:0:1:9").is_err());
        assert!(parse_band("x:1000:0").is_err());
        assert!(parse_band("1:-5:0").is_err());
        assert!(parse_band("1:1000:0:0").is_err());
    }

    #[test]
    fn test_args_with_bands() {
        let args = Args::try_parse_from([
            "heron",
            "in.wav",
            "--band",
            "1:500:-6",
            "--band",
            "2:3000:4:0.7",
            "--global-gain",
            "-2",
            "--offline",
        ])
        .unwrap();
        assert_eq!(args.bands.len(), 2);
        assert_eq!(args.global_gain, Some(-2.0));
        assert!(args.offline);

        let eq = configure_equalizer(&args).unwrap();
        assert_eq!(eq.len(), 2);
        assert_eq!(eq.get_global_gain(), -2.0);
    }

    #[test]
    fn test_preset_and_band_override() {
        let args =
            Args::try_parse_from(["heron", "in.wav", "-p", "flat", "-b", "1:1000:3"]).unwrap();
        let eq = configure_equalizer(&args).unwrap();
        assert_eq!(eq.len(), 1);
        assert_eq!(eq.band(1).unwrap().gain_db(), 3.0);

        let args = Args::try_parse_from(["heron", "in.wav", "-p", "nope"]).unwrap();
        assert!(configure_equalizer(&args).is_err());
    }

    #[test]
    fn test_raise_interrupt_reports_repeat() {
        let flag = AtomicBool::new(false);
        assert!(!raise_interrupt(&flag));
        assert!(flag.load(Ordering::Acquire));
        assert!(raise_interrupt(&flag));
    }

    #[test]
    fn test_ctrlc_handler_installs() {
        // Only one handler per process, so this is the sole installer under test
        install_ctrlc_handler(Arc::new(AtomicBool::new(false))).unwrap();
    }

    #[test]
    fn test_offline_run_writes_recording() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..4800_i32 {
            writer.write_sample(((i % 100) * 50) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let args = Args::try_parse_from([
            OsStr::new("heron"),
            input.as_os_str(),
            OsStr::new("--output-dir"),
            dir.path().as_os_str(),
            OsStr::new("--file-name"),
            OsStr::new("out.wav"),
            OsStr::new("--offline"),
        ])
        .unwrap();
        run(&args, Arc::new(AtomicBool::new(false))).unwrap();

        let reader = hound::WavReader::open(dir.path().join("out.wav")).unwrap();
        assert_eq!(reader.len(), 4800);
        assert_eq!(reader.spec().sample_rate, 48000);
    }
}
