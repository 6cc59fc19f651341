use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tempo_sync::input::LineTapSource;
use tempo_sync::playback::AudioDevice;
use tempo_sync::tempo::{IntervalAverage, ManualDetector, StratumDetector, TempoDetector};
use tempo_sync::{
    CorrectionSession, PlaybackController, StretchConfig, SyncConfig, TempoEstimate,
};

#[derive(Parser, Debug)]
#[command(name = "tempo-sync")]
#[command(about = "Match a recording's tempo to a reference BPM without changing pitch", long_about = None)]
struct Args {
    /// Audio file to load at startup
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Reference BPM to correct towards
    #[arg(short = 'r', long)]
    reference: Option<f64>,

    /// Current BPM of the audio (skips tempo detection)
    #[arg(long)]
    bpm: Option<f64>,

    /// Phase vocoder frame size in samples (power of two)
    #[arg(long, default_value = "2048")]
    frame_size: usize,

    /// Minimum BPM for detection range (default: 70)
    #[arg(long, default_value = "70")]
    min_bpm: f32,

    /// Maximum BPM for detection range (default: 170)
    #[arg(long, default_value = "170")]
    max_bpm: f32,

    /// Sample rate for microphone recordings
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Default microphone recording length in seconds
    #[arg(long, default_value = "5")]
    record_secs: f64,

    /// Number of taps collected for tap tempo
    #[arg(long, default_value = "4")]
    taps: usize,

    /// Use the median tap interval instead of the mean
    #[arg(long)]
    median: bool,

    /// Load, detect, correct and exit without the menu (needs --input and --reference)
    #[arg(long)]
    auto: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let average = if args.median {
        IntervalAverage::Median
    } else {
        IntervalAverage::Mean
    };
    let config = SyncConfig::new()
        .with_stretch(StretchConfig::new(args.frame_size)?)
        .with_bpm_range(args.min_bpm, args.max_bpm)
        .with_sample_rate(args.sample_rate)
        .with_record_secs(args.record_secs)
        .with_max_taps(args.taps)
        .with_interval_average(average);

    let detector: Box<dyn TempoDetector> = match args.bpm {
        Some(bpm) => Box::new(ManualDetector::new(bpm)?),
        None => Box::new(StratumDetector::new().with_bpm_range(config.min_bpm, config.max_bpm)),
    };
    let playback = Arc::new(PlaybackController::with_sample_rate(
        open_device(),
        config.sample_rate,
    ));
    let session = CorrectionSession::new(&config, detector, playback);

    if let Some(input) = &args.input {
        let path = PathBuf::from(shellexpand::tilde(input).as_ref());
        session
            .load_audio_file(&path)
            .with_context(|| format!("Failed to load {:?}", path))?;
        session.detect_tempo()?;
    } else if let Some(bpm) = args.bpm {
        session.set_current_bpm(TempoEstimate::manual(bpm)?)?;
    }

    if let Some(reference) = args.reference {
        apply_reference(&session, reference)?;
    }

    if args.auto {
        return run_auto(&session, &args);
    }

    run_menu(&session, &config)?;
    session.stop();
    Ok(())
}

#[cfg(feature = "cpal")]
fn open_device() -> Arc<dyn AudioDevice> {
    Arc::new(tempo_sync::playback::CpalDevice::new())
}

#[cfg(not(feature = "cpal"))]
fn open_device() -> Arc<dyn AudioDevice> {
    log::warn!("Built without the `cpal` feature - playback and recording are silent");
    Arc::new(tempo_sync::playback::NullDevice::new())
}

/// Set the reference from the command line; `false` when there is no
/// current tempo to measure it against yet
fn apply_reference(session: &CorrectionSession, reference: f64) -> Result<bool> {
    if session.current_bpm().is_none() {
        log::warn!(
            "Ignoring --reference {}: no current tempo (pass --input or --bpm)",
            reference
        );
        return Ok(false);
    }
    session.set_reference_bpm(reference)?;
    Ok(true)
}

/// Non-interactive correction of the file given on the command line
fn run_auto(session: &CorrectionSession, args: &Args) -> Result<()> {
    if args.input.is_none() || args.reference.is_none() {
        bail!("--auto needs both --input and --reference");
    }

    let rate = session.auto_correct()?;
    let snapshot = session.snapshot();
    log::info!("Corrected with rate {:.4}", rate);
    log::info!(
        "Duration: {:.2}s -> {:.2}s",
        snapshot.audio_secs.unwrap_or_default(),
        snapshot.corrected_secs.unwrap_or_default()
    );
    Ok(())
}

const MENU: &str = "
Menu:
1 - Tap tempo
2 - Load audio file and detect tempo
3 - Record from microphone and detect tempo
4 - Set reference BPM (show lag)
5 - Auto-correct tempo
6 - Play original audio
7 - Play corrected audio
8 - Stop playback
9 - Show status
0 - Exit";

fn run_menu(session: &CorrectionSession, config: &SyncConfig) -> Result<()> {
    let stdin = io::stdin();

    loop {
        println!("{}", MENU);
        let Some(choice) = prompt(&stdin, "Choice: ")? else {
            return Ok(());
        };

        let outcome = match choice.as_str() {
            "1" => tap(session, &stdin, config.max_taps),
            "2" => load_file(session, &stdin),
            "3" => record(session, &stdin, config.record_secs),
            "4" => set_reference(session, &stdin),
            "5" => session
                .auto_correct()
                .map(|rate| println!("Tempo corrected (rate {:.4})", rate))
                .map_err(Into::into),
            "6" => session.play_original().map_err(Into::into),
            "7" => session.play_corrected().map_err(Into::into),
            "8" => {
                session.stop();
                Ok(())
            }
            "9" => {
                print_status(session);
                Ok(())
            }
            "0" => return Ok(()),
            other => {
                println!("Unknown choice: {:?}", other);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            log::error!("{:#}", e);
        }
    }
}

/// Print `label`, read one trimmed line; `None` at end of input
fn prompt(stdin: &io::Stdin, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn tap(session: &CorrectionSession, stdin: &io::Stdin, max_taps: usize) -> Result<()> {
    println!(
        "Press Enter in time with the music ({} taps, q to finish early)",
        max_taps
    );
    let mut source = LineTapSource::new(stdin.lock(), max_taps);
    let estimate = session.tap_tempo(&mut source)?;
    println!("Tapped BPM: {:.2}", estimate.bpm());
    Ok(())
}

fn load_file(session: &CorrectionSession, stdin: &io::Stdin) -> Result<()> {
    let Some(path) = prompt(stdin, "Audio file path: ")? else {
        return Ok(());
    };
    let path = PathBuf::from(shellexpand::tilde(&path).as_ref());
    session.load_audio_file(&path)?;
    report_detection(session)
}

fn record(session: &CorrectionSession, stdin: &io::Stdin, default_secs: f64) -> Result<()> {
    let label = format!("Recording length in seconds [{}]: ", default_secs);
    let Some(answer) = prompt(stdin, &label)? else {
        return Ok(());
    };
    let secs = if answer.is_empty() {
        default_secs
    } else {
        answer
            .parse::<f64>()
            .with_context(|| format!("Not a number: {:?}", answer))?
    };

    println!("Recording {:.1}s...", secs);
    session.record_audio(secs)?;
    println!("Recording finished");
    report_detection(session)
}

fn report_detection(session: &CorrectionSession) -> Result<()> {
    let estimate = session.detect_tempo()?;
    match estimate.confidence() {
        Some(confidence) => println!(
            "Detected BPM: {:.2} (confidence {:.2})",
            estimate.bpm(),
            confidence
        ),
        None => println!("BPM: {:.2} ({})", estimate.bpm(), estimate.source()),
    }
    Ok(())
}

fn set_reference(session: &CorrectionSession, stdin: &io::Stdin) -> Result<()> {
    if session.current_bpm().is_none() {
        println!("Set the current BPM first (tap, load or record)");
        return Ok(());
    }
    let Some(answer) = prompt(stdin, "Reference BPM: ")? else {
        return Ok(());
    };
    let reference = answer
        .parse::<f64>()
        .with_context(|| format!("Not a number: {:?}", answer))?;
    let lag = session.set_reference_bpm(reference)?;
    println!("Lag: {:.2} ms per beat", lag);
    Ok(())
}

fn print_status(session: &CorrectionSession) {
    let snapshot = session.snapshot();
    let fmt_bpm = |bpm: Option<f64>| bpm.map_or("-".to_string(), |b| format!("{:.2}", b));

    println!("State:         {}", snapshot.state);
    println!("Current BPM:   {}", fmt_bpm(snapshot.current_bpm));
    println!("Reference BPM: {}", fmt_bpm(snapshot.reference_bpm));
    println!("Lag:           {:.2} ms", snapshot.lag_ms);
    if let Some(secs) = snapshot.audio_secs {
        println!("Audio:         {:.1}s", secs);
    }
    if let Some(secs) = snapshot.corrected_secs {
        println!("Corrected:     {:.1}s", secs);
    }
    println!("Device:        {}", session.playback().state());
}
