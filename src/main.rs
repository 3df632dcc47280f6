//! ClearPath daemon entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clearpath::audio::{AudioCapture, AudioPlayback};
use clearpath::detection::{DetectionClient, ObstacleSnapshot, PeopleSnapshot};
use clearpath::speech::{HttpSynthesizer, Synthesizer};
use clearpath::{Config, Daemon};

#[derive(Parser)]
#[command(name = "clearpath", version, about = "Voice-controlled navigation assistant")]
struct Cli {
    /// Path to the config file (default: ~/.config/clearpath/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Run without microphone or speaker access
    #[arg(long)]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Record from the microphone and report input levels
    TestMic {
        /// Recording duration in seconds
        #[arg(long, default_value_t = 3)]
        duration: u64,
    },
    /// Play a short test tone on the default output device
    TestSpeaker,
    /// Synthesize and speak a phrase
    TestSpeech {
        /// Text to speak
        text: String,
    },
    /// Send one image through a detection endpoint and print the result
    TestDetect {
        /// Path to a JPEG image
        image: PathBuf,
        /// Which endpoint to exercise: "walking" or "interaction"
        #[arg(long, default_value = "walking")]
        mode: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,clearpath=debug",
        _ => "debug,clearpath=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let mut config = Config::load(cli.config.as_ref()).context("loading configuration")?;
    if cli.disable_voice {
        config.voice.enabled = false;
    }

    match cli.command {
        None => Daemon::new(config).run().await.context("running daemon")?,
        Some(Command::TestMic { duration }) => test_mic(duration)?,
        Some(Command::TestSpeaker) => test_speaker()?,
        Some(Command::TestSpeech { text }) => test_speech(&config, &text).await?,
        Some(Command::TestDetect { image, mode }) => test_detect(&config, &image, &mode).await?,
    }

    Ok(())
}

/// Record for `duration` seconds and print an RMS level meter
fn test_mic(duration: u64) -> anyhow::Result<()> {
    let mut capture = AudioCapture::new();
    capture.start().context("starting microphone capture")?;
    println!("Recording for {duration}s...");

    for second in 1..=duration {
        std::thread::sleep(std::time::Duration::from_secs(1));
        let samples = capture.drain();
        let rms = if samples.is_empty() {
            0.0
        } else {
            (samples.iter().map(|s| f64::from(*s) * f64::from(*s)).sum::<f64>()
                / samples.len() as f64)
                .sqrt()
        };
        let bars = "#".repeat((rms * 200.0).min(50.0) as usize);
        println!("{second:>3}s  rms={rms:.4}  {bars}");
    }

    capture.stop();
    Ok(())
}

/// Play one second of a 440Hz sine tone
fn test_speaker() -> anyhow::Result<()> {
    let playback = AudioPlayback::new().context("opening output device")?;

    let sample_rate = 24000.0;
    let samples: Vec<f32> = (0..24000)
        .map(|i| {
            let t = f64::from(i) / sample_rate;
            (0.3 * (2.0 * std::f64::consts::PI * 440.0 * t).sin()) as f32
        })
        .collect();

    println!("Playing test tone...");
    playback.play(samples).context("playing test tone")?;
    Ok(())
}

/// Synthesize and speak one phrase through the configured TTS backend
async fn test_speech(config: &Config, text: &str) -> anyhow::Result<()> {
    let synth = HttpSynthesizer::new(&config.voice).context("building synthesizer")?;
    println!("Speaking: {text}");
    synth.speak(text).await.context("speaking")?;
    Ok(())
}

/// Run one image through a detection endpoint and print the normalized
/// snapshot
async fn test_detect(config: &Config, image: &PathBuf, mode: &str) -> anyhow::Result<()> {
    let frame = std::fs::read(image).context("reading image")?;
    let client = DetectionClient::new(&config.detection).context("building detection client")?;

    match mode {
        "walking" => {
            let snapshot: Option<ObstacleSnapshot> = client.analyze_walking(frame).await?;
            println!("{snapshot:#?}");
        }
        "interaction" => {
            let snapshot: Option<PeopleSnapshot> = client.analyze_interaction(frame).await?;
            println!("{snapshot:#?}");
        }
        other => anyhow::bail!("unknown mode {other:?} (expected walking or interaction)"),
    }

    Ok(())
}
