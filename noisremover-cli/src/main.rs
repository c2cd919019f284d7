//! `noisremover`: batch noise reduction and normalization for a folder of
//! WAV files.
//!
//! Reads every `*.wav` in the input folder, writes a verbatim
//! `backup_<name>` plus a denoised, normalized mono 16-bit `<name>` to the
//! output folder, then prints one log line per file and a summary.
//!
//! Ctrl+C stops the batch after the file in progress and prints the partial
//! report; a second Ctrl+C aborts immediately.

mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use noisremover_core::{
    report, BatchProcessor, BatchRequest, CancelToken, NormalizationStrategy, ProcessingOptions,
    ReducerHandle, RunResult, SpectralGate,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use settings::{default_settings_path, load_settings, save_settings, AppSettings};

/// Exit status after a second interrupt (128 + SIGINT).
const ABORT_EXIT_CODE: i32 = 130;

/// Command-line arguments for noisremover
#[derive(Parser, Debug)]
#[command(name = "noisremover")]
#[command(about = "Batch noise reduction and loudness normalization for WAV files")]
#[command(version)]
struct Args {
    /// Folder containing the .wav files to process
    input_dir: PathBuf,

    /// Folder receiving processed files and backups (created if missing)
    output_dir: PathBuf,

    /// Normalization strategy: "peak" or "rms" (anything else means peak)
    #[arg(short, long, env = "NOISREMOVER_NORMALIZATION")]
    normalization: Option<String>,

    /// Reference recording of the background noise; pass "" for blind reduction
    #[arg(short = 'p', long, env = "NOISREMOVER_NOISE_PROFILE", value_parser = clap::builder::TypedValueParser::map(clap::builder::OsStringValueParser::new(), PathBuf::from))]
    noise_profile: Option<PathBuf>,

    /// RMS target in (0, 1] used by the "rms" strategy
    #[arg(long)]
    target_rms: Option<f32>,

    /// Print the run result as JSON instead of log lines
    #[arg(long)]
    json: bool,

    /// Settings file (defaults to the per-user settings location)
    #[arg(short, long, env = "NOISREMOVER_CONFIG")]
    config: Option<PathBuf>,

    /// Store the effective options in the settings file before running
    #[arg(long)]
    save_settings: bool,
}

impl Args {
    /// Command-line values override settings.
    fn apply_overrides(&self, settings: &mut AppSettings) {
        if let Some(name) = &self.normalization {
            settings.normalization = NormalizationStrategy::from_name(name).as_str().into();
        }
        if let Some(profile) = &self.noise_profile {
            settings.noise_profile = (!profile.as_os_str().is_empty()).then(|| profile.clone());
        }
        if let Some(target) = self.target_rms {
            settings.target_rms = target;
        }
    }

    fn request(&self, settings: &AppSettings) -> BatchRequest {
        let mut options =
            ProcessingOptions::default().with_normalization_name(&settings.normalization);
        if let Some(profile) = &settings.noise_profile {
            options = options.with_noise_profile(profile);
        }
        options.target_rms = settings.target_rms;

        BatchRequest::new(&self.input_dir, &self.output_dir).with_options(options)
    }
}

/// First interrupt cancels the batch; a second one exits the process.
fn forward_interrupts(mut interrupts: mpsc::Receiver<()>, cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if interrupts.recv().await.is_none() {
            return;
        }
        warn!("interrupt received; stopping after the current file (Ctrl+C again to abort)");
        cancel.cancel();

        if interrupts.recv().await.is_some() {
            warn!("second interrupt; aborting");
            std::process::exit(ABORT_EXIT_CODE);
        }
    })
}

fn listen_for_ctrl_c(tx: mpsc::Sender<()>) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for Ctrl+C: {e}");
                break;
            }
            if tx.send(()).await.is_err() {
                break;
            }
        }
    });
}

/// Runs the blocking batch off the async runtime.
async fn run_batch(processor: BatchProcessor, request: BatchRequest) -> Result<RunResult> {
    let input_dir = request.input_dir.clone();
    tokio::task::spawn_blocking(move || processor.run(&request))
        .await
        .context("batch worker panicked")?
        .with_context(|| format!("batch run over {} failed", input_dir.display()))
}

fn render(result: &RunResult, json: bool) -> Result<String> {
    if json {
        return Ok(report::to_json(result)?);
    }
    let mut lines = report::render_log(result);
    lines.push(report::summary(result));
    Ok(lines.join("\n"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noisremover=info,noisremover_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let settings_path = args.config.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    info!("settings: {}", settings_path.display());
    args.apply_overrides(&mut settings);

    let request = args.request(&settings);
    request.validate().context("invalid request")?;

    if args.save_settings {
        save_settings(&settings_path, &settings).with_context(|| {
            format!("failed to save settings to {}", settings_path.display())
        })?;
        info!("settings saved to {}", settings_path.display());
    }

    let gate = SpectralGate::new(settings.spectral_gate)
        .context("invalid spectral gate settings")?;
    let processor = BatchProcessor::new(ReducerHandle::new(gate));

    let (tx, rx) = mpsc::channel(1);
    listen_for_ctrl_c(tx);
    forward_interrupts(rx, processor.cancel_token());

    let result = run_batch(processor, request).await?;
    println!("{}", render(&result, args.json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn merged(argv: &[&str], mut settings: AppSettings) -> (AppSettings, BatchRequest) {
        let args = parse(argv);
        args.apply_overrides(&mut settings);
        let request = args.request(&settings);
        (settings, request)
    }

    #[test]
    fn settings_fill_in_missing_arguments() {
        let settings = AppSettings {
            normalization: "rms".into(),
            target_rms: 0.3,
            noise_profile: Some(PathBuf::from("room.wav")),
            ..AppSettings::default()
        };
        let (_, request) = merged(&["noisremover", "in", "out"], settings);

        assert_eq!(request.input_dir, PathBuf::from("in"));
        assert_eq!(request.output_dir, PathBuf::from("out"));
        assert_eq!(request.options.normalization, NormalizationStrategy::Rms);
        assert_eq!(request.options.target_rms, 0.3);
        assert_eq!(request.options.noise_profile, Some(PathBuf::from("room.wav")));
    }

    #[test]
    fn arguments_override_settings() {
        let settings = AppSettings {
            normalization: "rms".into(),
            ..AppSettings::default()
        };
        let (settings, request) = merged(
            &[
                "noisremover",
                "in",
                "out",
                "--normalization",
                "bogus",
                "--noise-profile",
                "hum.wav",
                "--target-rms",
                "0.05",
            ],
            settings,
        );

        assert_eq!(settings.normalization, "peak");
        assert_eq!(request.options.normalization, NormalizationStrategy::Peak);
        assert_eq!(request.options.noise_profile, Some(PathBuf::from("hum.wav")));
        assert_eq!(request.options.target_rms, 0.05);
    }

    #[test]
    fn empty_profile_argument_selects_blind_mode() {
        let settings = AppSettings {
            noise_profile: Some(PathBuf::from("room.wav")),
            ..AppSettings::default()
        };
        let (settings, request) = merged(&["noisremover", "in", "out", "-p", ""], settings);
        assert!(settings.noise_profile.is_none());
        assert!(request.options.noise_profile.is_none());
    }

    #[test]
    fn saved_overrides_become_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let (settings, first) = merged(
            &["noisremover", "in", "out", "-n", "rms", "--target-rms", "0.2"],
            AppSettings::default(),
        );
        save_settings(&path, &settings).unwrap();

        let (_, second) = merged(&["noisremover", "in", "out"], load_settings(&path));
        assert_eq!(second, first);
    }

    #[test]
    fn missing_output_dir_is_a_usage_error() {
        assert!(Args::try_parse_from(["noisremover", "in"]).is_err());
    }

    #[tokio::test]
    async fn interrupt_cancels_and_partial_report_is_printed() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.wav"), b"not audio").unwrap();

        let processor = BatchProcessor::new(ReducerHandle::new(SpectralGate::default()));
        let (tx, rx) = mpsc::channel(1);
        let forwarder = forward_interrupts(rx, processor.cancel_token());
        tx.send(()).await.unwrap();
        drop(tx);
        forwarder.await.unwrap();

        let result = run_batch(processor, BatchRequest::new(input.path(), output.path()))
            .await
            .unwrap();
        assert!(result.cancelled);
        assert!(result.entries.is_empty());

        let text = render(&result, false).unwrap();
        assert_eq!(text, "⏹ Cancelled after 0 file(s): 0 processed, 0 failed.");
    }

    #[tokio::test]
    async fn closed_interrupt_channel_leaves_batch_running() {
        let token = CancelToken::new();
        let (tx, rx) = mpsc::channel::<()>(1);
        drop(tx);
        forward_interrupts(rx, token.clone()).await.unwrap();
        assert!(!token.is_cancelled());
    }
}
