//! CLI binary for img2detect.
//!
//! A thin shim over the library crate that maps CLI flags to `ClientConfig`,
//! satisfies the notification port with an indicatif spinner, and saves the
//! returned artifacts to disk.

use anyhow::{bail, Context, Result};
use clap::Parser;
use img2detect::{
    ClientConfig, HttpDetector, Notifier, UploadLifecycle, UploadOutcome, decode_data_uri,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI notifier using indicatif ─────────────────────────────────────────────

/// Terminal notifier: the blocking-progress bracket becomes a spinner pinned
/// to the bottom of the terminal; errors print red through the spinner so
/// they are never overdrawn by a tick.
struct CliNotifier {
    bar: Mutex<Option<ProgressBar>>,
    /// When false (quiet / --no-progress / --json) the spinner is suppressed;
    /// errors still print.
    spinner: bool,
}

impl CliNotifier {
    fn new(spinner: bool) -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            spinner,
        })
    }
}

impl Notifier for CliNotifier {
    fn notify_error(&self, message: &str) {
        let line = format!("{} {}", red("✗"), message);
        match self.bar.lock().unwrap().as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn show_blocking_progress(&self, message: &str) {
        if !self.spinner {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn dismiss_blocking_progress(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Upload a photo, save annotated results next to it
  img2detect photo.jpg

  # TIFF input is converted to PNG automatically before upload
  img2detect scan.tiff -o results/

  # Point at a non-default service
  img2detect photo.jpg --api-url http://detect.internal:8000

  # Raw JSON response on stdout
  img2detect photo.jpg --json

  # Check the service is up, no upload
  img2detect --ping

ENVIRONMENT VARIABLES:
  DETECT_API_URL    Detection-service base URL (default: http://localhost:8000)

OUTPUT:
  For each returned artifact, a file is written to the output directory:
    <input-stem>.patches.png   patch-analysis visualisation
    <input-stem>.result.png    final detection rendering
  A response with no artifacts is valid and exits 0.
"#;

/// Upload an image to a person-detection service and save the results.
#[derive(Parser, Debug)]
#[command(
    name = "img2detect",
    version,
    about = "Upload an image to a person-detection service and save the annotated results",
    long_about = "Upload an image (PNG, JPEG, TIFF, …) to a remote person-detection service. \
TIFF input is decoded and re-encoded as PNG before upload so the payload and the returned \
visualisations stay displayable everywhere.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file to upload (omit with --ping).
    input: Option<PathBuf>,

    /// Directory to write returned artifacts into.
    #[arg(short, long, env = "IMG2DETECT_OUTPUT", default_value = ".")]
    output_dir: PathBuf,

    /// Detection-service base URL.
    #[arg(long, env = "DETECT_API_URL")]
    api_url: Option<String>,

    /// Print the raw JSON response instead of saving artifacts.
    #[arg(long, env = "IMG2DETECT_JSON")]
    json: bool,

    /// Also write the (possibly converted) preview image next to the outputs.
    #[arg(long)]
    preview: bool,

    /// Probe GET /health and exit; no upload.
    #[arg(long)]
    ping: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "IMG2DETECT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "IMG2DETECT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "IMG2DETECT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner owns the terminal;
    // the spinner and the artifact lines are all the feedback that matters.
    let show_spinner = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let notifier = CliNotifier::new(show_spinner);

    let mut builder = ClientConfig::builder().notifier(notifier.clone() as Arc<dyn Notifier>);
    if let Some(ref url) = cli.api_url {
        builder = builder.base_url(url);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Ping mode ────────────────────────────────────────────────────────
    if cli.ping {
        let detector = HttpDetector::new(&config.base_url)?;
        detector
            .health()
            .await
            .with_context(|| format!("Service at {} is not healthy", config.base_url))?;
        if !cli.quiet {
            println!("{} service healthy at {}", green("✔"), bold(&config.base_url));
        }
        return Ok(());
    }

    let Some(ref input) = cli.input else {
        bail!("An image file is required (or use --ping)");
    };

    // ── Select + upload ──────────────────────────────────────────────────
    let mut lifecycle = UploadLifecycle::new(&config)?;

    lifecycle
        .select_file(input)
        .await
        .with_context(|| format!("Failed to ingest '{}'", input.display()))?;

    let selected = lifecycle
        .selection()
        .context("No selection after successful ingest")?;
    if !cli.quiet && !cli.json {
        eprintln!(
            "{} {} ({}, {} bytes)",
            dim("→"),
            bold(&selected.file_name),
            selected.mime_type,
            selected.bytes.len()
        );
    }

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload")
        .to_string();

    if cli.preview {
        write_preview(&lifecycle, &cli.output_dir, &stem).await?;
    }

    match lifecycle.upload().await.context("Upload failed")? {
        UploadOutcome::Applied => {}
        UploadOutcome::Failed => bail!("Detection request failed — please try again"),
        UploadOutcome::Stale => unreachable!("single selection in CLI flow"),
    }

    // ── Present ──────────────────────────────────────────────────────────
    if cli.json {
        let response = lifecycle
            .response()
            .context("No response stored after successful upload")?;
        println!(
            "{}",
            serde_json::to_string_pretty(response).context("Failed to serialise response")?
        );
        return Ok(());
    }

    let artifacts = lifecycle.artifacts();
    if artifacts.is_empty() {
        if !cli.quiet {
            println!("{}", dim("No artifacts returned."));
        }
        return Ok(());
    }

    let mut saved = 0usize;
    for artifact in &artifacts {
        match artifact.save_to(&cli.output_dir, &stem).await? {
            Some(path) => {
                saved += 1;
                if !cli.quiet {
                    println!(
                        "{} {:<16} {}",
                        green("✓"),
                        artifact.kind.label(),
                        bold(&path.display().to_string())
                    );
                }
            }
            None => {
                // Not a data URI; report it verbatim instead of fetching.
                if !cli.quiet {
                    println!("{} {:<16} {}", green("✓"), artifact.kind.label(), artifact.uri);
                }
            }
        }
    }

    if !cli.quiet {
        eprintln!(
            "{} {}/{} artifacts saved to {}",
            green("✔"),
            saved,
            artifacts.len(),
            bold(&cli.output_dir.display().to_string())
        );
    }

    Ok(())
}

/// Write the preview data-URI payload (what the user actually selected, after
/// any TIFF normalisation) next to the detection outputs.
async fn write_preview(
    lifecycle: &UploadLifecycle,
    output_dir: &std::path::Path,
    stem: &str,
) -> Result<()> {
    let preview = lifecycle
        .preview()
        .context("No preview after successful ingest")?;
    let Some((_, bytes)) = decode_data_uri(preview.as_str()) else {
        return Ok(());
    };
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create '{}'", output_dir.display()))?;
    let path = output_dir.join(format!("{stem}.preview.png"));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    Ok(())
}
