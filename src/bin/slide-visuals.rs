//! CLI binary for slide-visuals.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slide_visuals::{
    extract, extract_to_file, inspect_with_config, ExtractionConfig, ExtractionOutput,
    ExtractionProgressCallback, ProgressCallback, ShapeKind, SlideSelection, DEFAULT_DOCUMENT_TITLE,
    DEFAULT_OUTPUT_FILE_NAME, DEFAULT_SERVICE_URL,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while the deck is parsed and
/// converted, then a bar over the qualifying slides.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading deck…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, selected_slides: usize) {
        self.bar
            .set_message(format!("Classifying shapes on {selected_slides} slides…"));
    }

    fn on_slides_detected(&self, visual_slides: &[usize]) {
        if !visual_slides.is_empty() {
            self.bar.println(format!(
                "{} {}",
                cyan("◆"),
                bold(&format!("Slides with visual elements: {visual_slides:?}"))
            ));
        }
        self.bar.set_prefix("Converting");
        self.bar.set_message("Waiting for the conversion service…");
        self.bar.set_length(visual_slides.len() as u64);
    }

    fn on_conversion_complete(&self, pdf_len: usize, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} PPT to PDF conversion successful  {}",
            green("✓"),
            dim(&format!(
                "{} KB, {:.1}s",
                pdf_len / 1024,
                elapsed_ms as f64 / 1000.0
            )),
        ));
        let total = self.bar.length().unwrap_or(0) as usize;
        self.activate_bar(total);
    }

    fn on_slide_rendered(&self, slide_number: usize, total: usize, png_len: usize) {
        self.bar.println(format!(
            "  {} Slide {:>3}  {}",
            green("✓"),
            slide_number,
            dim(&format!("{:>6} KB", png_len / 1024)),
        ));
        self.bar.set_length(total as u64);
        self.bar.inc(1);
    }

    fn on_slide_skipped(&self, slide_number: usize, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Slide {:>3}  {}",
            yellow("⚠"),
            slide_number,
            yellow(reason),
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, visual_slides: usize, rendered: usize) {
        self.bar.finish_and_clear();
        if visual_slides == 0 {
            eprintln!("{} No slides with visual elements found.", cyan("◆"));
            return;
        }
        let skipped = self.skipped.load(Ordering::SeqCst);
        if skipped == 0 {
            eprintln!(
                "{} {} slides rendered",
                green("✔"),
                bold(&rendered.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} slides rendered  ({} without a PDF page)",
                yellow("⚠"),
                bold(&rendered.to_string()),
                visual_slides,
                yellow(&skipped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract visual slides into slides_with_visual_elements.docx
  slide-visuals deck.pptx

  # Choose the output file and also keep one PNG per slide
  slide-visuals deck.pptx -o visuals.docx --images-dir ./slides

  # Only look at slides 3 to 12, at print resolution
  slide-visuals --slides 3-12 --dpi 200 deck.pptx

  # Count charts and tables only
  slide-visuals --visual-kinds chart,table deck.pptx

  # Show the shape inventory without converting anything
  slide-visuals --inspect-only deck.pptx

  # Download a deck and print the result as JSON
  slide-visuals --json https://example.com/q3-review.pptx > result.json

  # Start the browser UI on http://127.0.0.1:8501
  slide-visuals --serve

SHAPE KINDS:
  picture, table, chart, group, auto-shape, freeform   (default visual kinds)
  text-box, placeholder, media, diagram, ole-object,
  connector, content-part, other

ENVIRONMENT VARIABLES:
  SLIDE_VISUALS_SERVICE_URL   Conversion endpoint (PPTX body in, PDF out)
  PDFIUM_LIB_PATH             Path to an existing libpdfium
  RUST_LOG                    Override the log filter (e.g. slide_visuals=debug)

SETUP:
  Rendering needs the pdfium shared library. Download a build for your
  platform from https://github.com/bblanchon/pdfium-binaries/releases and
  either put libpdfium next to the working directory or point
  PDFIUM_LIB_PATH at it.
"#;

/// Extract the slides with pictures, tables, charts and drawings from a PowerPoint deck.
#[derive(Parser, Debug)]
#[command(
    name = "slide-visuals",
    version,
    about = "Extract slides with visual elements from a PowerPoint deck into a Word document",
    long_about = "Finds the slides of a .pptx deck that carry pictures, tables, charts, grouped \
shapes, auto shapes or freeforms, converts the deck to PDF through a conversion service, renders \
those slides as images and writes them into a .docx, one heading per slide.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .pptx file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "serve")]
    input: Option<String>,

    /// Write the Word document to this file.
    #[arg(short, long, env = "SLIDE_VISUALS_OUTPUT", default_value = DEFAULT_OUTPUT_FILE_NAME)]
    output: PathBuf,

    /// Also write one PNG per slide into this directory.
    #[arg(long, env = "SLIDE_VISUALS_IMAGES_DIR")]
    images_dir: Option<PathBuf>,

    /// Conversion service endpoint.
    #[arg(long, env = "SLIDE_VISUALS_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    service_url: String,

    /// Rendering DPI (72–400).
    #[arg(long, env = "SLIDE_VISUALS_DPI", default_value_t = 72,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Cap on the longest edge of a rendered slide, in pixels.
    #[arg(long, env = "SLIDE_VISUALS_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Picture width in the Word document, in inches.
    #[arg(long, env = "SLIDE_VISUALS_IMAGE_WIDTH", default_value_t = 6.0)]
    image_width: f32,

    /// Level-1 heading of the Word document.
    #[arg(long, env = "SLIDE_VISUALS_TITLE", default_value = DEFAULT_DOCUMENT_TITLE)]
    title: String,

    /// Slide selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "SLIDE_VISUALS_SLIDES", default_value = "all")]
    slides: String,

    /// Comma-separated shape kinds that make a slide qualify.
    #[arg(long, env = "SLIDE_VISUALS_VISUAL_KINDS", value_delimiter = ',')]
    visual_kinds: Vec<ShapeKind>,

    /// Conversion request timeout in seconds.
    #[arg(long, env = "SLIDE_VISUALS_CONVERSION_TIMEOUT", default_value_t = 120)]
    conversion_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "SLIDE_VISUALS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Print the shape inventory only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "SLIDE_VISUALS_JSON")]
    json: bool,

    /// Serve the browser UI instead of processing a file.
    #[arg(long)]
    serve: bool,

    /// Address for --serve.
    #[arg(long, env = "SLIDE_VISUALS_LISTEN", default_value = "127.0.0.1:8501")]
    listen: std::net::SocketAddr,

    /// Largest accepted upload for --serve, in MiB.
    #[arg(long, env = "SLIDE_VISUALS_MAX_UPLOAD_MB", default_value_t = 64,
          value_parser = clap::value_parser!(u16).range(1..=4096))]
    max_upload_mb: u16,

    /// Disable progress bar.
    #[arg(long, env = "SLIDE_VISUALS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDE_VISUALS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDE_VISUALS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; the server always logs requests.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.serve;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.inspect_only {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Server mode ──────────────────────────────────────────────────────
    if cli.serve {
        return serve(&cli, config).await;
    }

    let input = cli
        .input
        .as_deref()
        .context("An input file or URL is required")?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect_with_config(input, &config)
            .await
            .context("Failed to inspect deck")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            println!("File:          {}", input);
            println!("Slides:        {}", summary.slide_count);
            println!("Visual slides: {:?}", summary.visual_slides);
            for slide in &summary.slides {
                let kinds: Vec<&str> = slide.shape_kinds.iter().map(|k| k.as_str()).collect();
                println!(
                    "  {} {:>3}{}  {}",
                    if slide.visual { green("●") } else { dim("○") },
                    slide.number,
                    if slide.hidden { " (hidden)" } else { "" },
                    if kinds.is_empty() {
                        dim("(no shapes)")
                    } else {
                        kinds.join(", ")
                    },
                );
            }
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    if cli.images_dir.is_none() && !cli.json {
        let stats = extract_to_file(input, &cli.output, &config)
            .await
            .context("Extraction failed")?;

        if !cli.quiet {
            if stats.rendered_slides == 0 {
                if !show_progress {
                    eprintln!("No slides with visual elements found.");
                }
            } else {
                eprintln!(
                    "{}  {}/{} slides  {}ms  →  {}",
                    green("✔"),
                    stats.rendered_slides,
                    stats.total_slides,
                    stats.total_duration_ms,
                    bold(&cli.output.display().to_string()),
                );
            }
        }
        return Ok(());
    }

    let output = extract(input, &config).await.context("Extraction failed")?;
    write_outputs(&cli, &output).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        if output.visual_slides.is_empty() {
            eprintln!("No slides with visual elements found.");
        } else {
            eprintln!(
                "Slides with visual elements: {:?}  ({} rendered in {}ms)",
                output.visual_slides, output.stats.rendered_slides, output.stats.total_duration_ms
            );
        }
    }

    Ok(())
}

/// Write the document and, when asked for, one PNG per slide.
async fn write_outputs(cli: &Cli, output: &ExtractionOutput) -> Result<()> {
    if let Some(ref document) = output.document {
        write_file(&cli.output, document).await?;
    }

    if let Some(ref dir) = cli.images_dir {
        for image in &output.images {
            let path = dir.join(format!("slide_{:03}.png", image.slide_number));
            write_file(&path, &image.png).await?;
        }
    }
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    slide_visuals::write_atomic(path, bytes.to_vec())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(feature = "server")]
async fn serve(cli: &Cli, config: ExtractionConfig) -> Result<()> {
    if !cli.quiet {
        eprintln!(
            "{} Open {} in a browser",
            cyan("◆"),
            bold(&format!("http://{}", cli.listen))
        );
    }
    slide_visuals::server::serve(cli.listen, config, usize::from(cli.max_upload_mb) << 20)
        .await
        .with_context(|| format!("Server on {} stopped", cli.listen))
}

#[cfg(not(feature = "server"))]
async fn serve(_cli: &Cli, _config: ExtractionConfig) -> Result<()> {
    anyhow::bail!("This build has no web UI; rebuild with `--features server`")
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let slides = parse_slides(&cli.slides)?;

    let mut builder = ExtractionConfig::builder()
        .service_url(cli.service_url.clone())
        .conversion_timeout_secs(cli.conversion_timeout)
        .download_timeout_secs(cli.download_timeout)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .image_width_inches(cli.image_width)
        .document_title(cli.title.clone())
        .slides(slides);

    if !cli.visual_kinds.is_empty() {
        builder = builder.visual_kinds(cli.visual_kinds.iter().copied());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--slides` string into `SlideSelection`.
fn parse_slides(s: &str) -> Result<SlideSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(SlideSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start slide in range")?;
        let end: usize = end.trim().parse().context("Invalid end slide in range")?;

        if start < 1 {
            anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid slide range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(SlideSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let slides: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid slide number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&bad) = slides.iter().find(|&&p| p < 1) {
            anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", bad);
        }

        return Ok(SlideSelection::Set(slides));
    }

    // Single slide: "5"
    let slide: usize = s.parse().context("Invalid slide number")?;
    if slide < 1 {
        anyhow::bail!("Slides are 1-indexed, minimum is 1 (got {})", slide);
    }

    Ok(SlideSelection::Single(slide))
}
