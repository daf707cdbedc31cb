//! CLI binary for papermind.
//!
//! A thin shim over the library crate: flags map to `ClientConfig`, the page
//! is a `PageState` wrapped in a terminal view, and results are printed or
//! written as HTML.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use papermind::report::{encode_png, render_html, render_text, write_output};
use papermind::{
    ClientConfig, FileStore, HttpParseService, PageState, PdfiumRenderer, RenderedPreview,
    ResultItem, SelectedFile, SubmitButton, Theme, UploadController, View,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
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

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Terminal view ────────────────────────────────────────────────────────────

/// `PageState` plus live terminal feedback: a spinner while the submit
/// button is busy and immediate printing of alerts.
struct TerminalView {
    page: PageState,
    spinner: Option<ProgressBar>,
    show_progress: bool,
}

impl TerminalView {
    fn new(show_progress: bool) -> Self {
        Self {
            page: PageState::new(),
            spinner: None,
            show_progress,
        }
    }
}

impl View for TerminalView {
    fn theme(&self) -> Theme {
        self.page.theme()
    }

    fn set_theme(&mut self, theme: Theme) {
        self.page.set_theme(theme);
    }

    fn set_toggle_label(&mut self, label: &str) {
        self.page.set_toggle_label(label);
    }

    fn hide_preview_placeholder(&mut self) {
        self.page.hide_preview_placeholder();
    }

    fn paint_preview(&mut self, preview: RenderedPreview) {
        self.page.paint_preview(preview);
    }

    fn submit_button(&self) -> SubmitButton {
        self.page.submit_button()
    }

    fn set_submit_button(&mut self, button: SubmitButton) {
        if button.enabled {
            if let Some(bar) = self.spinner.take() {
                bar.finish_and_clear();
            }
        } else if self.show_progress && self.spinner.is_none() {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(SPINNER_TICKS),
            );
            bar.set_message(button.label.clone());
            bar.enable_steady_tick(Duration::from_millis(80));
            self.spinner = Some(bar);
        }
        self.page.set_submit_button(button);
    }

    fn alert(&mut self, message: &str) {
        let line = format!("{} {}", red("✘"), bold(message));
        match self.spinner {
            Some(ref bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
        self.page.alert(message);
    }

    fn clear_results(&mut self) {
        self.page.clear_results();
    }

    fn show_empty_results(&mut self, message: &str) {
        self.page.show_empty_results(message);
    }

    fn append_result(&mut self, item: ResultItem) {
        self.page.append_result(item);
    }
}

type Controller = UploadController<TerminalView, FileStore, HttpParseService>;

// ── CLI definition ───────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show or flip the stored theme
  papermind theme
  papermind theme toggle

  # Render the first page of a PDF to a PNG, 640 px wide
  papermind preview paper.pdf -o page1.png --width 640

  # Upload and list the extracted sections
  papermind submit paper.pdf --server http://localhost:8000

  # Preview and upload together, writing the whole page as HTML
  papermind run paper.pdf --html report.html

ENVIRONMENT VARIABLES:
  PAPERMIND_SERVER        Base URL of the PaperMind service
  PAPERMIND_WIDTH         Preview container width in pixels
  PAPERMIND_PREFS         Preference file (theme)
  PDFIUM_LIB_PATH         Existing libpdfium to use; skips the engine download
  PAPERMIND_PDFIUM_CACHE  Cache root for the downloaded engine
  RUST_LOG                Log filter, e.g. papermind=debug
"#;

/// Preview PDFs and list the sections the PaperMind service extracts.
#[derive(Parser, Debug)]
#[command(
    name = "papermind",
    version,
    about = "Preview PDFs and list the sections the PaperMind service extracts",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Base URL of the PaperMind service.
    #[arg(long, global = true, env = "PAPERMIND_SERVER", default_value = "http://127.0.0.1:8000")]
    server: String,

    /// Preview container width in pixels.
    #[arg(long, global = true, env = "PAPERMIND_WIDTH", default_value_t = 800,
          value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,

    /// Submit timeout in seconds.
    #[arg(long, global = true, env = "PAPERMIND_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Preference file holding the theme.
    #[arg(long, global = true, env = "PAPERMIND_PREFS")]
    prefs: Option<PathBuf>,

    /// Existing pdfium library to use.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,

    /// Disable spinners and progress bars.
    #[arg(long, global = true, env = "PAPERMIND_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAPERMIND_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "PAPERMIND_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the stored theme, or toggle it.
    Theme {
        #[arg(value_enum, default_value = "show")]
        action: ThemeAction,
    },

    /// Render the first page of a PDF.
    Preview {
        /// PDF file to preview.
        file: PathBuf,

        /// Write the rendered page to this PNG file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a PDF and list the extracted sections.
    Submit {
        /// PDF file to upload.
        file: PathBuf,

        /// Print the service reply as JSON instead of a list.
        #[arg(long)]
        json: bool,

        /// Also write the page as HTML.
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Preview and upload concurrently.
    Run {
        /// PDF file to preview and upload.
        file: PathBuf,

        /// Write the page (theme, preview, results) as HTML.
        #[arg(long)]
        html: Option<PathBuf>,

        /// Write the rendered first page to this PNG file.
        #[arg(long)]
        preview_out: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ThemeAction {
    Show,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let config = build_config(&cli)?;
    let renderer = Arc::new(PdfiumRenderer::new(config.engine_locator()));
    let controller: Controller = UploadController::new(
        &config,
        TerminalView::new(show_progress),
        FileStore::new(config.preference_path()),
        HttpParseService::new(&config).context("Failed to create HTTP client")?,
        renderer.clone(),
    );
    controller.load();

    match cli.command {
        Command::Theme { ref action } => {
            let theme = match action {
                ThemeAction::Show => controller.applied_theme(),
                ThemeAction::Toggle => controller.toggle_theme(),
            };
            let label = controller.with_view(|v| v.page.toggle_label().to_string());
            println!("{theme}");
            if !cli.quiet {
                eprintln!("{}", dim(&format!("toggle: {label}")));
            }
        }

        Command::Preview { ref file, ref output } => {
            prepare_engine(&renderer, show_progress)?;
            let viewport = controller
                .select_file(file)
                .await
                .with_context(|| format!("Failed to preview {}", file.display()))?;
            let (w, h) = viewport.canvas_size();

            if let Some(path) = output {
                write_canvas(&controller, path).await?;
                if !cli.quiet {
                    eprintln!(
                        "{} {}x{} px (scale {:.3})  →  {}",
                        green("✔"),
                        w,
                        h,
                        viewport.scale,
                        bold(&path.display().to_string())
                    );
                }
            } else {
                println!("{w}x{h} px (scale {:.3})", viewport.scale);
            }
        }

        Command::Submit {
            ref file,
            json,
            ref html,
        } => {
            select(&controller, file)?;
            let response = controller.submit().await.context("Submit failed")?;

            if json {
                let out =
                    serde_json::to_string_pretty(&response).context("Failed to serialise reply")?;
                println!("{out}");
            } else {
                print_results(&controller)?;
            }
            if let Some(path) = html {
                write_html(&controller, path).await?;
            }
        }

        Command::Run {
            ref file,
            ref html,
            ref preview_out,
        } => {
            prepare_engine(&renderer, show_progress)?;
            select(&controller, file)?;
            let (preview, submit) = controller.preview_and_submit().await;

            // Preview problems are logged by the controller and never fatal.
            let painted = matches!(preview, Ok(Some(_)));
            if let Err(ref e) = preview {
                if !cli.quiet {
                    eprintln!("{} {}", dim("preview unavailable:"), dim(&e.to_string()));
                }
            }

            let submitted = submit.is_ok();
            if submitted {
                print_results(&controller)?;
            }
            if let (true, Some(path)) = (painted, preview_out) {
                write_canvas(&controller, path).await?;
            }
            if let Some(path) = html {
                write_html(&controller, path).await?;
                if !cli.quiet {
                    eprintln!("{} page written to {}", green("✔"), bold(&path.display().to_string()));
                }
            }
            submit.context("Submit failed")?;
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .server_url(cli.server.clone())
        .container_width(cli.width)
        .request_timeout_secs(cli.timeout);

    if let Some(ref p) = cli.prefs {
        builder = builder.preference_path(p);
    }
    if let Some(ref p) = cli.pdfium {
        builder = builder.pdfium_lib_path(p);
    }

    builder.build().context("Invalid configuration")
}

/// Download the pdfium engine up front so the user sees a progress bar
/// instead of a silent stall in the first render.
fn prepare_engine(renderer: &PdfiumRenderer, show_progress: bool) -> Result<()> {
    if !show_progress {
        tokio::task::block_in_place(|| renderer.prepare(None))
            .context("Failed to provision the PDF engine")?;
        return Ok(());
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER_TICKS),
    );
    bar.set_prefix("PDF engine");

    let progress = |done: u64, total: Option<u64>| {
        if let Some(t) = total {
            if bar.length() != Some(t) {
                bar.set_length(t);
            }
        }
        bar.set_position(done);
    };
    let result = tokio::task::block_in_place(|| renderer.prepare(Some(&progress)));
    bar.finish_and_clear();
    result.context("Failed to provision the PDF engine")?;
    Ok(())
}

fn select(controller: &Controller, file: &Path) -> Result<()> {
    let selected = SelectedFile::open(file)
        .with_context(|| format!("Cannot select {}", file.display()))?;
    controller.set_selection(selected);
    Ok(())
}

fn print_results(controller: &Controller) -> Result<()> {
    let text = controller.with_view(|v| render_text(&v.page));
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}

async fn write_canvas(controller: &Controller, path: &Path) -> Result<()> {
    let png = controller
        .with_view(|v| v.page.canvas().map(encode_png))
        .context("Nothing was painted on the preview canvas")?
        .context("Failed to encode preview")?;
    write_output(path, &png)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn write_html(controller: &Controller, path: &Path) -> Result<()> {
    let html = controller
        .with_view(|v| render_html(&v.page))
        .context("Failed to render page")?;
    write_output(path, html.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
