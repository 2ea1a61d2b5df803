//! CLI binary for pdfsimple-client.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `ClientConfig`, runs a `Session` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdfsimple_client::{
    catalog, ClientConfig, Job, JobClient, JobProgressCallback, JobStatus, ProgressCallback, Session,
    SubmitMode, Tool, ToolParams, UploadFile, DEFAULT_API_URL,
};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar counting settled jobs plus one log line
/// per job. Batch items settle out of order; lines are printed as they land.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-job submission times for elapsed reporting.
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    /// Spinner-only until `on_submitted` tells us how many jobs exist.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Uploading");
        bar.set_message("sending files…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} jobs  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.set_message("");
    }

    fn elapsed(&self, job: &Job) -> String {
        let secs = job
            .id
            .as_ref()
            .and_then(|id| self.start_times.lock().ok()?.remove(id))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        dim(&format!("{secs:.1}s"))
    }

    fn print_failure(&self, job: &Job, error: &str) {
        let msg = truncate(error, 80);
        self.bar.println(format!(
            "  {} {:<28}  {}  {}",
            red("✗"),
            label(job),
            red(&msg),
            self.elapsed(job),
        ));
        self.bar.inc(1);
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_submitted(&self, mode: SubmitMode, jobs: &[Job]) {
        self.activate_bar(jobs.len());
        let kind = match mode {
            SubmitMode::Single => "job",
            SubmitMode::Batch => "batch jobs",
        };
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Submitted {} {kind}", jobs.len()))
        ));
        if let Ok(mut times) = self.start_times.lock() {
            for job in jobs {
                if let Some(id) = &job.id {
                    times.insert(id.clone(), Instant::now());
                }
            }
        }
        for job in jobs.iter().filter(|j| j.is_settled()) {
            self.print_failure(job, &job.error_message().unwrap_or_default());
        }
    }

    fn on_status(&self, job: &Job) {
        self.bar.set_message(format!("{} {}", label(job), dim(job.status.as_str())));
    }

    fn on_job_complete(&self, job: &Job) {
        let metrics = job
            .compression
            .map(|c| dim(&c.change().to_string()))
            .unwrap_or_default();
        self.bar.println(format!(
            "  {} {:<28}  {}  {}",
            green("✓"),
            label(job),
            metrics,
            self.elapsed(job),
        ));
        self.bar.inc(1);
    }

    fn on_job_failed(&self, job: &Job, error: &str) {
        self.print_failure(job, error);
    }

    fn on_all_settled(&self, total: usize, completed: usize) {
        let failed = total.saturating_sub(completed);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!("{} {} jobs completed", green("✔"), bold(&completed.to_string()));
        } else {
            eprintln!(
                "{} {}/{} jobs completed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&completed.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

fn label(job: &Job) -> String {
    job.filename
        .clone()
        .or_else(|| job.id.clone())
        .unwrap_or_else(|| job.tool.to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compress one file, save the result in the current directory
  pdfsimple run compress report.pdf

  # Aggressive compression
  pdfsimple run compress report.pdf --set level=high

  # Compress to a target size instead of a preset
  pdfsimple run compress report.pdf --set mode=target --set target_kb=500

  # Merge several files into one job
  pdfsimple run merge a.pdf b.pdf c.pdf -o out/

  # Several files with any other tool run as a batch (one job per file)
  pdfsimple run watermark a.pdf b.pdf --params '{"text":"DRAFT","opacity":0.5}'

  # Inspect or fetch an existing job
  pdfsimple status 3f2a9c1e
  pdfsimple download 3f2a9c1e -o result.pdf

  # List tools and their default parameters
  pdfsimple tools

ENVIRONMENT VARIABLES:
  PDFSIMPLE_API_URL       Service base URL (default http://localhost:8000)
  PDFSIMPLE_MAX_POLLS     Give up on a job after this many status checks
  RUST_LOG                Override the log filter (e.g. pdfsimple_client=debug)
"#;

/// Submit documents to a PDFsimple service and collect the results.
#[derive(Parser, Debug)]
#[command(
    name = "pdfsimple",
    version,
    about = "Submit documents to a PDFsimple service and collect the results",
    long_about = "Upload PDFs and images to a PDFsimple service, run one of its tools \
(merge, split, compress, convert, OCR, watermark, …), follow the job until it settles \
and download the output.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Service base URL.
    #[arg(long, global = true, env = "PDFSIMPLE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFSIMPLE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFSIMPLE_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDFSIMPLE_NO_PROGRESS")]
    no_progress: bool,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, env = "PDFSIMPLE_REQUEST_TIMEOUT", default_value_t = 120)]
    request_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit files with a tool and wait for the result.
    Run(RunArgs),
    /// List available tools and their default parameters.
    Tools {
        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Query a job's status once.
    Status {
        job_id: String,
        /// Output the raw status report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Download a completed job's result.
    Download {
        job_id: String,
        /// Destination file, or a directory to use the service's file name.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Check that the service is up.
    Health,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Tool id: merge, split, compress, convert, ocr, pdf_to_pptx, pdf_to_xlsx,
    /// pdf_to_html, images_to_pdf, watermark, page_numbers, rotate, metadata,
    /// protect, unlock.
    tool: String,

    /// Input files. Several files with any tool except merge run as a batch.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Override one parameter (repeatable), e.g. --set level=high.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Parameter overrides as a JSON object, applied before --set.
    #[arg(long, value_name = "JSON")]
    params: Option<String>,

    /// Directory (or file, for a single job) to save results into.
    #[arg(short, long, env = "PDFSIMPLE_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Leave results on the service; print their URLs only.
    #[arg(long)]
    no_download: bool,

    /// Output structured JSON (session state and saved paths).
    #[arg(long)]
    json: bool,

    /// Give up on a job after this many status checks.
    #[arg(long, env = "PDFSIMPLE_MAX_POLLS")]
    max_polls: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback that matters during `run`;
    // keep library INFO logs out of its way.
    let json_output = matches!(&cli.command, Command::Run(a) if a.json);
    let show_progress = !cli.quiet && !cli.no_progress && !json_output && matches!(cli.command, Command::Run(_));
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Tools { json } => print_tools(json),
        Command::Status { ref job_id, json } => {
            let client = build_client(&cli, None)?;
            let report = client
                .check_status(job_id)
                .await
                .with_context(|| format!("Failed to query job {job_id}"))?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise status")?
                );
            } else {
                println!("Job:      {job_id}");
                println!("Status:   {}", report.status);
                if let Some(ref e) = report.error {
                    println!("Error:    {}", red(e));
                }
                if report.status == JobStatus::Completed {
                    println!("Result:   {}", client.result_url(job_id));
                }
                if let Some(stats) = report.compression() {
                    println!(
                        "Size:     {} → {} bytes ({})",
                        stats.original_size, stats.compressed_size, stats.change()
                    );
                }
            }
            Ok(())
        }
        Command::Download { ref job_id, ref output } => {
            let client = build_client(&cli, None)?;
            let saved = client
                .download(job_id, output)
                .await
                .with_context(|| format!("Failed to download result of job {job_id}"))?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} bytes  →  {}",
                    green("✔"),
                    saved.bytes,
                    bold(&saved.path.display().to_string())
                );
            }
            Ok(())
        }
        Command::Health => {
            let client = build_client(&cli, None)?;
            let health = client.health().await.context("Health check failed")?;
            println!("{} {} is {}", green("✔"), cli.api_url, health.status);
            Ok(())
        }
        Command::Run(ref args) => run(&cli, args, show_progress).await,
    }
}

/// Map global flags (and `--max-polls` for `run`) to a `JobClient`.
fn build_client(cli: &Cli, max_polls: Option<u32>) -> Result<JobClient> {
    let config = ClientConfig::builder()
        .base_url(&cli.api_url)
        .request_timeout_secs(cli.request_timeout)
        .max_polls(max_polls)
        .build()
        .context("Invalid configuration")?;
    JobClient::new(config).context("Failed to build HTTP client")
}

async fn run(cli: &Cli, args: &RunArgs, show_progress: bool) -> Result<()> {
    let tool: Tool = args.tool.parse().context("Unknown tool (see `pdfsimple tools`)")?;
    let params = build_params(tool, args.params.as_deref(), &args.set)?;
    let files = UploadFile::from_paths(&args.files)
        .await
        .context("Failed to read input files")?;

    let mut client = build_client(cli, args.max_polls)?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new_dynamic();
        client = client.with_progress(cb);
    }

    let mut session = Session::new(client.clone(), tool);
    session.set_params(params).context("Invalid parameters")?;
    session.set_files(files);

    tokio::select! {
        r = session.start() => r.context("Submission failed")?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("Interrupted during upload"),
    }

    // Ctrl-C stops polling; jobs keep whatever state they reached.
    let cancel = session.cancellation_token();
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        let interrupted = Arc::clone(&interrupted);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    interrupted.store(true, Ordering::SeqCst);
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
    }

    let state = session.wait().await.clone();
    cancel.cancel();
    if interrupted.load(Ordering::SeqCst) {
        anyhow::bail!("Interrupted; polling stopped");
    }

    let mut saved = Vec::new();
    if !args.no_download {
        let completed: Vec<&Job> = state
            .jobs()
            .into_iter()
            .filter(|j| j.status == JobStatus::Completed)
            .collect();
        // A plain file path only makes sense for a single result.
        let batch = state.mode == Some(SubmitMode::Batch) || completed.len() > 1;
        if batch || args.output.extension().is_none() {
            tokio::fs::create_dir_all(&args.output)
                .await
                .with_context(|| format!("Failed to create {}", args.output.display()))?;
        }
        for job in completed {
            let Some(id) = job.id.as_deref() else { continue };
            // Batch artifacts often share one disposition name.
            let result = if batch {
                client.download_job_into(job, &args.output).await
            } else {
                client.download(id, &args.output).await
            }
            .with_context(|| format!("Failed to download result of job {id}"))?;
            saved.push(result);
        }
    }

    let jobs = state.jobs();
    let failed = jobs.iter().filter(|j| j.is_settled() && j.status != JobStatus::Completed).count();

    if args.json {
        let report = serde_json::json!({
            "tool": tool,
            "state": &state,
            "saved": saved
                .iter()
                .map(|s| serde_json::json!({"path": s.path, "bytes": s.bytes}))
                .collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else {
        if !cli.quiet && !show_progress {
            for job in &jobs {
                match job.error_message() {
                    Some(e) => eprintln!("  {} {}  {}", red("✗"), label(job), e),
                    None => eprintln!("  {} {}  {}", green("✓"), label(job), job.status),
                }
            }
        }
        if !cli.quiet {
            for job in &jobs {
                if let (Some(url), true) = (&job.result_url, args.no_download) {
                    println!("{}  {}", label(job), url);
                }
            }
            for s in &saved {
                eprintln!(
                    "   {}  →  {}",
                    dim(&format!("{} bytes", s.bytes)),
                    bold(&s.path.display().to_string())
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} jobs failed", jobs.len());
    }
    Ok(())
}

fn print_tools(json: bool) -> Result<()> {
    if json {
        let tools: Vec<Value> = catalog()
            .iter()
            .map(|d| {
                serde_json::json!({
                    "tool": d.tool,
                    "name": d.display_name,
                    "description": d.description,
                    "default_params": d.default_params.to_json(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&tools).context("Failed to serialise catalog")?
        );
        return Ok(());
    }
    for d in catalog() {
        println!("{:<14} {:<18} {}", bold(d.tool.as_str()), d.display_name, d.description);
        let defaults = d.default_params.to_json();
        if defaults.as_object().is_some_and(|m| !m.is_empty()) {
            println!("{:<14} {}", "", dim(&defaults.to_string()));
        }
    }
    Ok(())
}

/// Combine `--params` JSON and `--set key=value` pairs onto the tool's defaults.
fn build_params(tool: Tool, json: Option<&str>, sets: &[String]) -> Result<ToolParams> {
    let mut params = ToolParams::default_for(tool);
    if let Some(raw) = json {
        let value: Value = serde_json::from_str(raw).context("--params is not valid JSON")?;
        params = params.with_overrides(value).context("Invalid --params")?;
    }
    if !sets.is_empty() {
        let defaults = params.to_json();
        let mut overrides = serde_json::Map::new();
        for s in sets {
            let (key, raw) = parse_set(s)?;
            let value = parse_set_value(raw, defaults.get(key));
            overrides.insert(key.to_string(), value);
        }
        params = params
            .with_overrides(Value::Object(overrides))
            .context("Invalid --set value")?;
    }
    Ok(params)
}

/// Split `key=value`.
fn parse_set(s: &str) -> Result<(&str, &str)> {
    let (key, value) = s
        .split_once('=')
        .with_context(|| format!("Expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Empty parameter name in '{s}'");
    }
    Ok((key, value.trim()))
}

/// Type a `--set` value after the parameter's current value: strings stay
/// strings (`pages=1`), numbers and booleans are parsed. Unknown keys are
/// inferred.
fn parse_set_value(raw: &str, current: Option<&Value>) -> Value {
    match current {
        Some(Value::String(_)) => Value::String(raw.to_string()),
        _ => {
            if let Ok(b) = raw.parse::<bool>() {
                Value::Bool(b)
            } else if let Ok(i) = raw.parse::<i64>() {
                Value::from(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                Value::from(f)
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_pairs_split_on_first_equals() {
        assert_eq!(parse_set("text=a=b").unwrap(), ("text", "a=b"));
        assert!(parse_set("novalue").is_err());
        assert!(parse_set("=x").is_err());
    }

    #[test]
    fn set_values_follow_current_type() {
        assert_eq!(parse_set_value("1", Some(&json!("all"))), json!("1"));
        assert_eq!(parse_set_value("0.5", Some(&json!(0.3))), json!(0.5));
        assert_eq!(parse_set_value("true", Some(&json!(false))), json!(true));
        assert_eq!(parse_set_value("500", None), json!(500));
        assert_eq!(parse_set_value("fra", None), json!("fra"));
    }

    #[test]
    fn params_json_then_set() {
        let p = build_params(
            Tool::Watermark,
            Some(r#"{"text":"DRAFT","opacity":0.5}"#),
            &["opacity=0.8".to_string()],
        )
        .unwrap();
        let v = p.to_json();
        assert_eq!(v["text"], "DRAFT");
        assert_eq!(v["opacity"], 0.8);
    }

    #[test]
    fn split_pages_stay_strings() {
        let p = build_params(Tool::Split, None, &["pages=3".to_string()]).unwrap();
        assert_eq!(p.to_json()["pages"], "3");
    }

    #[test]
    fn compress_switches_to_target_mode() {
        let sets = ["mode=target".to_string(), "target_kb=500".to_string()];
        let p = build_params(Tool::Compress, None, &sets).unwrap();
        assert_eq!(p.to_json(), json!({"mode": "target", "target_kb": 500}));
    }

    #[test]
    fn cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "pdfsimple", "run", "compress", "a.pdf", "b.pdf", "--set", "level=high", "--no-download",
        ])
        .unwrap();
        match cli.command {
            Command::Run(a) => {
                assert_eq!(a.tool, "compress");
                assert_eq!(a.files.len(), 2);
                assert!(a.no_download);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
