//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use rstindex_core::pipeline::{BuildResult, ProgressReporter};
use rstindex_discovery::DiscoveryOptions;
use rstindex_shared::{
    AppConfig, BuildOptions, init_config, load_config, load_config_from, load_index_file,
    validate_config,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// rstindex — generate reStructuredText API reference indexes.
#[derive(Parser)]
#[command(
    name = "rstindex",
    version,
    about = "Generate reStructuredText automodule indexes for a Python package.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.rstindex/rstindex.toml).
    #[arg(long, global = true, env = "RSTINDEX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Render a single package page from an index file to stdout.
    Render {
        /// Index file (TOML).
        #[arg(long)]
        index: PathBuf,

        /// Package to render (defaults to the index root).
        #[arg(short, long)]
        package: Option<String>,
    },

    /// Write every page of an index file to the output directory.
    Build {
        /// Index file (TOML).
        #[arg(long)]
        index: PathBuf,

        /// Output directory (defaults to config `output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Remove pages from a previous build that are no longer produced.
        #[arg(long)]
        prune: bool,
    },

    /// Discover a Python package on disk and build its pages.
    Scan {
        /// Package directory (must contain __init__.py).
        dir: PathBuf,

        /// Output directory (defaults to config `output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Remove pages from a previous build that are no longer produced.
        #[arg(long)]
        prune: bool,

        /// Print the discovered index as TOML instead of building.
        #[arg(long)]
        emit_index: bool,

        /// Include names starting with an underscore.
        #[arg(long)]
        include_private: bool,

        /// Extra exclude regex (can be specified multiple times).
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Verify a previously built output directory.
    Check {
        /// Output directory containing manifest.json.
        dir: PathBuf,

        /// Print the manifest as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "rstindex=info",
        1 => "rstindex=debug",
        _ => "rstindex=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so `render` output stays pipeable
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Render { index, package } => cmd_render(config_path, &index, package.as_deref()),
        Command::Build { index, out, prune } => cmd_build(config_path, &index, out, prune),
        Command::Scan {
            dir,
            out,
            prune,
            emit_index,
            include_private,
            exclude,
        } => cmd_scan(
            config_path,
            &dir,
            ScanFlags {
                out,
                prune,
                emit_index,
                include_private,
                exclude,
            },
        ),
        Command::Check { dir, json } => cmd_check(&dir, json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load and validate the config, from `--config` if given.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    validate_config(&config)?;
    Ok(config)
}

/// Merge config values with CLI overrides.
fn resolve_options(config: &AppConfig, out: Option<PathBuf>, prune: bool) -> BuildOptions {
    let mut opts = BuildOptions::from(config);
    if let Some(out) = out {
        opts.output_dir = out;
    }
    opts.prune = prune;
    opts.tool_version = env!("CARGO_PKG_VERSION").to_string();
    opts
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_render(config_path: Option<&Path>, index_path: &Path, package: Option<&str>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let index = load_index_file(index_path)?;

    let name = package.unwrap_or(&index.root);
    let entry = index
        .package(name)
        .ok_or_else(|| eyre!("package '{name}' not found in {}", index_path.display()))?;

    info!(package = name, "rendering package page");

    let page = rstindex_core::index::render_package(entry, &config.automodule)?;
    print!("{}", page.content);
    Ok(())
}

fn cmd_build(
    config_path: Option<&Path>,
    index_path: &Path,
    out: Option<PathBuf>,
    prune: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let index = load_index_file(index_path)?;
    let opts = resolve_options(&config, out, prune);

    info!(
        index = %index_path.display(),
        out = %opts.output_dir.display(),
        prune,
        "building reference pages"
    );

    let reporter = CliProgress::new();
    let result = rstindex_core::pipeline::build_from_index(&index, &opts, &reporter)?;
    print_summary(&result);
    Ok(())
}

/// CLI flags for `scan`, grouped to keep the handler signature short.
struct ScanFlags {
    out: Option<PathBuf>,
    prune: bool,
    emit_index: bool,
    include_private: bool,
    exclude: Vec<String>,
}

fn cmd_scan(config_path: Option<&Path>, dir: &Path, flags: ScanFlags) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    config.discovery.include_private |= flags.include_private;
    config.discovery.exclude_patterns.extend(flags.exclude);

    let discovery = DiscoveryOptions::from_config(&config.discovery)?;
    let tree = rstindex_discovery::discover_package(dir, &discovery)?;

    if flags.emit_index {
        let toml_str = toml::to_string_pretty(&tree.to_index_file())?;
        print!("{toml_str}");
        return Ok(());
    }

    let opts = resolve_options(&config, flags.out, flags.prune);

    info!(
        dir = %dir.display(),
        root = %tree.name,
        out = %opts.output_dir.display(),
        "building reference pages from discovered package"
    );

    let reporter = CliProgress::new();
    let result = rstindex_core::pipeline::build_from_tree(&tree, &opts, &reporter)?;
    print_summary(&result);
    Ok(())
}

fn cmd_check(dir: &Path, json: bool) -> Result<()> {
    let manifest = rstindex_core::assembler::validate_output(dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
    } else {
        println!(
            "{}: {} files OK (root {}, generated {} by rstindex {})",
            dir.display(),
            manifest.files.len(),
            manifest.root,
            manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            manifest.tool_version
        );
        if !manifest.stale.is_empty() {
            println!(
                "  {} stale file(s) kept from earlier builds; rebuild with --prune to remove",
                manifest.stale.len()
            );
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn print_summary(result: &BuildResult) {
    println!();
    println!("  Reference pages built!");
    println!("  Root:      {}", result.root);
    println!("  Packages:  {}", result.package_count);
    println!("  Written:   {}", result.written);
    println!("  Unchanged: {}", result.unchanged);
    println!("  Removed:   {}", result.removed);
    println!("  Path:      {}", result.output_dir.display());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_rendered(&self, filename: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Rendering [{current}/{total}] {filename}"));
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}
