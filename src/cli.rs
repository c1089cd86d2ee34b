//! Command-line interface for phpreflect.

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::cache::ReflectionCache;
use crate::config::{self, Config};
use crate::reflector::Reflector;
use crate::report;
use crate::tokenizer::{self, Trivia};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["phpreflect.yaml", ".phpreflect.yaml", "phpreflect.yml"];

/// Static reflection for PHP sources.
///
/// Lists the classes, interfaces, traits, enums and functions declared in
/// PHP files, and every call-site with its classified arguments, without
/// running PHP.
#[derive(Parser)]
#[command(name = "phpreflect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reflect a file or directory tree
    Reflect(ReflectArgs),
    /// Dump the token stream of a file
    Tokens(TokensArgs),
    /// Create a phpreflect config file from a template
    Init(InitArgs),
}

/// Arguments for the reflect command.
#[derive(Parser)]
pub struct ReflectArgs {
    /// Path to reflect (file or directory)
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Only report invocations whose name matches this regex (repeatable)
    #[arg(long = "call", value_name = "REGEX")]
    pub calls: Vec<String>,

    /// Reflect every file from scratch
    #[arg(long)]
    pub no_cache: bool,
}

/// Arguments for the tokens command.
#[derive(Parser)]
pub struct TokensArgs {
    /// File to tokenize
    pub file: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Drop whitespace and comments
    #[arg(long)]
    pub no_trivia: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "phpreflect.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available config templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "All PHP sources, every invocation, in-memory cache",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "translations",
        description: "Translator calls only, persistent cache",
        content: include_str!("templates/translations.yaml"),
    },
];

/// Discover a config file in the current directory.
fn discover_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_NAMES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Load the explicit config, a discovered one, or the defaults.
///
/// Returns the config and the path it was read from.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<(Config, Option<PathBuf>)> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => discover_config(),
    };
    let Some(path) = path else {
        debug!("no config file found, using defaults");
        return Ok((Config::default(), None));
    };

    let config = Config::parse_file(&path)
        .map_err(|e| anyhow!("parsing config {}: {}", path.display(), e))?;
    config::validate(&config)
        .map_err(|e| anyhow!("invalid config {}: {}", path.display(), e))?;
    debug!(path = %path.display(), "loaded config");
    Ok((config, Some(path)))
}

/// Collect PHP source files under `root`.
pub fn collect_files(root: &Path, config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            // Skip hidden directories
            if name.starts_with('.') {
                return false;
            }
            !(config.skip_vendor && (name == "vendor" || name == "node_modules"))
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if config.is_source_file(path) && !config.is_path_excluded(relative) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Report a command error on stderr and yield the error exit code.
fn fail(err: impl std::fmt::Display) -> anyhow::Result<i32> {
    eprintln!("Error: {}", err);
    Ok(EXIT_ERROR)
}

fn check_format(format: &str) -> anyhow::Result<()> {
    match format {
        "pretty" | "json" => Ok(()),
        other => bail!("invalid format {:?}, must be 'pretty' or 'json'", other),
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template("  {bar:40.cyan/blue} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

/// Run the reflect command.
pub fn run_reflect(args: &ReflectArgs) -> anyhow::Result<i32> {
    if let Err(e) = check_format(&args.format) {
        return fail(e);
    }

    let (config, config_path) = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => return fail(e),
    };

    let filter = match config.invocation_filter(&args.calls) {
        Ok(f) => f,
        Err(e) => return fail(e),
    };

    let metadata = match std::fs::metadata(&args.path) {
        Ok(m) => m,
        Err(e) => return fail(format!("cannot access path {:?}: {}", args.path, e)),
    };

    let files = if metadata.is_dir() {
        collect_files(&args.path, &config)?
    } else {
        vec![args.path.clone()]
    };

    if files.is_empty() {
        eprintln!("Warning: no files to reflect");
        return Ok(EXIT_SUCCESS);
    }

    let mut reflector = if args.no_cache || !config.cache.enabled {
        Reflector::new()
    } else if config.cache.persist {
        Reflector::with_cache(ReflectionCache::persistent())
    } else {
        Reflector::with_cache(ReflectionCache::new())
    };
    if args.format == "pretty" && files.len() > 1 {
        reflector = reflector.progress(progress_bar(files.len()));
    }

    let batch = reflector.reflect_files(&files);

    let path_str = args.path.to_string_lossy().to_string();
    let config_str = config_path.map(|p| p.to_string_lossy().to_string());
    match args.format.as_str() {
        "json" => report::write_json(&path_str, config_str.as_deref(), &batch, &filter)?,
        _ => report::write_pretty(&path_str, config_str.as_deref(), &batch, &filter),
    }

    if batch.has_failures() {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the tokens command.
pub fn run_tokens(args: &TokensArgs) -> anyhow::Result<i32> {
    if let Err(e) = check_format(&args.format) {
        return fail(e);
    }

    let (config, _) = match load_config(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => return fail(e),
    };

    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => return fail(format!("cannot read {}: {}", args.file.display(), e)),
    };

    let trivia = if args.no_trivia {
        Trivia::Discard
    } else {
        config.tokens.trivia
    };
    let tokens = tokenizer::tokenize_with(&source, trivia);

    match args.format.as_str() {
        "json" => report::write_tokens_json(&tokens)?,
        _ => report::write_tokens_pretty(&tokens),
    }

    Ok(EXIT_SUCCESS)
}

/// Create `output` from `template`, refusing to overwrite an existing file.
fn write_template(template: &Template, output: &Path) -> anyhow::Result<()> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => {
                anyhow!("{} exists, pass --output to write elsewhere", output.display())
            }
            _ => anyhow!("cannot create {}: {}", output.display(), e),
        })?;
    file.write_all(template.content.as_bytes())
        .with_context(|| format!("cannot write {}", output.display()))
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        print_templates();
        return Ok(EXIT_SUCCESS);
    }

    let Some(template) = TEMPLATES.iter().find(|t| t.name == args.template) else {
        let names: Vec<&str> = TEMPLATES.iter().map(|t| t.name).collect();
        return fail(format!(
            "no template named {:?} (one of: {})",
            args.template,
            names.join(", ")
        ));
    };

    if let Err(e) = write_template(template, &args.output) {
        return fail(e);
    }
    info!(output = %args.output.display(), template = template.name, "config written");
    println!(
        "Wrote {} ({}). Reflect with: phpreflect reflect <path> --config {}",
        args.output.display(),
        template.name,
        args.output.display()
    );
    Ok(EXIT_SUCCESS)
}

fn print_templates() {
    for template in TEMPLATES {
        println!("{:<14} {}", template.name, template.description);
    }
}
