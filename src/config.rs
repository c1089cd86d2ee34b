//! Configuration file schema for phpreflect.
//!
//! Every key is optional; a missing file behaves like an empty one.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::tokenizer::Trivia;

/// The config schema version this build reads.
pub const CONFIG_VERSION: &str = "1";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Schema version; only "1" is understood. Empty means "1".
    #[serde(default)]
    pub version: String,
    /// File extensions treated as PHP sources (default: php, phtml, inc)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns for paths to exclude (e.g., "**/storage/**", "**/*.blade.php")
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Whether to skip vendor/ and node_modules/ directories (default: true)
    #[serde(default = "default_true")]
    pub skip_vendor: bool,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub invocations: InvocationsConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: String::new(),
            extensions: default_extensions(),
            excluded_paths: Vec::new(),
            skip_vendor: true,
            cache: CacheConfig::default(),
            invocations: InvocationsConfig::default(),
            tokens: TokensConfig::default(),
        }
    }
}

/// Reflection cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Reuse reflections of unchanged files within a run (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Persist reflections in the user cache directory (default: false)
    #[serde(default)]
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: false,
        }
    }
}

/// Which invocations to report.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InvocationsConfig {
    /// Regexes matched against the called name; empty reports everything
    #[serde(default)]
    pub include: Vec<String>,
}

/// Token dump settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TokensConfig {
    #[serde(default)]
    pub trivia: Trivia,
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    vec!["php".to_string(), "phtml".to_string(), "inc".to_string()]
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // an empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Whether `path` has one of the configured extensions (case-insensitive).
    pub fn is_source_file(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    /// Check if a path should be excluded based on excluded_paths patterns.
    /// Uses globset for matching, which supports `**` for recursive directory matching.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        if self.excluded_paths.is_empty() {
            return false;
        }

        let path_str = path.to_string_lossy();

        for pattern in &self.excluded_paths {
            if let Ok(glob) = globset::Glob::new(pattern) {
                let matcher = glob.compile_matcher();
                if matcher.is_match(&*path_str) {
                    return true;
                }
            }
        }
        false
    }

    /// Compile the invocation filter, adding `extra` patterns from the command line.
    pub fn invocation_filter(&self, extra: &[String]) -> anyhow::Result<InvocationFilter> {
        let patterns = self
            .invocations
            .include
            .iter()
            .chain(extra)
            .map(|p| {
                Regex::new(p).map_err(|e| anyhow::anyhow!("invalid invocation pattern {:?}: {}", p, e))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(InvocationFilter { patterns })
    }
}

/// Name filter for reported invocations.
#[derive(Debug, Clone, Default)]
pub struct InvocationFilter {
    patterns: Vec<Regex>,
}

impl InvocationFilter {
    /// Matches everything when no patterns are configured.
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(name))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    if !matches!(config.version.as_str(), "" | CONFIG_VERSION) {
        anyhow::bail!(
            "unsupported config version {:?} (expected {:?})",
            config.version,
            CONFIG_VERSION
        );
    }
    if config.extensions.is_empty() {
        anyhow::bail!("extensions must not be empty");
    }
    for ext in &config.extensions {
        if ext.trim_start_matches('.').is_empty() {
            anyhow::bail!("invalid extension {:?}", ext);
        }
    }

    // Validate invocation patterns compile
    config.invocation_filter(&[])?;

    // Validate excluded_paths glob patterns compile
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
