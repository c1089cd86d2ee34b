//! Batch reflection of many files.
//!
//! Files are reflected in parallel with rayon. A file that cannot be read or
//! is malformed is reported in its own result and never aborts the batch.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::cache::ReflectionCache;
use crate::reflection::{ReflectionError, ReflectionFile};

/// Outcome of reflecting one file.
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub result: Result<Arc<ReflectionFile>, ReflectionError>,
}

impl FileResult {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Results of a batch, sorted by path.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub files: Vec<FileResult>,
}

impl BatchResult {
    pub fn reflected(&self) -> impl Iterator<Item = &ReflectionFile> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().ok().map(|r| r.as_ref()))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &ReflectionError)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().err().map(|e| (f.path.as_path(), e)))
    }

    pub fn has_failures(&self) -> bool {
        self.files.iter().any(|f| !f.is_ok())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Reflects files, optionally through a shared cache.
#[derive(Default)]
pub struct Reflector {
    cache: Option<ReflectionCache>,
    progress: Option<ProgressBar>,
}

impl Reflector {
    /// Reflector without caching.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: ReflectionCache) -> Self {
        Self {
            cache: Some(cache),
            progress: None,
        }
    }

    /// Tick `bar` once per finished file.
    pub fn progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn cache(&self) -> Option<&ReflectionCache> {
        self.cache.as_ref()
    }

    /// Read and reflect a single file.
    pub fn reflect_file(&self, path: &Path) -> Result<Arc<ReflectionFile>, ReflectionError> {
        let start = Instant::now();
        let filename = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|source| ReflectionError::Io {
            file: filename.clone(),
            source,
        })?;

        let reflection = match &self.cache {
            Some(cache) => cache.reflect(&filename, &source)?,
            None => Arc::new(ReflectionFile::reflect(filename.as_str(), &source)?),
        };
        debug!(
            file = %filename,
            tokens = reflection.count_tokens(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "reflected"
        );
        Ok(reflection)
    }

    /// Reflect every path in parallel.
    pub fn reflect_files(&self, paths: &[PathBuf]) -> BatchResult {
        let mut files: Vec<FileResult> = paths
            .par_iter()
            .map(|path| {
                let result = self.reflect_file(path);
                if let Err(e) = &result {
                    // Log but don't fail - other files are still useful
                    warn!("{}", e);
                }
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
                FileResult {
                    path: path.clone(),
                    result,
                }
            })
            .collect();

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }
        if let Some(cache) = &self.cache {
            let stats = cache.stats();
            debug!(hits = stats.hits, misses = stats.misses, "reflection cache");
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        BatchResult { files }
    }
}
