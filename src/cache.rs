//! Cache of reflected files keyed by file identity and content hash.
//!
//! An entry is only returned when the SHA-256 of the current source matches
//! the hash it was built from; a mismatch drops the stale entry. Entries live
//! in memory for the session and, when persistence is enabled, as JSON files
//! under ~/.cache/phpreflect/reflections/.

use crate::reflection::{ReflectionError, ReflectionFile};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// SHA-256 of `source` as lowercase hex.
pub fn content_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    hash: String,
    reflection: Arc<ReflectionFile>,
}

/// On-disk form of an entry.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    hash: String,
    reflection: ReflectionFile,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// In-memory + optional file-based cache of [`ReflectionFile`]s.
pub struct ReflectionCache {
    /// In-memory cache for current session
    memory: RwLock<HashMap<String, CacheEntry>>,
    /// Directory for persisted entries, if enabled
    cache_dir: Option<PathBuf>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for ReflectionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectionCache {
    /// Memory-only cache.
    pub fn new() -> Self {
        Self::with_dir(None)
    }

    /// Cache that also persists entries in the user cache directory.
    pub fn persistent() -> Self {
        let cache_dir = ProjectDirs::from("", "", "phpreflect")
            .map(|dirs| dirs.cache_dir().join("reflections"));
        Self::with_dir(cache_dir)
    }

    /// Cache persisting entries under `dir`, or memory-only for `None`.
    pub fn with_dir(cache_dir: Option<PathBuf>) -> Self {
        if let Some(ref dir) = cache_dir {
            if let Err(e) = fs::create_dir_all(dir) {
                debug!(dir = %dir.display(), error = %e, "cache directory unavailable");
            }
        }

        Self {
            memory: RwLock::new(HashMap::new()),
            cache_dir,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Return the reflection of `source`, building and storing it on a miss.
    pub fn reflect(&self, file: &str, source: &str) -> Result<Arc<ReflectionFile>, ReflectionError> {
        let hash = content_hash(source);
        if let Some(reflection) = self.get(file, &hash) {
            return Ok(reflection);
        }

        let reflection = Arc::new(ReflectionFile::reflect(file, source)?);
        self.insert(file, hash, Arc::clone(&reflection));
        Ok(reflection)
    }

    /// Look up `file`, accepting the entry only if it was built from `hash`.
    pub fn get(&self, file: &str, hash: &str) -> Option<Arc<ReflectionFile>> {
        let found = self.lookup(file, hash);
        match found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(file, "cache hit");
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(file, "cache miss");
            }
        }
        found
    }

    fn lookup(&self, file: &str, hash: &str) -> Option<Arc<ReflectionFile>> {
        // Check in-memory cache first
        let stale = {
            let cache = self.memory.read().ok()?;
            match cache.get(file) {
                Some(entry) if entry.hash == hash => return Some(Arc::clone(&entry.reflection)),
                Some(_) => true,
                None => false,
            }
        };
        if stale {
            self.invalidate(file);
            return None;
        }

        // Check file cache
        let entry = self.read_file_cache(file)?;
        if entry.hash != hash {
            self.remove_file_cache(file);
            return None;
        }
        let reflection = Arc::clone(&entry.reflection);
        // Promote to memory cache
        if let Ok(mut cache) = self.memory.write() {
            cache.insert(file.to_string(), entry);
        }
        Some(reflection)
    }

    /// Store a reflection built from content with the given hash.
    pub fn insert(&self, file: &str, hash: String, reflection: Arc<ReflectionFile>) {
        let entry = CacheEntry { hash, reflection };
        self.write_file_cache(file, &entry);
        if let Ok(mut cache) = self.memory.write() {
            cache.insert(file.to_string(), entry);
        }
    }

    /// Drop any entry for `file`, in memory and on disk.
    pub fn invalidate(&self, file: &str) {
        if let Ok(mut cache) = self.memory.write() {
            cache.remove(file);
        }
        self.remove_file_cache(file);
        debug!(file, "cache entry invalidated");
    }

    /// Drop every in-memory entry. Persisted entries are left alone.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.memory.write() {
            cache.clear();
        }
    }

    /// Number of entries in memory.
    pub fn len(&self) -> usize {
        self.memory.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn read_file_cache(&self, file: &str) -> Option<CacheEntry> {
        let path = self.cache_file_path(file)?;
        let content = fs::read_to_string(path).ok()?;
        let stored: StoredEntry = serde_json::from_str(&content).ok()?;
        Some(CacheEntry {
            hash: stored.hash,
            reflection: Arc::new(stored.reflection),
        })
    }

    fn write_file_cache(&self, file: &str, entry: &CacheEntry) {
        let Some(path) = self.cache_file_path(file) else {
            return;
        };
        let stored = StoredEntry {
            hash: entry.hash.clone(),
            reflection: (*entry.reflection).clone(),
        };
        match serde_json::to_string(&stored) {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    debug!(path = %path.display(), error = %e, "failed to persist cache entry");
                }
            }
            Err(e) => debug!(file, error = %e, "failed to serialize cache entry"),
        }
    }

    fn remove_file_cache(&self, file: &str) {
        if let Some(path) = self.cache_file_path(file) {
            let _ = fs::remove_file(path);
        }
    }

    /// File names are the hash of the identity, so any path is a valid key.
    fn cache_file_path(&self, file: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", content_hash(file))))
    }
}
