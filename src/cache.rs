//! Render cache for repeated applies and batch runs.
//!
//! Running a filter stack over a full-resolution photo is the slow part of
//! every command: error-diffusion dithering and windowed-sinc resampling
//! touch every pixel several times. This module lets `apply` and `batch` skip
//! the work when the source image and the render parameters are unchanged
//! since the last run.
//!
//! # Design
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups are by the combination of
//! `source_hash` and `params_hash`, not by output file path. Renaming an
//! output directory or file does not invalidate the cache; only a change to
//! the image content or to the render parameters does.
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives `git checkout` and copies.
//!
//! - **`params_hash`**: SHA-256 over the filter list's
//!   [`cache_key`](crate::filter::Transformation::cache_key), the target
//!   size, the scale mode, the output format and quality. See
//!   [`hash_render_params`].
//!
//! A cache hit requires:
//! 1. An entry with matching `source_hash` and `params_hash` exists
//! 2. The previously-written output file still exists on disk
//!
//! When a hit is found under a different output path, the cached file is
//! copied to the new location instead of rendering again.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.cache-manifest.json`, next
//! to the rendered files. A manifest that is missing, corrupt, or written by
//! a different format version loads as empty.
//!
//! ## Bypassing the cache
//!
//! `--no-cache` starts from an empty manifest, so every image is rendered
//! again and old outputs are overwritten.

use crate::imaging::{IntegerSize, OutputFormat, Quality, ScaleMode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bumped whenever key computation changes; older manifests load as empty.
const MANIFEST_VERSION: u32 = 1;

/// Hashes that produced one output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

impl CacheEntry {
    fn content_key(&self) -> String {
        content_key(&self.source_hash, &self.params_hash)
    }
}

fn content_key(source_hash: &str, params_hash: &str) -> String {
    format!("{source_hash}:{params_hash}")
}

/// Output paths (relative to the output directory, `/`-separated) and the
/// content that produced them. Entries are kept sorted so the file diffs
/// cleanly between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: BTreeMap<String, CacheEntry>,
    /// Content key to output path, derived from `entries`.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

/// How an output file came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Already on disk at the expected path.
    Cached,
    /// Copied from another cached path.
    Copied,
    /// Rendered from scratch.
    Rendered,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheStatus::Cached => "cached",
            CacheStatus::Copied => "copied",
            CacheStatus::Rendered => "rendered",
        })
    }
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: BTreeMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Manifest stored in `output_dir`. Missing, unreadable and
    /// other-version manifests all load as empty.
    pub fn load(output_dir: &Path) -> Self {
        fs::read_to_string(manifest_path(output_dir))
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok())
            .filter(|m| m.version == MANIFEST_VERSION)
            .map(Self::reindexed)
            .unwrap_or_else(Self::empty)
    }

    fn reindexed(mut self) -> Self {
        self.content_index = self
            .entries
            .iter()
            .map(|(path, entry)| (entry.content_key(), path.clone()))
            .collect();
        self
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(manifest_path(output_dir), json)
    }

    /// Stored path for this content, if the file is still on disk. The path
    /// may differ from the one the caller wants to write.
    pub fn find_cached(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> Option<String> {
        self.content_index
            .get(&content_key(source_hash, params_hash))
            .filter(|stored| output_dir.join(stored).is_file())
            .cloned()
    }

    /// Satisfy `output_path` from the cache if possible, copying the cached
    /// file when it lives under another name. `None` means a render is
    /// needed.
    pub fn reuse(
        &self,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
        output_path: &str,
    ) -> io::Result<Option<CacheStatus>> {
        let Some(stored) = self.find_cached(source_hash, params_hash, output_dir) else {
            return Ok(None);
        };
        if stored == output_path {
            return Ok(Some(CacheStatus::Cached));
        }
        let target = output_dir.join(output_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(output_dir.join(&stored), &target)?;
        Ok(Some(CacheStatus::Copied))
    }

    /// Record that `output_path` holds this content. One path per content:
    /// an older path for the same content is forgotten.
    pub fn insert(&mut self, output_path: String, source_hash: String, params_hash: String) {
        let entry = CacheEntry {
            source_hash,
            params_hash,
        };
        if let Some(previous) = self
            .content_index
            .insert(entry.content_key(), output_path.clone())
            && previous != output_path
        {
            self.entries.remove(&previous);
        }
        self.entries.insert(output_path, entry);
    }
}

/// SHA-256 of a file's contents as lowercase hex. Streams the file.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 hash of everything that decides a render's output bytes.
///
/// `bound` is the preview bound the source is fitted into, or `None` for a
/// full-resolution render. Quality only matters for lossy formats but is
/// always hashed.
pub fn hash_render_params(
    filters_key: &str,
    bound: Option<IntegerSize>,
    mode: ScaleMode,
    format: OutputFormat,
    quality: Quality,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"render\0");
    hasher.update(filters_key.as_bytes());
    match bound {
        Some(size) => {
            hasher.update(b"\x01");
            hasher.update(size.width.to_le_bytes());
            hasher.update(size.height.to_le_bytes());
        }
        None => hasher.update(b"\x00"),
    }
    hasher.update(mode.resolve().value().to_le_bytes());
    hasher.update(format.extension().as_bytes());
    hasher.update(quality.value().to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Per-run tally of [`CacheStatus`] outcomes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn record(&mut self, status: CacheStatus) {
        let slot = match status {
            CacheStatus::Cached => &mut self.hits,
            CacheStatus::Copied => &mut self.copies,
            CacheStatus::Rendered => &mut self.misses,
        };
        *slot += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    /// `3 rendered` on a cold run; otherwise every non-zero reuse count,
    /// the render count and the total.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits == 0 && self.copies == 0 {
            return write!(f, "{} rendered", self.misses);
        }
        write!(f, "{} cached, ", self.hits)?;
        if self.copies > 0 {
            write!(f, "{} copied, ", self.copies)?;
        }
        write!(f, "{} rendered ({} total)", self.misses, self.total())
    }
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(key: &str) -> String {
        hash_render_params(
            key,
            Some(IntegerSize::new(800, 600)),
            ScaleMode::Bilinear,
            OutputFormat::Png,
            Quality::default(),
        )
    }

    /// Manifest with `path` recorded and written to disk under `dir`.
    fn with_output(dir: &Path, path: &str, source: &str, params: &str) -> CacheManifest {
        let target = dir.join(path);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"img").unwrap();
        let mut m = CacheManifest::empty();
        m.insert(path.into(), source.into(), params.into());
        m
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    #[test]
    fn finds_output_by_content() {
        let tmp = TempDir::new().unwrap();
        let m = with_output(tmp.path(), "trip/dawn.png", "src", "prm");

        assert_eq!(
            m.find_cached("src", "prm", tmp.path()),
            Some("trip/dawn.png".to_string())
        );
        assert_eq!(m.find_cached("other", "prm", tmp.path()), None);
        assert_eq!(m.find_cached("src", "other", tmp.path()), None);
    }

    #[test]
    fn deleted_output_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let m = with_output(tmp.path(), "a.png", "s", "p");
        fs::remove_file(tmp.path().join("a.png")).unwrap();
        assert_eq!(m.find_cached("s", "p", tmp.path()), None);
    }

    #[test]
    fn one_path_per_content() {
        let mut m = CacheManifest::empty();
        m.insert("first.png".into(), "s".into(), "p".into());
        m.insert("second.png".into(), "s".into(), "p".into());

        assert_eq!(m.entries.keys().collect::<Vec<_>>(), vec!["second.png"]);
    }

    #[test]
    fn reinserting_same_path_keeps_it() {
        let mut m = CacheManifest::empty();
        m.insert("a.png".into(), "s".into(), "p".into());
        m.insert("a.png".into(), "s".into(), "p".into());
        assert_eq!(m.entries.len(), 1);
    }

    // =========================================================================
    // Reuse
    // =========================================================================

    #[test]
    fn reuse_reports_how_output_was_satisfied() {
        let tmp = TempDir::new().unwrap();
        let m = with_output(tmp.path(), "x.png", "s", "p");

        assert_eq!(
            m.reuse("s", "p", tmp.path(), "x.png").unwrap(),
            Some(CacheStatus::Cached)
        );
        assert_eq!(
            m.reuse("s", "p", tmp.path(), "sub/y.png").unwrap(),
            Some(CacheStatus::Copied)
        );
        assert_eq!(fs::read(tmp.path().join("sub/y.png")).unwrap(), b"img");
        assert_eq!(m.reuse("s", "q", tmp.path(), "z.png").unwrap(), None);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[test]
    fn saved_manifest_reloads_with_index() {
        let tmp = TempDir::new().unwrap();
        let mut m = with_output(tmp.path(), "x.png", "s1", "p1");
        m.insert("y.png".into(), "s2".into(), "p2".into());
        m.save(&tmp.path().join("nested")).unwrap();

        let loaded = CacheManifest::load(&tmp.path().join("nested"));
        assert_eq!(loaded.entries, m.entries);
        assert_eq!(loaded.content_index.get("s2:p2"), Some(&"y.png".into()));
    }

    #[test]
    fn unusable_manifests_load_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        fs::write(manifest_path(tmp.path()), "{ not json").unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());

        let future = format!(
            r#"{{"version": {}, "entries": {{"a.png": {{"source_hash":"h","params_hash":"p"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(manifest_path(tmp.path()), future).unwrap();
        assert!(CacheManifest::load(tmp.path()).entries.is_empty());
    }

    // =========================================================================
    // Hashing
    // =========================================================================

    #[test]
    fn file_hash_is_sha256_hex() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.bin");
        fs::write(&path, b"").unwrap();
        assert_eq!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );

        fs::write(&path, b"pixels").unwrap();
        assert_ne!(
            hash_file(&path).unwrap(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn render_params_vary_with_every_input() {
        let base = params("k");
        assert_eq!(base, params("k"));
        assert_ne!(base, params("other"));
        assert_ne!(
            base,
            hash_render_params("k", None, ScaleMode::Bilinear, OutputFormat::Png, Quality::default())
        );
        assert_ne!(
            base,
            hash_render_params(
                "k",
                Some(IntegerSize::new(800, 600)),
                ScaleMode::Lanczos,
                OutputFormat::Png,
                Quality::default()
            )
        );
        assert_ne!(
            base,
            hash_render_params(
                "k",
                Some(IntegerSize::new(800, 600)),
                ScaleMode::Bilinear,
                OutputFormat::Jpeg,
                Quality::default()
            )
        );
    }

    #[test]
    fn default_scale_mode_hashes_like_its_resolution() {
        let size = Some(IntegerSize::new(10, 10));
        assert_eq!(
            hash_render_params("k", size, ScaleMode::Default, OutputFormat::Png, Quality::new(80)),
            hash_render_params("k", size, ScaleMode::Bilinear, OutputFormat::Png, Quality::new(80)),
        );
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display() {
        let mut s = CacheStats::default();
        s.record(CacheStatus::Rendered);
        assert_eq!(s.to_string(), "1 rendered");

        s.record(CacheStatus::Cached);
        s.record(CacheStatus::Cached);
        assert_eq!(s.to_string(), "2 cached, 1 rendered (3 total)");

        s.record(CacheStatus::Copied);
        assert_eq!(s.to_string(), "2 cached, 1 copied, 1 rendered (4 total)");
    }
}
