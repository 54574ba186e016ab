//! Batch rendering: one filter stack over a directory of photos.
//!
//! ```text
//! source/                     output/
//! ├── a.jpg           ──►     ├── a.png
//! └── trip/                   ├── trip/
//!     └── b.png       ──►     │   └── b.png
//!                             └── .cache-manifest.json
//! ```
//!
//! Every supported image under the source directory is fitted into the
//! configured bound, run through the [`FilterList`] and saved with
//! [`save_image`] under the same relative path, with the extension of the
//! output format.
//!
//! ## Parallel Processing
//!
//! Images are rendered in parallel on rayon's pool. The pool size comes from
//! `processing.max_processes` and is set once by the CLI. A failure in one
//! image is reported as [`BatchEvent::ImageFailed`] and does not stop the
//! others.
//!
//! ## Caching
//!
//! Each output is keyed by the source file's hash and
//! [`hash_render_params`]. Unchanged images are reused or copied instead of
//! rendered; see [`cache`](crate::cache).

use crate::cache::{self, CacheManifest, CacheStats, CacheStatus};
use crate::filter::{FilterList, Transformation};
use crate::imaging::{
    ImageBackend, IntegerSize, OutputFormat, Quality, RustBackend, SaveParams, ScaleMode,
    is_supported,
};
use crate::save::{SaveError, SaveResult, save_image};
use crate::session::render_fitted;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Two sources that would be written to the same output file. Neither is
/// rendered.
#[derive(Error, Debug)]
#[error("{output} would also be written from {}", .other.display())]
pub struct OutputCollision {
    pub output: String,
    pub other: PathBuf,
}

/// What to render and how to encode it.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub filters: FilterList,
    /// Bounding size; `None` keeps full resolution.
    pub bound: Option<IntegerSize>,
    pub scale_mode: ScaleMode,
    pub format: OutputFormat,
    pub quality: Quality,
    pub use_cache: bool,
}

/// Progress of a batch run, in the order things happen.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ImageRendered {
        index: usize,
        source: PathBuf,
        output: PathBuf,
        status: CacheStatus,
    },
    ImageFailed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

#[derive(Debug)]
pub struct BatchResult {
    /// One result per source image, in discovery order.
    pub saves: Vec<SaveResult>,
    pub cache_stats: CacheStats,
}

impl BatchResult {
    pub fn failed(&self) -> usize {
        self.saves.iter().filter(|s| !s.is_success()).count()
    }
}

pub fn render_directory(
    source_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    render_directory_with_backend(&RustBackend::new(), source_dir, output_dir, options, progress)
}

/// Supported images under `source_dir`, sorted by path. Anything inside
/// `exclude` (typically the output directory) is skipped, however either
/// path is spelled (`.` and `out`, relative and absolute, symlinks).
pub fn find_images(source_dir: &Path, exclude: &Path) -> Result<Vec<PathBuf>, BatchError> {
    // An exclude that does not exist yet cannot hold anything to skip
    let exclude = exclude.canonicalize().ok();
    let is_excluded = |entry: &walkdir::DirEntry| {
        entry.file_type().is_dir()
            && exclude.is_some()
            && entry.path().canonicalize().ok() == exclude
    };

    let mut images = Vec::new();
    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e))
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// Output path relative to the output directory, `/`-separated.
fn output_name(source_dir: &Path, source: &Path, format: OutputFormat) -> String {
    let rel = source.strip_prefix(source_dir).unwrap_or(source);
    rel.with_extension(format.extension())
        .to_string_lossy()
        .replace('\\', "/")
}

/// Outcome of one image, before it is folded into the manifest.
struct Rendered {
    output_name: String,
    /// Source hash and how the output was produced.
    outcome: Result<(String, CacheStatus), SaveError>,
}

/// Batch render using a specific backend (allows testing with mock).
pub fn render_directory_with_backend(
    backend: &impl ImageBackend,
    source_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    let images = find_images(source_dir, output_dir)?;
    std::fs::create_dir_all(output_dir)?;

    if let Some(tx) = &progress {
        let _ = tx.send(BatchEvent::Started {
            total: images.len(),
        });
    }

    let mut manifest = if options.use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };
    let params_hash = cache::hash_render_params(
        &options.filters.cache_key(),
        options.bound,
        options.scale_mode,
        options.format,
        options.quality,
    );

    let names: Vec<String> = images
        .iter()
        .map(|source| output_name(source_dir, source, options.format))
        .collect();
    let mut claims: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, name) in names.iter().enumerate() {
        claims.entry(name.as_str()).or_default().push(index);
    }

    let rendered: Vec<Rendered> = images
        .par_iter()
        .zip(names.par_iter())
        .enumerate()
        .map_with(progress, |tx, (index, (source, output_name))| {
            let rival = claims[output_name.as_str()]
                .iter()
                .find(|&&other| other != index);
            let outcome = match rival {
                Some(&other) => Err(SaveError::exception(OutputCollision {
                    output: output_name.clone(),
                    other: images[other].clone(),
                })),
                None => render_one(
                    backend,
                    &manifest,
                    &params_hash,
                    output_dir,
                    output_name,
                    source,
                    options,
                ),
            };
            let event = match &outcome {
                Ok((_, status)) => BatchEvent::ImageRendered {
                    index,
                    source: source.clone(),
                    output: output_dir.join(output_name),
                    status: *status,
                },
                Err(e) => BatchEvent::ImageFailed {
                    index,
                    source: source.clone(),
                    error: e.to_string(),
                },
            };
            if let Some(tx) = tx {
                let _ = tx.send(event);
            }
            Rendered {
                output_name: output_name.clone(),
                outcome,
            }
        })
        .collect();

    let mut cache_stats = CacheStats::default();
    let mut saves = Vec::with_capacity(rendered.len());
    for Rendered {
        output_name,
        outcome,
    } in rendered
    {
        match outcome {
            Ok((source_hash, status)) => {
                cache_stats.record(status);
                saves.push(SaveResult::Success {
                    message: None,
                    path: Some(output_dir.join(&output_name)),
                });
                manifest.insert(output_name, source_hash, params_hash.clone());
            }
            Err(e) => saves.push(SaveResult::Error(e)),
        }
    }
    manifest.save(output_dir)?;

    Ok(BatchResult { saves, cache_stats })
}

fn render_one(
    backend: &impl ImageBackend,
    manifest: &CacheManifest,
    params_hash: &str,
    output_dir: &Path,
    output_name: &str,
    source: &Path,
    options: &BatchOptions,
) -> Result<(String, CacheStatus), SaveError> {
    let source_hash = cache::hash_file(source).map_err(SaveError::exception)?;
    if let Some(status) = manifest
        .reuse(&source_hash, params_hash, output_dir, output_name)
        .map_err(SaveError::exception)?
    {
        return Ok((source_hash, status));
    }

    let image = backend.load(source)?;
    let rendered = render_fitted(
        backend,
        &image,
        &options.filters,
        options.bound,
        options.scale_mode,
    )
    .map_err(SaveError::exception)?;

    let params = SaveParams {
        output: output_dir.join(output_name),
        format: options.format,
        quality: options.quality,
    };
    match save_image(backend, &rendered, &params, None) {
        SaveResult::Success { .. } => Ok((source_hash, CacheStatus::Rendered)),
        SaveResult::Error(e) => Err(e),
    }
}
