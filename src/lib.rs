//! # Retouch
//!
//! Filter stacks for photo editing. A photo is edited by building an ordered
//! list of filters (brightness, contrast, dithering, ...), previewing the
//! result at a bounded size, and saving it. Every filter and every list has a
//! stable cache key, so identical renders can be recognized and reused.
//!
//! # Architecture
//!
//! ```text
//!  source image ──► fit + resample ──► FilterList::apply ──► save_image
//!                   (ScaleMode)        (filters in order)     │
//!                                                             ▼
//!                                               parse_save_result
//!                                          (toast, callback, review)
//! ```
//!
//! The same pipeline serves two front ends: an interactive [`EditSession`]
//! (one image, many edits, repeated previews) and [`batch`] rendering (one
//! filter stack over a directory, in parallel).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pixel work: scale modes, resampling kernels, dithering, adjustments, load/save |
//! | [`filter`] | Filter values, kinds and cache keys; the immutable [`FilterList`] |
//! | [`session`] | [`EditSession`] state container and the fit-then-filter render |
//! | [`save`] | [`SaveResult`] and the dispatcher that turns it into side effects |
//! | [`notify`] | Toasts, review prompts and schedulers the dispatcher talks to |
//! | [`cache`] | Content-addressed render cache stored next to the outputs |
//! | [`config`] | `config.toml` loading, stock defaults, validation |
//! | [`batch`] | Directory rendering on rayon's pool |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Immutable Filter Lists
//!
//! Every edit of a [`FilterList`] returns a new list and leaves the old one
//! untouched. The session simply swaps lists, so an earlier list (and its
//! cache key) stays valid for as long as anyone holds it.
//!
//! ## Canonical Keys
//!
//! Filter values are compared and hashed through a canonical form: all NaNs
//! are one value and `-0.0 == 0.0`. Equal filters therefore always produce
//! equal cache keys, and the keys are SHA-256 hex strings that stay stable
//! across runs and platforms.
//!
//! ## Pure-Rust Imaging
//!
//! All kernels are written on top of the `image` crate. No system libraries
//! are needed and the binary is self-contained.

pub mod batch;
pub mod cache;
pub mod config;
pub mod filter;
pub mod imaging;
pub mod notify;
pub mod output;
pub mod save;
pub mod session;

pub use filter::{Filter, FilterList, FilterValue, Transformation};
pub use save::{SaveError, SaveResult};
pub use session::EditSession;
