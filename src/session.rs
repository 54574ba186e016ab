//! Filter editing session.
//!
//! [`EditSession`] holds the state of one filter-editing screen: the source
//! image, the current [`FilterList`] and the last rendered preview. The view
//! layer drives it through the operations below and observes it through
//! [`SessionEvent`]s sent over an optional channel.
//!
//! ```text
//! add_filter / update_filter / remove_at / update_order
//!            │ (list replaced, preview marked stale)
//!            ▼
//!        render(size, mode) ──► preview ──► commit()
//! ```
//!
//! Edits never re-render on their own; the view calls [`EditSession::render`]
//! when it wants a fresh preview. [`EditSession::commit`] hands back the
//! preview, or the source if nothing was rendered.

use crate::filter::{Filter, FilterError, FilterList, FilterListError, FilterValue, Transformation};
use crate::imaging::{BackendError, ImageBackend, IntegerSize, RustBackend, ScaleMode};
use image::DynamicImage;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Resampling preview failed: {0}")]
    Resample(#[source] BackendError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Fit `source` inside `bound` (never upscaling), resample with `mode`,
/// then run `filters`. `None` renders at full resolution.
pub fn render_fitted(
    backend: &impl ImageBackend,
    source: &DynamicImage,
    filters: &FilterList,
    bound: Option<IntegerSize>,
    mode: ScaleMode,
) -> Result<DynamicImage, RenderError> {
    let full = IntegerSize::of(source);
    let target = bound.map_or(full, |b| full.fit_within(b));
    let base = if target == full {
        source.clone()
    } else {
        backend
            .resample(source, target, mode.resolve())
            .map_err(RenderError::Resample)?
    };
    Ok(filters.apply(backend, &base, target)?)
}

/// Change notifications for the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    FilterAdded { index: usize, filter: Filter },
    FilterUpdated { index: usize, filter: Filter },
    FilterRemoved { index: usize, filter: Filter },
    OrderChanged { filters: FilterList },
    Rendered { size: IntegerSize, cache_key: String },
    Failed { message: String },
}

pub struct EditSession<B: ImageBackend = RustBackend> {
    backend: B,
    source: DynamicImage,
    filters: FilterList,
    preview: Option<DynamicImage>,
    stale: bool,
    events: Option<Sender<SessionEvent>>,
}

impl EditSession<RustBackend> {
    pub fn new(source: DynamicImage) -> Self {
        Self::with_backend(RustBackend::new(), source)
    }
}

impl<B: ImageBackend> EditSession<B> {
    pub fn with_backend(backend: B, source: DynamicImage) -> Self {
        Self {
            backend,
            source,
            filters: FilterList::new(),
            preview: None,
            stale: false,
            events: None,
        }
    }

    /// Subscribe `sender` to this session's events.
    pub fn with_events(mut self, sender: Sender<SessionEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// Start from an existing list (for example a preset).
    pub fn with_filters(mut self, filters: FilterList) -> Self {
        self.filters = filters;
        self.stale = true;
        self
    }

    pub fn source(&self) -> &DynamicImage {
        &self.source
    }

    pub fn filters(&self) -> &FilterList {
        &self.filters
    }

    pub fn preview(&self) -> Option<&DynamicImage> {
        self.preview.as_ref()
    }

    /// True when the list has changed since the last render.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn fail(&self, err: &dyn std::error::Error) {
        self.emit(SessionEvent::Failed {
            message: err.to_string(),
        });
    }

    fn replace_list(&mut self, filters: FilterList) {
        self.filters = filters;
        self.stale = true;
    }

    // =========================================================================
    // Edits
    // =========================================================================

    pub fn add_filter(&mut self, filter: Filter) {
        let index = self.filters.len();
        self.replace_list(self.filters.added(filter));
        self.emit(SessionEvent::FilterAdded { index, filter });
    }

    /// Give the filter at `index` a new value. On failure `on_error` gets
    /// the error and the list is left as it was.
    pub fn update_filter<E>(&mut self, index: usize, value: FilterValue, on_error: E)
    where
        E: FnOnce(FilterListError),
    {
        match self.filters.updated(index, value) {
            Ok(filters) => {
                let filter = filters.as_slice()[index];
                self.replace_list(filters);
                self.emit(SessionEvent::FilterUpdated { index, filter });
            }
            Err(e) => {
                self.fail(&e);
                on_error(e);
            }
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Filter, FilterListError> {
        match self.filters.removed(index) {
            Ok(filters) => {
                let filter = self.filters.as_slice()[index];
                self.replace_list(filters);
                self.emit(SessionEvent::FilterRemoved { index, filter });
                Ok(filter)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Accept `order` only if it is a permutation of the current filters.
    pub fn update_order(&mut self, order: Vec<Filter>) -> Result<(), FilterListError> {
        match self.filters.reordered(order) {
            Ok(filters) => {
                self.replace_list(filters.clone());
                self.emit(SessionEvent::OrderChanged { filters });
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Fit the source inside `size` (never upscaling), resample with `mode`,
    /// then run the filter list. The result becomes the preview.
    pub fn render(
        &mut self,
        size: IntegerSize,
        mode: ScaleMode,
    ) -> Result<&DynamicImage, RenderError> {
        match self.render_preview(size, mode) {
            Ok(image) => {
                self.stale = false;
                self.emit(SessionEvent::Rendered {
                    size: IntegerSize::of(&image),
                    cache_key: self.filters.cache_key(),
                });
                Ok(self.preview.insert(image))
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn render_preview(
        &self,
        size: IntegerSize,
        mode: ScaleMode,
    ) -> Result<DynamicImage, RenderError> {
        render_fitted(&self.backend, &self.source, &self.filters, Some(size), mode)
    }

    /// True when there is a preview and it differs from the source.
    pub fn can_go_back(&self) -> bool {
        self.preview.as_ref().is_some_and(|p| {
            p.width() != self.source.width()
                || p.height() != self.source.height()
                || p.color() != self.source.color()
                || p.as_bytes() != self.source.as_bytes()
        })
    }

    /// Finish editing: the preview if one was rendered, else the source.
    pub fn commit(self) -> DynamicImage {
        self.preview.unwrap_or(self.source)
    }
}
