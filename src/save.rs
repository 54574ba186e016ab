//! Saving renders and reacting to the outcome.
//!
//! [`save_image`] writes one image and reports what happened as a
//! [`SaveResult`]. It never returns `Err`: a failed save is an ordinary
//! outcome the UI has to present.
//!
//! [`parse_save_result`] turns that outcome into side effects:
//!
//! | Outcome | Scheduled | Synchronous |
//! |---|---|---|
//! | `Success` with message | toast (Save, Long), `on_success` | review request |
//! | `Success` without message | `on_success` | review request |
//! | `Exception(e)` | error toast naming `e` | nothing |
//! | `MissingPermissions` | nothing | nothing |
//!
//! Scheduled work goes through a [`Scheduler`]; the dispatcher itself does
//! not block or retry, and makes no promise about the order in which the
//! scheduled tasks run.

use crate::imaging::{BackendError, ImageBackend, SaveParams};
use crate::notify::{ReviewPrompt, Scheduler, Toast, ToastHost};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum SaveError {
    #[error("Missing permission to write the output")]
    MissingPermissions,
    #[error("{0}")]
    Exception(Arc<dyn std::error::Error + Send + Sync>),
}

impl SaveError {
    pub fn exception(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        SaveError::Exception(Arc::new(err))
    }
}

impl From<BackendError> for SaveError {
    fn from(err: BackendError) -> Self {
        if err.is_permission_denied() {
            SaveError::MissingPermissions
        } else {
            SaveError::exception(err)
        }
    }
}

/// Outcome of one save attempt.
#[derive(Debug, Clone)]
pub enum SaveResult {
    Success {
        message: Option<String>,
        path: Option<PathBuf>,
    },
    Error(SaveError),
}

impl SaveResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SaveResult::Success { .. })
    }

    /// Where the image was written, if it was.
    pub fn path(&self) -> Option<&Path> {
        match self {
            SaveResult::Success { path, .. } => path.as_deref(),
            SaveResult::Error(_) => None,
        }
    }
}

impl From<SaveError> for SaveResult {
    fn from(err: SaveError) -> Self {
        SaveResult::Error(err)
    }
}

/// Write `image` as described by `params`, creating parent directories.
///
/// An empty or absent `message` produces a `Success` without a message.
pub fn save_image(
    backend: &impl ImageBackend,
    image: &DynamicImage,
    params: &SaveParams,
    message: Option<&str>,
) -> SaveResult {
    if let Some(parent) = params.output.parent().filter(|p| !p.as_os_str().is_empty())
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        return SaveError::from(BackendError::Io(e)).into();
    }
    match backend.save(image, params) {
        Ok(()) => SaveResult::Success {
            message: message.filter(|m| !m.is_empty()).map(str::to_string),
            path: Some(params.output.clone()),
        },
        Err(e) => SaveError::from(e).into(),
    }
}

/// Dispatch the side effects of a save outcome.
pub fn parse_save_result<T, R, S, F>(
    result: SaveResult,
    on_success: F,
    toasts: &Arc<T>,
    review: &R,
    scheduler: &S,
) where
    T: ToastHost + ?Sized + 'static,
    R: ReviewPrompt + ?Sized,
    S: Scheduler + ?Sized,
    F: FnOnce() + Send + 'static,
{
    match result {
        SaveResult::Success { message, .. } => {
            if let Some(message) = message {
                let host = Arc::clone(toasts);
                scheduler.schedule(Box::new(move || host.show_toast(Toast::saved(message))));
            }
            scheduler.schedule(Box::new(on_success));
            review.request_review();
        }
        SaveResult::Error(SaveError::Exception(e)) => {
            let host = Arc::clone(toasts);
            let message = format!("Something went wrong: {e}");
            scheduler.schedule(Box::new(move || host.show_toast(Toast::error(message))));
        }
        SaveResult::Error(SaveError::MissingPermissions) => {}
    }
}
