//! User-facing notifications and deferred work.
//!
//! Three small seams sit between the save dispatcher and whatever shows
//! things to the user:
//!
//! - [`ToastHost`]: shows a short message with an icon
//! - [`ReviewPrompt`]: may ask the user to rate the app
//! - [`Scheduler`]: runs a task later, off the caller's stack
//!
//! The CLI wires them to the console and a rayon pool. Tests use
//! [`InlineScheduler`] and recording fakes so every effect is observable
//! once the dispatcher returns.

use crate::output;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastIcon {
    Save,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastDuration {
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub icon: ToastIcon,
    pub duration: ToastDuration,
}

impl Toast {
    pub fn saved(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            icon: ToastIcon::Save,
            duration: ToastDuration::Long,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            icon: ToastIcon::Error,
            duration: ToastDuration::Long,
        }
    }
}

pub trait ToastHost: Send + Sync {
    fn show_toast(&self, toast: Toast);
}

pub trait ReviewPrompt {
    /// Ask for a review. Returns whether the prompt was actually shown.
    fn request_review(&self) -> bool;
}

pub trait Scheduler {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>);
}

// ============================================================================
// Schedulers
// ============================================================================

/// Runs tasks on rayon's global pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct RayonScheduler;

impl Scheduler for RayonScheduler {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>) {
        rayon::spawn(task);
    }
}

/// Runs tasks immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineScheduler;

impl Scheduler for InlineScheduler {
    fn schedule(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

// ============================================================================
// Toast hosts
// ============================================================================

/// Prints toasts to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleToastHost;

impl ToastHost for ConsoleToastHost {
    fn show_toast(&self, toast: Toast) {
        for line in output::format_toast(&toast) {
            println!("{}", line);
        }
    }
}

/// Forwards toasts to a channel, typically read by a printer thread.
pub struct ChannelToastHost {
    sender: Sender<Toast>,
}

impl ChannelToastHost {
    pub fn new(sender: Sender<Toast>) -> Self {
        Self { sender }
    }
}

impl ToastHost for ChannelToastHost {
    fn show_toast(&self, toast: Toast) {
        let _ = self.sender.send(toast);
    }
}

// ============================================================================
// Review prompt
// ============================================================================

/// Asks for a review on every `every_n`-th successful save. `0` never asks.
pub struct ReviewHandler {
    every_n: u32,
    saves: AtomicU32,
    shown: AtomicU32,
}

impl ReviewHandler {
    pub fn new(every_n: u32) -> Self {
        Self {
            every_n,
            saves: AtomicU32::new(0),
            shown: AtomicU32::new(0),
        }
    }

    /// Number of times the prompt has been shown.
    pub fn times_shown(&self) -> u32 {
        self.shown.load(Ordering::Relaxed)
    }
}

impl ReviewPrompt for ReviewHandler {
    fn request_review(&self) -> bool {
        if self.every_n == 0 {
            return false;
        }
        let count = self.saves.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.every_n == 0 {
            self.shown.fetch_add(1, Ordering::Relaxed);
            output::print_review_prompt(count);
            true
        } else {
            false
        }
    }
}
