//! Test doubles for exercising the lifecycle without a real surface.
//!
//! Public rather than test-gated so integration tests and embedders can
//! script a bar's lifecycle and assert on the exact calls the core issued.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Style;
use crate::error::{BarError, Result};
use crate::surface::{Surface, SurfaceButton, SurfaceHandle};

/// One recorded surface call. Button sets are recorded by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Create {
        title: String,
        message: String,
        style: Style,
        button_labels: Vec<String>,
    },
    Update {
        handle: SurfaceHandle,
        progress: u8,
        message: String,
        buttons_changed: bool,
        button_labels: Vec<String>,
    },
    Close {
        handle: SurfaceHandle,
    },
}

/// Surface that records every call, validates handles the way a strict
/// native layer would, and can replay button clicks.
#[derive(Default)]
pub struct RecordingSurface {
    next_handle: AtomicU64,
    calls: Mutex<Vec<SurfaceCall>>,
    open: Mutex<HashSet<u64>>,
    buttons: Mutex<Vec<SurfaceButton>>,
    fail_create: Option<String>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        RecordingSurface::default()
    }

    /// A surface whose `create` always fails with the given message, for
    /// exercising the construction failure path.
    pub fn failing(message: impl Into<String>) -> Self {
        RecordingSurface {
            fail_create: Some(message.into()),
            ..RecordingSurface::default()
        }
    }

    /// Every call recorded so far, in order.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn close_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Close { .. }))
            .count()
    }

    /// Labels of the button set the surface currently holds.
    pub fn button_labels(&self) -> Vec<String> {
        lock(&self.buttons)
            .iter()
            .map(|button| button.label.clone())
            .collect()
    }

    /// Replays a click on the `index`-th button of the current set, the way
    /// a native event loop would: the trampoline runs with no surface lock
    /// held, so it is free to re-enter the core, including `close`.
    pub fn click(&self, index: usize) {
        let trampoline = lock(&self.buttons)
            .get(index)
            .map(|button| Arc::clone(&button.on_click));
        match trampoline {
            Some(on_click) => on_click(),
            None => panic!("no button at index {}", index),
        }
    }

    fn record(&self, call: SurfaceCall) {
        lock(&self.calls).push(call);
    }
}

impl Surface for RecordingSurface {
    fn create(
        &self,
        title: &str,
        message: &str,
        style: Style,
        buttons: &[SurfaceButton],
    ) -> Result<SurfaceHandle> {
        if let Some(message) = &self.fail_create {
            return Err(BarError::CreateFailed(message.clone()));
        }

        let handle = SurfaceHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        lock(&self.open).insert(handle.raw());
        *lock(&self.buttons) = buttons.to_vec();
        self.record(SurfaceCall::Create {
            title: title.to_string(),
            message: message.to_string(),
            style,
            button_labels: labels(buttons),
        });
        Ok(handle)
    }

    fn update(
        &self,
        handle: SurfaceHandle,
        progress: u8,
        message: &str,
        buttons_changed: bool,
        buttons: &[SurfaceButton],
    ) -> Result<()> {
        if !lock(&self.open).contains(&handle.raw()) {
            return Err(BarError::StaleHandle(handle));
        }

        if buttons_changed {
            *lock(&self.buttons) = buttons.to_vec();
        }
        self.record(SurfaceCall::Update {
            handle,
            progress,
            message: message.to_string(),
            buttons_changed,
            button_labels: if buttons_changed {
                labels(buttons)
            } else {
                Vec::new()
            },
        });
        Ok(())
    }

    fn close(&self, handle: SurfaceHandle) -> Result<()> {
        if !lock(&self.open).remove(&handle.raw()) {
            return Err(BarError::StaleHandle(handle));
        }
        self.record(SurfaceCall::Close { handle });
        Ok(())
    }
}

fn labels(buttons: &[SurfaceButton]) -> Vec<String> {
    buttons.iter().map(|button| button.label.clone()).collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
