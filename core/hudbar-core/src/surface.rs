//! The surface contract: the boundary between the lifecycle core and
//! whatever actually renders the indicator (AppKit panel, Win32 dialog,
//! terminal). The core treats it as a black box with three operations.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::Style;
use crate::error::Result;

/// Opaque identifier correlating a wrapper entity with its surface-side
/// resource. The core never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub fn new(raw: u64) -> Self {
        SurfaceHandle(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A button in the form the surface consumes: a label plus a zero-argument
/// trampoline that already carries the owning bar.
#[derive(Clone)]
pub struct SurfaceButton {
    pub label: String,
    pub on_click: Arc<dyn Fn() + Send + Sync>,
}

impl fmt::Debug for SurfaceButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceButton")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// A rendering surface for progress indicators.
///
/// Implementors should:
/// - Return a distinct handle from `create` for each live indicator
/// - Treat `update`/`close` on an unknown handle as an error
///   ([`crate::BarError::StaleHandle`]), never undefined behavior
/// - Deliver button clicks by invoking the supplied trampolines from event
///   delivery, never synchronously from inside `create`/`update`/`close`
///   (the core holds its state lock across those calls, and clicks may
///   re-enter the core, including `close`)
pub trait Surface: Send + Sync {
    fn create(
        &self,
        title: &str,
        message: &str,
        style: Style,
        buttons: &[SurfaceButton],
    ) -> Result<SurfaceHandle>;

    /// Pushes the full current state of a bar. `buttons` is only meaningful
    /// when `buttons_changed` is true; otherwise the surface keeps whatever
    /// set it already has.
    fn update(
        &self,
        handle: SurfaceHandle,
        progress: u8,
        message: &str,
        buttons_changed: bool,
        buttons: &[SurfaceButton],
    ) -> Result<()>;

    /// Releases the surface-side resource for `handle`.
    fn close(&self, handle: SurfaceHandle) -> Result<()>;
}

/// Surface that renders nothing and accepts everything.
///
/// Used as the fallback when no real surface is installed, so host logic can
/// keep driving bars without defensive checks everywhere. Every create hands
/// out the same sentinel handle.
#[derive(Debug, Default)]
pub struct NoopSurface;

impl Surface for NoopSurface {
    fn create(
        &self,
        _title: &str,
        _message: &str,
        _style: Style,
        _buttons: &[SurfaceButton],
    ) -> Result<SurfaceHandle> {
        Ok(SurfaceHandle(0))
    }

    fn update(
        &self,
        _handle: SurfaceHandle,
        _progress: u8,
        _message: &str,
        _buttons_changed: bool,
        _buttons: &[SurfaceButton],
    ) -> Result<()> {
        Ok(())
    }

    fn close(&self, _handle: SurfaceHandle) -> Result<()> {
        Ok(())
    }
}

static INSTALLED: OnceLock<Arc<dyn Surface>> = OnceLock::new();

/// Installs the process-wide surface used by [`crate::ProgressBar::create`].
///
/// The first caller wins; later calls return
/// [`crate::BarError::SurfaceAlreadyInstalled`].
pub fn install_surface(surface: Arc<dyn Surface>) -> Result<()> {
    INSTALLED
        .set(surface)
        .map_err(|_| crate::error::BarError::SurfaceAlreadyInstalled)
}

/// Returns the installed surface, degrading to [`NoopSurface`] when none is
/// available. The degradation is logged once; after that, bars silently
/// render nothing.
pub fn default_surface() -> Arc<dyn Surface> {
    if let Some(surface) = INSTALLED.get() {
        return Arc::clone(surface);
    }

    static FALLBACK: OnceLock<Arc<dyn Surface>> = OnceLock::new();
    Arc::clone(FALLBACK.get_or_init(|| {
        tracing::warn!("no progress surface installed; indicators degrade to no-ops");
        Arc::new(NoopSurface)
    }))
}
