//! Terminal surface for hudbar, backed by indicatif.
//!
//! Renders each bar as a line in a [`MultiProgress`] group, for CLI hosts
//! and for demos on platforms without a native panel. Terminals have no
//! button affordance, so button payloads are dropped with a debug log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use indicatif::{MultiProgress, ProgressDrawTarget, ProgressStyle};

use hudbar_core::{BarError, Result, Style, Surface, SurfaceButton, SurfaceHandle};

/// Surface rendering indicators as terminal progress lines.
pub struct TermSurface {
    multi: MultiProgress,
    bars: Mutex<HashMap<u64, indicatif::ProgressBar>>,
    next_handle: AtomicU64,
}

impl TermSurface {
    pub fn new() -> Self {
        Self::with_multi(MultiProgress::new())
    }

    /// A surface that renders nothing, for quiet mode and tests.
    pub fn hidden() -> Self {
        Self::with_multi(MultiProgress::with_draw_target(
            ProgressDrawTarget::hidden(),
        ))
    }

    fn with_multi(multi: MultiProgress) -> Self {
        TermSurface {
            multi,
            bars: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
        }
    }

    fn lock_bars(&self) -> MutexGuard<'_, HashMap<u64, indicatif::ProgressBar>> {
        self.bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TermSurface {
    fn default() -> Self {
        TermSurface::new()
    }
}

fn template_for(style: Style) -> ProgressStyle {
    let template = match style {
        Style::Default => "{prefix:.bold} [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        Style::Hud => "{prefix:.bold.dim} {wide_bar} {pos:>3}%",
        Style::Utility => "{prefix} [{bar:40}] {pos:>3}% {msg}",
    };
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

impl Surface for TermSurface {
    fn create(
        &self,
        title: &str,
        message: &str,
        style: Style,
        buttons: &[SurfaceButton],
    ) -> Result<SurfaceHandle> {
        if !buttons.is_empty() {
            tracing::debug!(
                count = buttons.len(),
                "terminal surface has no button affordance; dropping buttons"
            );
        }

        let bar = self.multi.add(
            indicatif::ProgressBar::new(100)
                .with_style(template_for(style))
                .with_prefix(title.to_string())
                .with_message(message.to_string()),
        );

        let handle = SurfaceHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.lock_bars().insert(handle.raw(), bar);
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
        let bars = self.lock_bars();
        let bar = bars
            .get(&handle.raw())
            .ok_or(BarError::StaleHandle(handle))?;

        if buttons_changed && !buttons.is_empty() {
            tracing::debug!(
                count = buttons.len(),
                "terminal surface has no button affordance; dropping buttons"
            );
        }

        bar.set_position(u64::from(progress));
        bar.set_message(message.to_string());
        Ok(())
    }

    fn close(&self, handle: SurfaceHandle) -> Result<()> {
        let bar = self
            .lock_bars()
            .remove(&handle.raw())
            .ok_or(BarError::StaleHandle(handle))?;
        bar.finish_and_clear();
        self.multi.remove(&bar);
        Ok(())
    }
}
