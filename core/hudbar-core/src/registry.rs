//! Process-wide bookkeeping of open bars and the exit-time sweep.
//!
//! The registry holds a strong reference to every open bar, so an indicator
//! stays on screen until `close` even if the host drops its own handle. At
//! process teardown the sweep force-closes whatever is left, once each.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Once};

use once_cell::sync::Lazy;

use crate::bar::BarInner;

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));
static EXIT_HOOK: Once = Once::new();

extern "C" fn exit_sweep() {
    GLOBAL.close_all();
}

/// Set of live bars, keyed by pointer identity. No ordering semantics.
#[derive(Default)]
pub struct Registry {
    bars: Mutex<Vec<Arc<BarInner>>>,
}

impl Registry {
    /// An isolated registry, for hosts that scope bar lifecycles themselves
    /// and for tests. Isolated registries get no exit hook.
    pub fn new() -> Self {
        Registry::default()
    }

    /// The process-wide registry used by [`crate::ProgressBar::create`].
    /// First use installs an exit hook that force-closes anything still
    /// open when the process terminates.
    pub fn global() -> Arc<Registry> {
        EXIT_HOOK.call_once(|| {
            // SAFETY: exit_sweep is a plain extern "C" fn; close_all
            // contains any panic from user close callbacks.
            unsafe {
                let _ = libc::atexit(exit_sweep);
            }
        });
        Arc::clone(&GLOBAL)
    }

    pub(crate) fn register(&self, bar: Arc<BarInner>) {
        self.lock_bars().push(bar);
    }

    pub(crate) fn unregister(&self, bar: &Arc<BarInner>) {
        self.lock_bars().retain(|candidate| !Arc::ptr_eq(candidate, bar));
    }

    /// Number of bars currently open.
    pub fn open_count(&self) -> usize {
        self.lock_bars().len()
    }

    /// Force-closes every bar still open. The exit hook calls this; hosts
    /// may also call it during their own shutdown. Each bar is closed at
    /// most once, already-closed bars are no-ops, and a failing or
    /// panicking close never stops the sweep.
    pub fn close_all(&self) {
        let snapshot: Vec<_> = self.lock_bars().clone();
        for bar in &snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| bar.close())) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "failed to close progress bar during sweep");
                }
                Err(_) => {
                    tracing::warn!("close callback panicked during sweep");
                }
            }
        }
        self.lock_bars().clear();
    }

    fn lock_bars(&self) -> MutexGuard<'_, Vec<Arc<BarInner>>> {
        // Recover from poisoning - the sweep must run even after a panic
        self.bars
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BarConfig;
    use crate::testing::RecordingSurface;
    use crate::ProgressBar;

    fn new_pair() -> (Arc<RecordingSurface>, Arc<Registry>) {
        (
            Arc::new(RecordingSurface::new()),
            Arc::new(Registry::new()),
        )
    }

    #[test]
    fn bars_register_on_create_and_deregister_on_close() {
        let (surface, registry) = new_pair();

        let bar = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();
        assert_eq!(registry.open_count(), 1);

        bar.close().unwrap();
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn sweep_closes_every_open_bar_exactly_once() {
        let (surface, registry) = new_pair();

        let first = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();
        let second = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();

        registry.close_all();
        assert_eq!(registry.open_count(), 0);
        assert_eq!(surface.close_count(), 2);
        assert!(first.is_closed());
        assert!(second.is_closed());

        registry.close_all();
        assert_eq!(surface.close_count(), 2);
    }

    #[test]
    fn sweep_skips_bars_the_caller_already_closed() {
        let (surface, registry) = new_pair();

        let closed = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();
        let open = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();

        closed.close().unwrap();
        registry.close_all();

        assert_eq!(surface.close_count(), 2);
        assert!(open.is_closed());
    }

    #[test]
    fn sweep_survives_a_panicking_close_callback() {
        let (surface, registry) = new_pair();

        let _panicky = ProgressBar::create_with(
            BarConfig {
                on_close: Some(Box::new(|_| panic!("host callback exploded"))),
                ..BarConfig::default()
            },
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();
        let survivor = ProgressBar::create_with(
            BarConfig::default(),
            surface.clone(),
            Arc::clone(&registry),
        )
        .unwrap();

        registry.close_all();

        assert_eq!(registry.open_count(), 0);
        assert_eq!(surface.close_count(), 2);
        assert!(survivor.is_closed());
    }
}
