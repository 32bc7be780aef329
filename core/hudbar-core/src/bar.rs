//! The progress bar entity: one surface handle, one guarded lifecycle.
//!
//! Every mutating call funnels through [`ProgressBar::update`], which checks
//! the handle before touching the surface. Once closed the handle is gone
//! and the surface is unreachable from this bar, permanently.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::config::{BarConfig, BarUpdate, Button, CloseAction, Style, MAX_PROGRESS};
use crate::error::{BarError, Result};
use crate::registry::Registry;
use crate::surface::{default_surface, Surface, SurfaceButton, SurfaceHandle};

/// Handle to a progress indicator. Cloning is cheap; all clones drive the
/// same surface resource.
#[derive(Clone)]
pub struct ProgressBar {
    inner: Arc<BarInner>,
}

pub(crate) struct BarInner {
    surface: Arc<dyn Surface>,
    registry: Arc<Registry>,
    title: String,
    style: Style,
    state: Mutex<BarState>,
}

struct BarState {
    /// Present while open. Taking it is the close transition, and there is
    /// exactly one code path that does so.
    handle: Option<SurfaceHandle>,
    progress: u8,
    message: String,
    buttons: Vec<Button>,
    /// Mirror of the set last pushed to the surface, compared by assignment
    /// identity to decide whether a button payload must be resent.
    sent_buttons: Vec<Button>,
    on_close: Option<CloseAction>,
}

impl ProgressBar {
    /// Creates an indicator on the process-wide surface and registers it
    /// for exit-time cleanup.
    pub fn create(config: BarConfig) -> Result<Self> {
        Self::create_with(config, default_surface(), Registry::global())
    }

    /// Fully injected constructor for hosts that manage their own surface
    /// or registry. [`ProgressBar::create`] delegates here with the
    /// process-wide pair.
    pub fn create_with(
        config: BarConfig,
        surface: Arc<dyn Surface>,
        registry: Arc<Registry>,
    ) -> Result<Self> {
        let BarConfig {
            title,
            message,
            style,
            buttons,
            on_close,
        } = config;

        let inner = Arc::new(BarInner {
            surface,
            registry: Arc::clone(&registry),
            title,
            style,
            state: Mutex::new(BarState {
                handle: None,
                progress: 0,
                message: message.clone(),
                buttons: Vec::new(),
                sent_buttons: Vec::new(),
                on_close,
            }),
        });

        let wired = wrap_buttons(&Arc::downgrade(&inner), &buttons);
        let handle = inner
            .surface
            .create(&inner.title, &message, inner.style, &wired)?;

        {
            let mut state = inner.lock_state();
            state.handle = Some(handle);
            state.buttons = buttons.clone();
            state.sent_buttons = buttons;
        }

        registry.register(Arc::clone(&inner));
        tracing::debug!(handle = %handle, title = %inner.title, "progress bar created");
        Ok(ProgressBar { inner })
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn style(&self) -> Style {
        self.inner.style
    }

    /// Current progress percentage, `0..=100`.
    pub fn progress(&self) -> u8 {
        self.inner.lock_state().progress
    }

    pub fn message(&self) -> String {
        self.inner.lock_state().message.clone()
    }

    pub fn buttons(&self) -> Vec<Button> {
        self.inner.lock_state().buttons.clone()
    }

    /// The surface handle, absent once closed.
    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.inner.lock_state().handle
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().handle.is_none()
    }

    /// Sets the progress percentage and pushes an update. Values above
    /// [`MAX_PROGRESS`] are rejected before any state change.
    pub fn set_progress(&self, value: u8) -> Result<()> {
        self.update(BarUpdate {
            progress: Some(value),
            ..BarUpdate::default()
        })
    }

    /// Sets the message line and pushes an update.
    pub fn set_message(&self, value: impl Into<String>) -> Result<()> {
        self.update(BarUpdate {
            message: Some(value.into()),
            ..BarUpdate::default()
        })
    }

    /// Replaces the button set and pushes an update. The surface only
    /// receives a button payload when the set actually changed.
    pub fn set_buttons(&self, buttons: Vec<Button>) -> Result<()> {
        self.update(BarUpdate {
            buttons: Some(buttons),
            ..BarUpdate::default()
        })
    }

    /// Shared mutation path: merges the supplied fields into current state
    /// and issues exactly one surface update.
    ///
    /// Closed-bar policy: updating a closed bar is a silent no-op returning
    /// `Ok(())`, uniformly here and in the `set_*` accessors. Hosts often
    /// drive bars from timers that outlive the indicator, so a late tick is
    /// tolerated rather than treated as a caller error.
    pub fn update(&self, args: BarUpdate) -> Result<()> {
        if let Some(value) = args.progress {
            if value > MAX_PROGRESS {
                return Err(BarError::ProgressOutOfRange(value));
            }
        }

        let mut state = self.inner.lock_state();
        let handle = match state.handle {
            Some(handle) => handle,
            None => return Ok(()),
        };

        if let Some(value) = args.progress {
            state.progress = value;
        }
        if let Some(value) = args.message {
            state.message = value;
        }

        let buttons_changed = match args.buttons {
            Some(new_buttons) => {
                let changed = buttons_differ(&new_buttons, &state.sent_buttons);
                state.buttons = new_buttons;
                if changed {
                    state.sent_buttons = state.buttons.clone();
                }
                changed
            }
            None => false,
        };

        let wired = if buttons_changed {
            wrap_buttons(&Arc::downgrade(&self.inner), &state.sent_buttons)
        } else {
            Vec::new()
        };

        self.inner.surface.update(
            handle,
            state.progress,
            &state.message,
            buttons_changed,
            &wired,
        )
    }

    /// Closes the indicator. Idempotent: only the first call reaches the
    /// surface, deregisters the bar, and fires `on_close`.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

impl fmt::Debug for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock_state();
        f.debug_struct("ProgressBar")
            .field("title", &self.inner.title)
            .field("progress", &state.progress)
            .field("closed", &state.handle.is_none())
            .finish()
    }
}

impl BarInner {
    fn lock_state(&self) -> MutexGuard<'_, BarState> {
        // Recover from poisoning - a panicking callback must not wedge the bar
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Close transition shared by the public API and the exit sweep.
    ///
    /// The handle is taken under the lock, so exactly one caller performs
    /// the transition; the surface call and `on_close` run with the lock
    /// released. A failing surface close still leaves the bar closed and
    /// deregistered, keeping the close-at-most-once invariant; the error is
    /// reported to the caller.
    pub(crate) fn close(self: &Arc<Self>) -> Result<()> {
        let (handle, on_close) = {
            let mut state = self.lock_state();
            match state.handle.take() {
                Some(handle) => (handle, state.on_close.take()),
                None => return Ok(()),
            }
        };

        let result = self.surface.close(handle);
        self.registry.unregister(self);
        tracing::debug!(handle = %handle, title = %self.title, "progress bar closed");

        if let Some(on_close) = on_close {
            on_close(&ProgressBar {
                inner: Arc::clone(self),
            });
        }

        result
    }
}

/// A button payload must be resent when the list length changed or any
/// element is a different assignment than what the surface last received.
fn buttons_differ(new_buttons: &[Button], sent: &[Button]) -> bool {
    new_buttons.len() != sent.len()
        || new_buttons
            .iter()
            .zip(sent)
            .any(|(new, old)| !new.same_assignment(old))
}

/// Wraps user buttons into zero-argument trampolines that re-inject
/// the owning bar into the click action. Trampolines hold only a weak
/// reference, so a stored button set cannot keep a bar alive on its own,
/// and a click that lands after close is dropped rather than delivered.
fn wrap_buttons(owner: &Weak<BarInner>, buttons: &[Button]) -> Vec<SurfaceButton> {
    buttons
        .iter()
        .map(|button| {
            let owner = Weak::clone(owner);
            let action = Arc::clone(&button.action);
            SurfaceButton {
                label: button.label.clone(),
                on_click: Arc::new(move || {
                    let inner = match owner.upgrade() {
                        Some(inner) => inner,
                        None => return,
                    };
                    let bar = ProgressBar { inner };
                    if bar.is_closed() {
                        return;
                    }
                    action(&bar);
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSurface, SurfaceCall};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn new_bar(config: BarConfig) -> (ProgressBar, Arc<RecordingSurface>, Arc<Registry>) {
        let surface = Arc::new(RecordingSurface::new());
        let registry = Arc::new(Registry::new());
        let bar = ProgressBar::create_with(config, surface.clone(), Arc::clone(&registry))
            .unwrap();
        (bar, surface, registry)
    }

    #[test]
    fn progress_round_trips_across_full_range() {
        let (bar, _surface, _registry) = new_bar(BarConfig::default());
        for p in 0..=MAX_PROGRESS {
            bar.set_progress(p).unwrap();
            assert_eq!(bar.progress(), p);
        }
    }

    #[test]
    fn out_of_range_progress_is_rejected_before_mutation() {
        let (bar, surface, _registry) = new_bar(BarConfig::default());
        bar.set_progress(40).unwrap();
        let calls_before = surface.call_count();

        for p in [101, 150, 255] {
            assert!(matches!(
                bar.set_progress(p),
                Err(BarError::ProgressOutOfRange(_))
            ));
        }

        assert_eq!(bar.progress(), 40);
        assert_eq!(surface.call_count(), calls_before);
    }

    #[test]
    fn create_passes_resolved_configuration() {
        let (_bar, surface, _registry) = new_bar(BarConfig {
            title: "Build".to_string(),
            message: "Starting".to_string(),
            ..BarConfig::default()
        });

        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::Create {
                title: "Build".to_string(),
                message: "Starting".to_string(),
                style: Style::Default,
                button_labels: vec![],
            }]
        );
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let (bar, surface, _registry) = new_bar(BarConfig {
            message: "Starting".to_string(),
            ..BarConfig::default()
        });

        bar.set_progress(50).unwrap();
        assert_eq!(
            surface.calls().last().unwrap(),
            &SurfaceCall::Update {
                handle: bar.handle().unwrap(),
                progress: 50,
                message: "Starting".to_string(),
                buttons_changed: false,
                button_labels: vec![],
            }
        );

        bar.set_message("Linking").unwrap();
        assert_eq!(bar.progress(), 50);
        assert_eq!(bar.message(), "Linking");
    }

    #[test]
    fn update_with_zero_progress_is_a_real_assignment() {
        let (bar, _surface, _registry) = new_bar(BarConfig::default());
        bar.set_progress(80).unwrap();

        bar.update(BarUpdate {
            progress: Some(0),
            ..BarUpdate::default()
        })
        .unwrap();

        assert_eq!(bar.progress(), 0);
    }

    #[test]
    fn close_releases_handle_exactly_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        let (bar, surface, registry) = new_bar(BarConfig {
            on_close: Some(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
            ..BarConfig::default()
        });

        bar.close().unwrap();
        assert!(bar.is_closed());
        assert!(bar.handle().is_none());
        assert_eq!(registry.open_count(), 0);
        assert_eq!(surface.close_count(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        bar.close().unwrap();
        assert_eq!(surface.close_count(), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_close_receives_the_owning_bar() {
        let (bar, _surface, _registry) = new_bar(BarConfig {
            title: "Export".to_string(),
            on_close: Some(Box::new(|closing| {
                assert_eq!(closing.title(), "Export");
                assert!(closing.is_closed());
            })),
            ..BarConfig::default()
        });

        bar.close().unwrap();
    }

    #[test]
    fn update_after_close_is_a_silent_no_op() {
        let (bar, surface, _registry) = new_bar(BarConfig::default());
        bar.close().unwrap();
        let calls_before = surface.call_count();

        bar.set_progress(50).unwrap();
        bar.set_message("late tick").unwrap();
        bar.update(BarUpdate::default()).unwrap();

        assert_eq!(surface.call_count(), calls_before);
        assert_eq!(bar.progress(), 0);
    }

    #[test]
    fn identical_button_set_sends_no_button_payload() {
        let buttons = vec![Button::new("Cancel", |_| {}), Button::new("Skip", |_| {})];
        let (bar, surface, _registry) = new_bar(BarConfig {
            buttons: buttons.clone(),
            ..BarConfig::default()
        });

        bar.set_buttons(buttons.clone()).unwrap();
        assert_eq!(
            surface.calls().last().unwrap(),
            &SurfaceCall::Update {
                handle: bar.handle().unwrap(),
                progress: 0,
                message: String::new(),
                buttons_changed: false,
                button_labels: vec![],
            }
        );
    }

    #[test]
    fn changed_button_set_resends_trampolines() {
        let (bar, surface, _registry) = new_bar(BarConfig {
            buttons: vec![Button::new("Cancel", |_| {})],
            ..BarConfig::default()
        });

        bar.set_buttons(vec![Button::new("Retry", |_| {})]).unwrap();
        match surface.calls().last().unwrap() {
            SurfaceCall::Update {
                buttons_changed,
                button_labels,
                ..
            } => {
                assert!(*buttons_changed);
                assert_eq!(button_labels, &vec!["Retry".to_string()]);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn emptied_button_set_counts_as_a_change() {
        let (bar, surface, _registry) = new_bar(BarConfig {
            buttons: vec![Button::new("Cancel", |_| {})],
            ..BarConfig::default()
        });

        bar.set_buttons(Vec::new()).unwrap();
        match surface.calls().last().unwrap() {
            SurfaceCall::Update {
                buttons_changed,
                button_labels,
                ..
            } => {
                assert!(*buttons_changed);
                assert!(button_labels.is_empty());
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn click_trampoline_reinjects_the_owning_bar() {
        let clicks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&clicks);
        let (bar, surface, _registry) = new_bar(BarConfig {
            buttons: vec![Button::new("Cancel", move |owner| {
                counter.fetch_add(1, Ordering::SeqCst);
                owner.set_message("cancelling").unwrap();
            })],
            ..BarConfig::default()
        });

        surface.click(0);
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert_eq!(bar.message(), "cancelling");
    }

    #[test]
    fn click_action_may_close_its_own_bar() {
        let (bar, surface, _registry) = new_bar(BarConfig {
            buttons: vec![Button::new("Cancel", |owner| {
                owner.close().unwrap();
            })],
            ..BarConfig::default()
        });

        surface.click(0);
        assert!(bar.is_closed());
        assert_eq!(surface.close_count(), 1);

        // A stale handle can never reach the surface afterwards.
        let calls_before = surface.call_count();
        bar.set_progress(99).unwrap();
        assert_eq!(surface.call_count(), calls_before);
    }

    #[test]
    fn failed_create_registers_nothing() {
        let surface = Arc::new(RecordingSurface::failing("platform component missing"));
        let registry = Arc::new(Registry::new());

        let result =
            ProgressBar::create_with(BarConfig::default(), surface, Arc::clone(&registry));
        assert!(matches!(result, Err(BarError::CreateFailed(_))));
        assert_eq!(registry.open_count(), 0);
    }
}
