//! # hudbar-core
//!
//! Lifecycle core for native progress-bar/HUD surfaces. Each
//! [`ProgressBar`] wraps one opaque surface handle: create it, push updates
//! through a single guarded path, close it exactly once, and let the
//! exit-time sweep reclaim anything the host forgot.
//!
//! ## Design principles
//!
//! - **Synchronous**: every operation runs on the caller's thread; the
//!   surface is invoked inline and nothing blocks beyond that call.
//! - **No stale handles**: a closed bar can never reach the surface again.
//!   Late updates (stale host timers) are silent no-ops by contract.
//! - **Graceful degradation**: with no surface installed the core logs one
//!   warning and runs against [`NoopSurface`], so host logic never needs
//!   defensive checks.
//! - **No leaks**: the process-wide registry force-closes still-open bars
//!   at exit, swallowing per-instance failures.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use hudbar_core::{BarConfig, ProgressBar};
//!
//! let bar = ProgressBar::create(BarConfig {
//!     title: "Build".to_string(),
//!     ..BarConfig::default()
//! })?;
//! bar.set_progress(50)?;
//! bar.set_message("Linking")?;
//! bar.close()?;
//! ```

pub mod bar;
pub mod config;
pub mod error;
pub mod registry;
pub mod surface;
pub mod testing;

pub use bar::ProgressBar;
pub use config::{BarConfig, BarUpdate, Button, ClickAction, CloseAction, Style, MAX_PROGRESS};
pub use error::{BarError, Result};
pub use registry::Registry;
pub use surface::{
    default_surface, install_surface, NoopSurface, Surface, SurfaceButton, SurfaceHandle,
};
