//! Error types for hudbar operations.

use crate::surface::SurfaceHandle;

/// All errors that can occur while driving a progress bar.
#[derive(Debug, thiserror::Error)]
pub enum BarError {
    /// Progress assignments outside `0..=100` are rejected before any state
    /// change or surface call. The previous value is preserved.
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),

    /// A surface implementation was handed a handle it does not know about,
    /// or one that has already been released. The wrapper itself never
    /// issues such a call; this exists for surface implementors.
    #[error("unknown or already-released surface handle {0}")]
    StaleHandle(SurfaceHandle),

    /// A process-wide surface was already installed; the first caller wins.
    #[error("a progress surface is already installed for this process")]
    SurfaceAlreadyInstalled,

    /// The surface failed to create a native indicator.
    #[error("surface failed to create indicator: {0}")]
    CreateFailed(String),

    /// Unrecognized style name in a configuration surface.
    #[error("unknown style {0:?}, expected one of: default, hud, utility")]
    UnknownStyle(String),
}

/// Convenience type alias for Results using BarError.
pub type Result<T> = std::result::Result<T, BarError>;
