use std::path::PathBuf;

/// Errors surfaced by the engine.
///
/// Configuration and data-dependent failures abort a run; transient per-pixel
/// conditions (candidate outside the image, hole overlap, exhausted random
/// draws) are counted in the run report instead and never reach this type.
#[derive(Debug, thiserror::Error)]
pub enum PatchMatchError {
    #[error("patch radius must be at least 1, got {radius}")]
    InvalidPatchRadius { radius: u32 },

    #[error("iteration count must be at least 1, got {iterations}")]
    InvalidIterations { iterations: u32 },

    #[error("match-set capacity k must be at least 1, got {k}")]
    InvalidMatchCapacity { k: u32 },

    #[error("image {width}x{height} cannot hold a patch of side {min_side}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_side: u32,
    },

    #[error("{what} extent {found_width}x{found_height} does not match image {width}x{height}")]
    ExtentMismatch {
        what: &'static str,
        found_width: usize,
        found_height: usize,
        width: usize,
        height: usize,
    },

    #[error("{what} must be supplied before compute")]
    MissingInput { what: &'static str },

    #[error("no patch of the configured radius is fully inside the image and fully valid in the source mask")]
    NoValidSourceRegions,

    #[error("computation cancelled")]
    Cancelled,

    #[error("{}: {reason}", .path.display())]
    Io { path: PathBuf, reason: String },
}

impl PatchMatchError {
    /// Convenience constructor for I/O failures carrying the originating path.
    pub fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
