//! Typed capture-pipeline errors.
//!
//! All variants implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator at command boundaries.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures in the capture pipeline.
///
/// `Resolution`, `MalformedOutput` and `NoMatch` abort before any capture
/// resource exists. `PipeCreation` and `ViewerStart` abort mid-setup after
/// cleanup of whatever was already created. Per-target stream failures are
/// warnings, not errors; cleanup failures are never raised at all.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The jumpbox could not be reached or the discovery command failed.
    #[error("failed to execute discovery on {host}: {detail}")]
    Resolution { host: String, detail: String },

    /// The jumpbox answered, but its output is uninterpretable.
    #[error("unexpected output from jumpbox: {0:?}")]
    MalformedOutput(String),

    /// No requested node matched any row of the discovery table.
    #[error("could not find requested nodes ({0})")]
    NoMatch(String),

    /// A FIFO could not be created; fatal for the whole session.
    #[error("failed to create fifo {}: {source}", .path.display())]
    PipeCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The local viewer refused to start; no streams were attached.
    #[error("failed to start the capture viewer (is wireshark in your PATH?): {0}")]
    ViewerStart(String),
}
