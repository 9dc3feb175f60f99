//! Failures that end a run.

use thiserror::Error;

/// Errors that abort a run.
///
/// Failures of individual caption uploads are not represented here: they are recorded in the
/// [`BatchSummary`](crate::orchestrator::BatchSummary) and the batch carries on.
#[derive(Debug, Error)]
pub enum Error {
    /// Obtaining or refreshing the OAuth credential failed.
    #[error("authentication failed: {0:#}")]
    Auth(eyre::Report),

    /// Arguments or local files are unusable. Always raised before any network call.
    #[error("invalid input: {0}")]
    Input(String),

    /// Creating the video on YouTube failed.
    #[error("video upload failed: {0:#}")]
    Upload(eyre::Report),
}

impl Error {
    pub(crate) fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }
}
