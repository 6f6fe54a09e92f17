//! Errors raised while writing or reading a run report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The report could not be rendered as JSON.
    #[error("cannot render run report: {0}")]
    Render(#[source] serde_json::Error),

    /// The text is not a JSON run report.
    #[error("not a run report: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The report was written with a different report format version.
    #[error("run report format {found} is not readable, expected {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}
