//! Structured warnings surfaced by the pipeline.
//!
//! These never abort a run: each one marks a unit that was degraded or
//! skipped. The CLI decides how to present them.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// Fetching one attachment failed; the unit degraded to a remote link.
    MediaFetchFailed { url: String, reason: String },
    /// Declared size exceeded the configured ceiling; kept as a link.
    OversizeMedia { url: String, declared_size: u64 },
    /// A content block of a kind we do not understand; rendered as a
    /// placeholder line.
    UnknownUnit { kind: String },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderWarning::MediaFetchFailed { url, reason } => {
                write!(f, "failed to fetch {url}: {reason}")
            }
            RenderWarning::OversizeMedia { url, declared_size } => {
                write!(f, "skipped oversize attachment {url} ({declared_size} bytes)")
            }
            RenderWarning::UnknownUnit { kind } => {
                write!(f, "unrecognized content block type {kind:?}")
            }
        }
    }
}
