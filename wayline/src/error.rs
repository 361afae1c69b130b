//! Errors that make the worker skip a sample.
//!
//! Each module owns its error type. [`ProcessingError`] gathers the ones a
//! single sample can run into; the worker logs it and moves on to the next
//! item, so none of these ever stall the queue.

use thiserror::Error;

use crate::progress::ProgressError;
use crate::route::RouteError;
use crate::sample::SampleError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessingError {
    #[error("malformed sample: {0}")]
    Sample(#[from] SampleError),

    #[error("progress computation failed: {0}")]
    Progress(#[from] ProgressError),

    #[error("route rejected: {0}")]
    Route(#[from] RouteError),
}

impl ProcessingError {
    /// Short category name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Sample(SampleError::Filtered(_)) => "filtered",
            ProcessingError::Sample(_) => "malformed_sample",
            ProcessingError::Progress(_) => "progress",
            ProcessingError::Route(_) => "route",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteIndices;
    use crate::sample::FilterRejection;

    #[test]
    fn test_kind() {
        let filtered: ProcessingError = SampleError::Filtered(FilterRejection::Velocity {
            mps: 300.0,
            limit: 100.0,
        })
        .into();
        assert_eq!(filtered.kind(), "filtered");

        let malformed: ProcessingError = SampleError::InvalidCoordinates {
            latitude: 100.0,
            longitude: 0.0,
        }
        .into();
        assert_eq!(malformed.kind(), "malformed_sample");

        let progress: ProcessingError = ProgressError::EmptyGeometry(RouteIndices::default()).into();
        assert_eq!(progress.kind(), "progress");
        assert!(progress.to_string().contains("no geometry"));
    }
}
