//! Error types for the resource pipeline.
//!
//! [`ResourceError`] is what callers of [`crate::Pipeline::invoke`] see. Every
//! variant is attributed at the point of detection; nothing is retried.
//!
//! [`ControllerError`] is what a [`crate::Controller`] reports. Provider search
//! wraps it into [`ResourceError::ControllerInvocation`] together with the name
//! of the controller that failed, keeping the original error as the source.

use thiserror::Error;

use crate::{ControllerName, Method, ResourceName};

/// Boxed error used for backend failures and body producers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Controller-level errors
// ---------------------------------------------------------------------------

/// Errors a controller raises from one of its verb methods.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// The controller does not implement the requested verb.
    ///
    /// Provider search never dispatches a verb outside the controller's declared
    /// capabilities, so seeing this means the descriptor lies.
    #[error("method {method} is not supported")]
    Unsupported {
        /// The verb that was requested.
        method: Method,
    },

    /// The underlying storage failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Any other backend failure.
    #[error(transparent)]
    Backend(BoxError),
}

impl ControllerError {
    /// Wraps an arbitrary backend error.
    pub fn backend(error: impl Into<BoxError>) -> Self {
        Self::Backend(error.into())
    }
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors produced by a pipeline invocation.
///
/// Either a complete [`crate::Response`] or one of these is returned, never
/// both.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A required resource was absent on read.
    ///
    /// Produced by: the required-resource validation node.
    #[error("Resource not found: {name}")]
    ResourceNotFound {
        /// The resource name as it was when the read completed.
        name: ResourceName,
    },

    /// More than one controller matched a mutating request.
    #[error("Ambiguous controller for {method} {name}: {}", format_names(.candidates))]
    AmbiguousController {
        /// The mutating verb.
        method: Method,
        /// The resource the request targeted.
        name: ResourceName,
        /// Every controller left after filtering, in declaration order.
        candidates: Vec<ControllerName>,
    },

    /// No controller matched a mutating request.
    #[error("No controller for {method} {name} (candidate set emptied by {stage} filter)")]
    ControllerNotFound {
        /// The mutating verb.
        method: Method,
        /// The resource the request targeted.
        name: ResourceName,
        /// The filter stage that left no candidates.
        stage: &'static str,
    },

    /// The backend controller failed while performing its I/O.
    #[error("Controller '{controller}' failed")]
    ControllerInvocation {
        /// The controller that raised the error.
        controller: ControllerName,
        /// The controller's own error, unmodified.
        #[source]
        source: ControllerError,
    },

    /// A request or response body could not be encoded or decoded.
    #[error("Serialization failed for {name}: {message}")]
    Serialization {
        /// The resource whose body failed.
        name: ResourceName,
        /// Description of the failure.
        message: String,
        /// The underlying codec error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// The caller's cancellation token fired while the request was in flight.
    #[error("Operation canceled: {name}")]
    OperationCanceled {
        /// The resource the request targeted.
        name: ResourceName,
    },

    /// A node or the pipeline was configured inconsistently.
    ///
    /// Produced at composition time; a pipeline never starts with invalid
    /// configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ResourceError {
    /// Builds a [`ResourceError::Serialization`] from a codec error.
    pub fn serialization(name: &ResourceName, error: impl Into<BoxError>) -> Self {
        let source = error.into();
        Self::Serialization {
            name: name.clone(),
            message: source.to_string(),
            source: Some(source),
        }
    }
}

fn format_names(names: &[ControllerName]) -> String {
    names
        .iter()
        .map(ControllerName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ResourceError::AmbiguousController {
            method: Method::Create,
            name: ResourceName::new("file:/tmp/x").unwrap(),
            candidates: vec![
                ControllerName::new("a").unwrap(),
                ControllerName::new("b").unwrap(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Ambiguous controller for Create file:/tmp/x: a, b"
        );
    }

    #[test]
    fn test_invocation_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ResourceError::ControllerInvocation {
            controller: ControllerName::new("files").unwrap(),
            source: ControllerError::from(io),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "denied");
    }
}
