//! Resource controllers.
//!
//! Each controller implements the [`pipeline::Controller`] capability
//! interface for one kind of backend:
//!
//! | Controller | Scheme | Verbs |
//! |------------|--------|-------|
//! | [`MemoryController`] | `mem:` | read, create, update, delete |
//! | [`FileController`] | `file:` and relative names | read, create, update, delete |
//! | [`EmbeddedController`] | `embedded:` | read |
//! | [`SettingsController`] | `settings:` | read |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Storage details live here; the [`pipeline`] crate sees
//! only [`pipeline::Controller`].

mod embedded;
mod file;
mod memory;
mod settings;

pub use embedded::EmbeddedController;
pub use file::FileController;
pub use memory::MemoryController;
pub use settings::SettingsController;

use bytes::Bytes;
use pipeline::{ControllerError, Request};
use thiserror::Error;

/// A controller was handed a body it cannot store.
///
/// Typed and deferred bodies must be turned into bytes by a node before they
/// reach a controller.
#[derive(Debug, Error)]
#[error("request body for {name} is not materialized; add the serialization or body stream node")]
pub struct UnmaterializedBody {
    name: String,
}

/// Returns the request body as bytes or an error naming the resource.
pub(crate) fn body_bytes(request: &Request) -> Result<Bytes, ControllerError> {
    request.body.to_bytes(request.encoding).ok_or_else(|| {
        ControllerError::backend(UnmaterializedBody {
            name: request.resource().to_string(),
        })
    })
}
