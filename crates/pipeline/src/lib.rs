//! Core of the resource pipeline.
//!
//! Heterogeneous named resources (files, in-memory maps, embedded blobs,
//! settings) are addressed by URI-style names and accessed through one
//! request/response API. A [`Pipeline`] threads each [`Request`] through an
//! ordered chain of cross-cutting [`Node`]s and ends in [`ProviderSearch`],
//! which resolves the request to a [`Controller`] and executes it.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate performs no file or network I/O.
//! Concrete controllers live in the `controllers` crate and concrete nodes in
//! the `nodes` crate.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ResourceName`, `ControllerName`, `RequestId`) |
//! | [`types`] | Request/response model (`Request`, `Response`, `Body`, `Method`, ...) |
//! | [`errors`] | `ResourceError` taxonomy and `ControllerError` |
//! | [`controller`] | The `Controller` capability interface |
//! | [`chain`] | `Node`, `Next`, `Pipeline`, `PipelineBuilder` |
//! | [`search`] | `ProviderSearch`, the terminal node |

pub mod chain;
pub mod controller;
pub mod errors;
pub mod identifiers;
pub mod search;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use chain::{Next, Node, Pipeline, PipelineBuilder, Terminal};
pub use controller::{Controller, ControllerDescriptor};
pub use errors::{BoxError, ControllerError, ResourceError};
pub use identifiers::{ControllerName, ControllerTag, RequestId, ResourceName};
pub use search::ProviderSearch;
pub use types::{
    Body, BodyProducer, BodyType, Capabilities, Encoding, MaxAge, Method, NameStack, Request,
    Response, StatusCode, TypedBody,
};

// Callers construct cancellation tokens without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;
