//! Node chain composition and invocation.
//!
//! A [`Pipeline`] is an immutable, ordered list of [`Node`]s followed by a
//! single [`Terminal`]. Invocation walks the list with a [`Next`] cursor: each
//! node receives the cursor positioned at the following stage and decides
//! whether to call it. Nothing in the chain is mutated after
//! [`PipelineBuilder::build`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use crate::{Request, ResourceError, Response};

/// A cross-cutting pipeline stage.
///
/// A node may rewrite the request before calling `next`, post-process the
/// response `next` returns, or produce a response itself without calling
/// `next` at all.
#[async_trait]
pub trait Node: Send + Sync {
    /// Short stable name used in logs and [`Pipeline::stages`].
    fn name(&self) -> &'static str;

    async fn invoke(&self, request: Request, next: Next<'_>) -> Result<Response, ResourceError>;
}

/// The last stage of every pipeline. Never delegates further.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn dispatch(&self, request: Request) -> Result<Response, ResourceError>;
}

/// Continuation handed to a [`Node`]: the remaining stages of the chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    nodes: &'a [Arc<dyn Node>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Creates a cursor over `nodes` ending in `terminal`.
    ///
    /// Useful for driving a single node in isolation.
    pub fn new(nodes: &'a [Arc<dyn Node>], terminal: &'a dyn Terminal) -> Self {
        Self { nodes, terminal }
    }

    /// Runs the remaining stages.
    pub async fn run(self, request: Request) -> Result<Response, ResourceError> {
        match self.nodes.split_first() {
            Some((node, rest)) => {
                tracing::trace!(node = node.name(), "entering node");
                node.invoke(request, Next::new(rest, self.terminal)).await
            }
            None => self.terminal.dispatch(request).await,
        }
    }
}

/// A composed pipeline: built once, shared across concurrent requests.
#[derive(Clone)]
pub struct Pipeline {
    nodes: Arc<[Arc<dyn Node>]>,
    terminal: Arc<dyn Terminal>,
}

impl Pipeline {
    /// Starts composing a pipeline that ends in `terminal`.
    pub fn builder(terminal: Arc<dyn Terminal>) -> PipelineBuilder {
        PipelineBuilder {
            nodes: Vec::new(),
            terminal,
        }
    }

    /// Executes one resource operation.
    pub async fn invoke(&self, request: Request) -> Result<Response, ResourceError> {
        let span = tracing::info_span!(
            "pipeline.invoke",
            request_id = %request.id,
            method = %request.method,
            resource = %request.resource(),
        );
        let result = Next::new(&self.nodes, self.terminal.as_ref())
            .run(request)
            .instrument(span.clone())
            .await;
        span.in_scope(|| match &result {
            Ok(response) => tracing::debug!(
                status = ?response.status,
                cached = response.cached,
                "request completed"
            ),
            Err(error) => tracing::debug!(%error, "request failed"),
        });
        result
    }

    /// Node names in execution order.
    pub fn stages(&self) -> Vec<&'static str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }
}

/// Collects nodes in execution order.
pub struct PipelineBuilder {
    nodes: Vec<Arc<dyn Node>>,
    terminal: Arc<dyn Terminal>,
}

impl PipelineBuilder {
    /// Appends `node` after the nodes added so far.
    pub fn node(mut self, node: impl Node + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Appends an already shared node.
    pub fn shared_node(mut self, node: Arc<dyn Node>) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn build(self) -> Pipeline {
        tracing::debug!(
            stages = ?self.nodes.iter().map(|n| n.name()).collect::<Vec<_>>(),
            "pipeline composed"
        );
        Pipeline {
            nodes: self.nodes.into(),
            terminal: self.terminal,
        }
    }
}
