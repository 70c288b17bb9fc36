//! Provider search: the terminal node that resolves a request to a controller.
//!
//! ## Resolution
//!
//! Candidates are the controllers declaring the request's verb, in
//! registration order, reduced left to right by three filters: scheme,
//! relative-name support, and the optional name/tag filter.
//!
//! - `Read` invokes each candidate in order; the first [`StatusCode::Success`]
//!   wins. If none succeeds the response is [`StatusCode::NotFound`].
//! - `Create`/`Update`/`Delete` require exactly one candidate. Zero raises
//!   [`ResourceError::ControllerNotFound`], more raises
//!   [`ResourceError::AmbiguousController`].
//!
//! ## Resolution cache
//!
//! The chosen controller is memoized per `(Method, ResourceName, controller
//! filter)` for the lifetime of the search. Every filter is a pure function of
//! that key, so a hit stands for the same candidate set a full search would
//! build: a mutation still has exactly one candidate, and a request pinned to
//! one controller never steers requests with another filter or none.
//!
//! A cached read that reports not-found is evicted and searched again. A cached
//! read that still succeeds is served by the remembered controller even if an
//! earlier candidate has since gained the resource; reads stay with the
//! controller that first served them until it stops having the resource.
//!
//! The cache lock is held only to read or write the map, never across a
//! controller call. Two concurrent first-time resolutions of one key may both
//! search; both reach the same answer and the last insert wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    Controller, ControllerDescriptor, Method, Request, ResourceError, ResourceName, Response,
    Terminal,
};

type Filter = fn(&ControllerDescriptor, &Request) -> bool;

fn by_scheme(descriptor: &ControllerDescriptor, request: &Request) -> bool {
    descriptor.matches_scheme(request.resource())
}

fn by_relative(descriptor: &ControllerDescriptor, request: &Request) -> bool {
    descriptor.matches_relative(request.resource())
}

fn by_controller(descriptor: &ControllerDescriptor, request: &Request) -> bool {
    descriptor.matches_filter(request.controller.as_deref())
}

/// Candidate filters, applied in order.
const FILTERS: [(&str, Filter); 3] = [
    ("scheme", by_scheme as Filter),
    ("relative", by_relative as Filter),
    ("controller", by_controller as Filter),
];

/// Method, resolved name, and the request's controller filter.
type ResolutionKey = (Method, ResourceName, Option<String>);

/// Resolves requests to controllers and executes them.
pub struct ProviderSearch {
    controllers: Vec<Arc<dyn Controller>>,
    /// Indices into `controllers`, per verb, fixed at construction.
    by_method: HashMap<Method, Vec<usize>>,
    resolved: Mutex<HashMap<ResolutionKey, usize>>,
    searches: AtomicUsize,
}

impl ProviderSearch {
    /// Composes a search over `controllers`, in priority order.
    ///
    /// Fails if two controllers share a name or a controller declares no verb.
    pub fn new(controllers: Vec<Arc<dyn Controller>>) -> Result<Self, ResourceError> {
        let mut seen = std::collections::HashSet::new();
        for controller in &controllers {
            let descriptor = controller.descriptor();
            if !seen.insert(descriptor.name.clone()) {
                return Err(ResourceError::Configuration {
                    message: format!("duplicate controller name '{}'", descriptor.name),
                });
            }
            if descriptor.capabilities.is_empty() {
                return Err(ResourceError::Configuration {
                    message: format!("controller '{}' declares no capabilities", descriptor.name),
                });
            }
        }

        let by_method = Method::ALL
            .iter()
            .map(|&method| {
                let indices = controllers
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.descriptor().capabilities.contains(method))
                    .map(|(i, _)| i)
                    .collect();
                (method, indices)
            })
            .collect();

        Ok(Self {
            controllers,
            by_method,
            resolved: Mutex::new(HashMap::new()),
            searches: AtomicUsize::new(0),
        })
    }

    /// Number of full candidate searches performed so far.
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::Relaxed)
    }

    /// Number of memoized resolutions.
    pub fn resolved_count(&self) -> usize {
        self.resolved.lock().len()
    }

    fn cached(&self, key: &ResolutionKey) -> Option<usize> {
        self.resolved.lock().get(key).copied()
    }

    fn remember(&self, key: ResolutionKey, index: usize) {
        self.resolved.lock().insert(key, index);
    }

    fn forget(&self, key: &ResolutionKey) {
        self.resolved.lock().remove(key);
    }

    /// Reduces the verb's candidates through [`FILTERS`].
    ///
    /// Returns the name of the stage that emptied the set on failure.
    fn candidates(&self, request: &Request) -> Result<Vec<usize>, &'static str> {
        let initial = self
            .by_method
            .get(&request.method)
            .cloned()
            .unwrap_or_default();
        if initial.is_empty() {
            return Err("capability");
        }
        FILTERS
            .iter()
            .try_fold(initial, |mut candidates, (stage, keep)| {
                candidates.retain(|&i| keep(self.controllers[i].descriptor(), request));
                if candidates.is_empty() {
                    Err(*stage)
                } else {
                    Ok(candidates)
                }
            })
    }

    async fn invoke(&self, index: usize, request: &Request) -> Result<Response, ResourceError> {
        let controller = &self.controllers[index];
        let name = &controller.descriptor().name;
        let result = tokio::select! {
            biased;
            _ = request.cancellation.cancelled() => {
                return Err(ResourceError::OperationCanceled {
                    name: request.resource().clone(),
                });
            }
            result = controller.execute(request) => result,
        };
        let mut response = result.map_err(|source| ResourceError::ControllerInvocation {
            controller: name.clone(),
            source,
        })?;
        response.request_id = request.id;
        response.controller = Some(name.clone());
        Ok(response)
    }

    async fn search(
        &self,
        key: ResolutionKey,
        request: &Request,
        skip: Option<usize>,
    ) -> Result<Response, ResourceError> {
        self.searches.fetch_add(1, Ordering::Relaxed);
        let candidates = self.candidates(request);

        if request.method == Method::Read {
            let Ok(candidates) = candidates else {
                debug!("no controller accepts this name");
                return Ok(Response::not_found(request));
            };
            for index in candidates.into_iter().filter(|i| Some(*i) != skip) {
                let response = self.invoke(index, request).await?;
                if response.exists() {
                    info!(controller = %self.controllers[index].descriptor().name, "resolved");
                    self.remember(key, index);
                    return Ok(response);
                }
                debug!(
                    controller = %self.controllers[index].descriptor().name,
                    "not found, trying next candidate"
                );
            }
            return Ok(Response::not_found(request));
        }

        let candidates = candidates.map_err(|stage| ResourceError::ControllerNotFound {
            method: request.method,
            name: request.resource().clone(),
            stage,
        })?;
        match candidates.as_slice() {
            [index] => {
                info!(controller = %self.controllers[*index].descriptor().name, "resolved");
                self.remember(key, *index);
                self.invoke(*index, request).await
            }
            many => {
                let names = many
                    .iter()
                    .map(|&i| self.controllers[i].descriptor().name.clone())
                    .collect::<Vec<_>>();
                warn!(candidates = ?names, "ambiguous controller resolution");
                Err(ResourceError::AmbiguousController {
                    method: request.method,
                    name: request.resource().clone(),
                    candidates: names,
                })
            }
        }
    }
}

#[async_trait]
impl Terminal for ProviderSearch {
    async fn dispatch(&self, request: Request) -> Result<Response, ResourceError> {
        if request.cancellation.is_cancelled() {
            return Err(ResourceError::OperationCanceled {
                name: request.resource().clone(),
            });
        }

        let key = (
            request.method,
            request.resource().clone(),
            request.controller.clone(),
        );
        let mut skip = None;
        if let Some(index) = self.cached(&key) {
            debug!("resolution cache hit");
            let response = self.invoke(index, &request).await?;
            if response.exists() || request.method.is_mutating() {
                return Ok(response);
            }
            debug!("cached controller reports not-found, searching again");
            skip = Some(index);
            self.forget(&key);
        }
        self.search(key, &request, skip).await
    }
}
