//! Request and response model exchanged through the pipeline.
//!
//! A [`Request`] is created per call, threaded through every node, and dropped
//! once the [`Response`] is consumed. Bodies are owned values: a byte body is an
//! immutable [`Bytes`] buffer, so storing a copy in a cache never shares a
//! read position with the caller.

use std::any::{Any, TypeId};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{BoxError, ControllerName, RequestId, ResourceName};

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

/// The operation a request performs on a resource.
///
/// Transport-agnostic; maps conceptually onto HTTP GET/POST/PUT/DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Fetch the resource.
    Read,
    /// Create the resource.
    Create,
    /// Replace the resource.
    Update,
    /// Remove the resource.
    Delete,
}

impl Method {
    /// All verbs, in declaration order.
    pub const ALL: [Method; 4] = [Method::Read, Method::Create, Method::Update, Method::Delete];

    /// Returns `true` for every verb except [`Method::Read`].
    pub fn is_mutating(self) -> bool {
        !matches!(self, Method::Read)
    }

    fn bit(self) -> u8 {
        match self {
            Method::Read => 0b0001,
            Method::Create => 0b0010,
            Method::Update => 0b0100,
            Method::Delete => 0b1000,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The set of verbs a controller implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Every verb.
    pub const ALL: Capabilities = Capabilities(0b1111);
    /// [`Method::Read`] only.
    pub const READ_ONLY: Capabilities = Capabilities(0b0001);

    /// Builds a set from a list of verbs.
    pub fn of(methods: &[Method]) -> Self {
        Self(methods.iter().fold(0, |bits, m| bits | m.bit()))
    }

    /// Returns `true` if `method` is in the set.
    pub fn contains(self, method: Method) -> bool {
        self.0 & method.bit() != 0
    }

    /// Returns `true` if the set holds no verb.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Status, encoding, TTL
// ---------------------------------------------------------------------------

/// Outcome of a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The resource exists and the operation completed.
    Success,
    /// The resource does not exist.
    NotFound,
}

/// Text encoding used when converting text bodies to and from bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// UTF-8 (default).
    #[default]
    Utf8,
    /// ISO-8859-1: one byte per code point, U+0000..=U+00FF.
    Latin1,
}

impl Encoding {
    /// Encodes `text`; code points outside the encoding's range become `?`.
    pub fn encode(self, text: &str) -> Bytes {
        match self {
            Encoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            Encoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect::<Vec<_>>()
                .into(),
        }
    }

    /// Decodes `bytes`, failing on invalid UTF-8.
    pub fn decode(self, bytes: &[u8]) -> Result<String, std::str::Utf8Error> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).map(str::to_owned),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

/// Maximum age of a cached read response.
///
/// [`MaxAge::ZERO`] marks a request as not cacheable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct MaxAge(Duration);

impl MaxAge {
    /// Not cacheable.
    pub const ZERO: MaxAge = MaxAge(Duration::ZERO);

    /// Creates a [`MaxAge`] from a duration.
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Creates a [`MaxAge`] of whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Returns the underlying duration.
    pub fn as_duration(self) -> Duration {
        self.0
    }

    /// Returns `true` if the request may be served from cache.
    pub fn is_cacheable(self) -> bool {
        !self.0.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Identifies a Rust type a body is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyType {
    id: TypeId,
    name: &'static str,
}

impl BodyType {
    /// Returns the [`BodyType`] of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the type's name, for diagnostics.
    pub fn name(self) -> &'static str {
        self.name
    }
}

/// A body holding a structured value of some Rust type.
///
/// The value is shared immutably; cloning a [`TypedBody`] never copies it.
#[derive(Clone)]
pub struct TypedBody {
    value: Arc<dyn Any + Send + Sync>,
    ty: BodyType,
}

impl TypedBody {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            ty: BodyType::of::<T>(),
        }
    }

    /// Returns the type this body carries.
    pub fn body_type(&self) -> BodyType {
        self.ty
    }

    /// Returns the value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for TypedBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TypedBody").field(&self.ty.name).finish()
    }
}

/// A deferred body: produces its bytes only when invoked.
#[derive(Clone)]
pub struct BodyProducer(Arc<dyn Fn() -> Result<Bytes, BoxError> + Send + Sync>);

impl BodyProducer {
    /// Wraps a producer function.
    pub fn new<F>(produce: F) -> Self
    where
        F: Fn() -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(produce))
    }

    /// Runs the producer.
    pub fn produce(&self) -> Result<Bytes, BoxError> {
        (self.0)()
    }
}

impl std::fmt::Debug for BodyProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BodyProducer(..)")
    }
}

/// The payload of a request or response.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Raw bytes.
    Bytes(Bytes),
    /// Text, converted with the request's [`Encoding`] when bytes are needed.
    Text(String),
    /// A structured value; see the JSON serialization node.
    Typed(TypedBody),
    /// A producer materialized into bytes before reaching a controller.
    Deferred(BodyProducer),
}

impl Body {
    /// Wraps a structured value.
    pub fn typed<T: Any + Send + Sync>(value: T) -> Self {
        Body::Typed(TypedBody::new(value))
    }

    /// Wraps a producer function.
    pub fn deferred<F>(produce: F) -> Self
    where
        F: Fn() -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        Body::Deferred(BodyProducer::new(produce))
    }

    /// Returns `true` for [`Body::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Returns the body as bytes if it is already materialized.
    ///
    /// `Typed` and `Deferred` bodies return `None`; they need a node to turn
    /// them into bytes first.
    pub fn to_bytes(&self, encoding: Encoding) -> Option<Bytes> {
        match self {
            Body::Empty => Some(Bytes::new()),
            Body::Bytes(bytes) => Some(bytes.clone()),
            Body::Text(text) => Some(encoding.encode(text)),
            Body::Typed(_) | Body::Deferred(_) => None,
        }
    }

    /// Returns the body as text if it is text or decodable bytes.
    pub fn to_text(&self, encoding: Encoding) -> Option<String> {
        match self {
            Body::Text(text) => Some(text.clone()),
            Body::Bytes(bytes) => encoding.decode(bytes).ok(),
            _ => None,
        }
    }

    /// Returns the structured value if the body holds a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Body::Typed(typed) => typed.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The resource name of a request, kept as a stack.
///
/// Nodes that rewrite the name push the new value; the original stays
/// available for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStack(Vec<ResourceName>);

impl NameStack {
    /// Creates a stack holding `name`.
    pub fn new(name: ResourceName) -> Self {
        Self(vec![name])
    }

    /// The name currently in effect.
    pub fn current(&self) -> &ResourceName {
        // The stack is created non-empty and never popped.
        &self.0[self.0.len() - 1]
    }

    /// The name the caller supplied.
    pub fn original(&self) -> &ResourceName {
        &self.0[0]
    }

    /// Pushes a rewritten name.
    pub fn push(&mut self, name: ResourceName) {
        self.0.push(name);
    }

    /// Every name, oldest first.
    pub fn history(&self) -> &[ResourceName] {
        &self.0
    }
}

/// A single resource operation.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation identifier, fresh per request.
    pub id: RequestId,
    /// The resource name, with rewrite history.
    pub name: NameStack,
    /// The verb.
    pub method: Method,
    /// The payload for `Create`/`Update`.
    pub body: Body,
    /// Restricts the candidates to the controller with this name or tag.
    pub controller: Option<String>,
    /// Whether a missing resource on read is an error. Defaults to `true`.
    pub required: bool,
    /// Response cache TTL. Defaults to [`MaxAge::ZERO`].
    pub max_age: MaxAge,
    /// Encoding for text bodies.
    pub encoding: Encoding,
    /// The structured type the caller wants the response body decoded into.
    pub expects: Option<BodyType>,
    /// Honored by controller I/O; firing aborts the request.
    pub cancellation: CancellationToken,
}

impl Request {
    /// Creates a request with default options.
    pub fn new(method: Method, name: ResourceName) -> Self {
        Self {
            id: RequestId::new_random(),
            name: NameStack::new(name),
            method,
            body: Body::Empty,
            controller: None,
            required: true,
            max_age: MaxAge::ZERO,
            encoding: Encoding::default(),
            expects: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Shorthand for a [`Method::Read`] request.
    pub fn read(name: ResourceName) -> Self {
        Self::new(Method::Read, name)
    }

    /// Shorthand for a [`Method::Create`] request carrying `body`.
    pub fn create(name: ResourceName, body: impl Into<Body>) -> Self {
        Self::new(Method::Create, name).with_body(body)
    }

    /// Shorthand for a [`Method::Update`] request carrying `body`.
    pub fn update(name: ResourceName, body: impl Into<Body>) -> Self {
        Self::new(Method::Update, name).with_body(body)
    }

    /// Shorthand for a [`Method::Delete`] request.
    pub fn delete(name: ResourceName) -> Self {
        Self::new(Method::Delete, name)
    }

    /// The name currently in effect.
    pub fn resource(&self) -> &ResourceName {
        self.name.current()
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_controller(mut self, name_or_tag: impl Into<String>) -> Self {
        self.controller = Some(name_or_tag.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_max_age(mut self, max_age: MaxAge) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Declares that the response body should be decoded into a `T`.
    pub fn expecting<T: Any>(mut self) -> Self {
        self.expects = Some(BodyType::of::<T>());
        self
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The result of a pipeline invocation.
#[derive(Debug, Clone)]
pub struct Response {
    /// The request this responds to.
    pub request_id: RequestId,
    /// The resource name the controller saw.
    pub name: ResourceName,
    /// Whether the resource existed.
    pub status: StatusCode,
    /// The payload.
    pub body: Body,
    /// The controller that produced the response, if one was reached.
    pub controller: Option<ControllerName>,
    /// `true` if the response was served from the in-memory cache.
    pub cached: bool,
}

impl Response {
    /// A [`StatusCode::Success`] response to `request`.
    pub fn success(request: &Request, body: impl Into<Body>) -> Self {
        Self {
            request_id: request.id,
            name: request.resource().clone(),
            status: StatusCode::Success,
            body: body.into(),
            controller: None,
            cached: false,
        }
    }

    /// A [`StatusCode::NotFound`] response to `request`.
    pub fn not_found(request: &Request) -> Self {
        Self {
            request_id: request.id,
            name: request.resource().clone(),
            status: StatusCode::NotFound,
            body: Body::Empty,
            controller: None,
            cached: false,
        }
    }

    /// Returns `true` for [`StatusCode::Success`].
    pub fn exists(&self) -> bool {
        self.status == StatusCode::Success
    }
}
