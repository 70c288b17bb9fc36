//! The capability interface a backend implements.
//!
//! A controller serves resources for a set of schemes. It implements any
//! non-empty subset of the four verbs and declares that subset in its
//! [`ControllerDescriptor`]; provider search reads the descriptor once, when
//! the pipeline is composed, and never dispatches a verb the controller did not
//! declare.

use async_trait::async_trait;

use crate::{
    Capabilities, ControllerError, ControllerName, ControllerTag, Method, Request, ResourceName,
    Response,
};

/// Static match predicates and capabilities of a controller.
#[derive(Debug, Clone)]
pub struct ControllerDescriptor {
    /// Unique name, matched against [`Request::controller`].
    pub name: ControllerName,
    /// Accepted schemes, lower-case. Empty means the controller only serves
    /// relative names.
    pub schemes: Vec<String>,
    /// Tags, also matched against [`Request::controller`].
    pub tags: Vec<ControllerTag>,
    /// Whether names without a scheme are accepted.
    pub accepts_relative: bool,
    /// The verbs the controller implements.
    pub capabilities: Capabilities,
}

impl ControllerDescriptor {
    /// Creates a descriptor with no schemes, no tags, and every capability.
    pub fn new(name: ControllerName) -> Self {
        Self {
            name,
            schemes: Vec::new(),
            tags: Vec::new(),
            accepts_relative: false,
            capabilities: Capabilities::ALL,
        }
    }

    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.schemes.push(scheme.to_ascii_lowercase());
        self
    }

    pub fn with_tag(mut self, tag: ControllerTag) -> Self {
        self.tags.push(tag);
        self
    }

    pub fn with_relative(mut self, accepts: bool) -> Self {
        self.accepts_relative = accepts;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Scheme filter: relative names pass here and are decided by
    /// [`Self::matches_relative`].
    pub fn matches_scheme(&self, name: &ResourceName) -> bool {
        match name.scheme() {
            Some(scheme) => self.schemes.iter().any(|s| *s == scheme),
            None => true,
        }
    }

    /// Relative-name filter.
    pub fn matches_relative(&self, name: &ResourceName) -> bool {
        !name.is_relative() || self.accepts_relative
    }

    /// Name/tag filter; `None` matches every controller.
    pub fn matches_filter(&self, filter: Option<&str>) -> bool {
        match filter {
            None => true,
            Some(f) => self.name.as_str() == f || self.tags.iter().any(|t| t.as_str() == f),
        }
    }
}

/// A backend serving CRUD-style operations on resources.
///
/// Each verb method has a default body returning
/// [`ControllerError::Unsupported`]; implementors override the verbs listed in
/// their descriptor's capabilities. A verb returns a [`Response`] with
/// [`crate::StatusCode::NotFound`] when the resource does not exist; errors are
/// reserved for I/O failures.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Returns the controller's match predicates and capabilities.
    fn descriptor(&self) -> &ControllerDescriptor;

    async fn read(&self, _request: &Request) -> Result<Response, ControllerError> {
        Err(ControllerError::Unsupported {
            method: Method::Read,
        })
    }

    async fn create(&self, _request: &Request) -> Result<Response, ControllerError> {
        Err(ControllerError::Unsupported {
            method: Method::Create,
        })
    }

    async fn update(&self, _request: &Request) -> Result<Response, ControllerError> {
        Err(ControllerError::Unsupported {
            method: Method::Update,
        })
    }

    async fn delete(&self, _request: &Request) -> Result<Response, ControllerError> {
        Err(ControllerError::Unsupported {
            method: Method::Delete,
        })
    }

    /// Dispatches `request` to the verb method matching its [`Method`].
    async fn execute(&self, request: &Request) -> Result<Response, ControllerError> {
        match request.method {
            Method::Read => self.read(request).await,
            Method::Create => self.create(request).await,
            Method::Update => self.update(request).await,
            Method::Delete => self.delete(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ControllerDescriptor {
        ControllerDescriptor::new(ControllerName::new("files").unwrap())
            .with_scheme("FILE")
            .with_tag(ControllerTag::new("disk").unwrap())
    }

    fn name(value: &str) -> ResourceName {
        ResourceName::new(value).unwrap()
    }

    #[test]
    fn test_scheme_filter() {
        let d = descriptor();
        assert!(d.matches_scheme(&name("file:/tmp/x")));
        assert!(!d.matches_scheme(&name("mem:x")));
        assert!(d.matches_scheme(&name("relative/x")));
    }

    #[test]
    fn test_relative_filter() {
        let d = descriptor();
        assert!(!d.matches_relative(&name("relative/x")));
        assert!(d.with_relative(true).matches_relative(&name("relative/x")));
    }

    #[test]
    fn test_name_or_tag_filter() {
        let d = descriptor();
        assert!(d.matches_filter(None));
        assert!(d.matches_filter(Some("files")));
        assert!(d.matches_filter(Some("disk")));
        assert!(!d.matches_filter(Some("memory")));
    }

    struct ReadOnly(ControllerDescriptor);

    #[async_trait]
    impl Controller for ReadOnly {
        fn descriptor(&self) -> &ControllerDescriptor {
            &self.0
        }

        async fn read(&self, request: &Request) -> Result<Response, ControllerError> {
            Ok(Response::success(request, "ok"))
        }
    }

    #[tokio::test]
    async fn test_unimplemented_verb_reports_unsupported() {
        let controller = ReadOnly(descriptor());
        let read = controller.execute(&Request::read(name("file:/x"))).await;
        assert!(read.is_ok());

        let delete = controller.execute(&Request::delete(name("file:/x"))).await;
        assert!(matches!(
            delete,
            Err(ControllerError::Unsupported {
                method: Method::Delete
            })
        ));
    }
}
