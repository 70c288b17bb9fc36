use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use pipeline::{
    Capabilities, Controller, ControllerDescriptor, ControllerError, ControllerName,
    ControllerTag, Request, Response,
};

/// Read-only blobs compiled into the binary, served under `embedded:`.
pub struct EmbeddedController {
    descriptor: ControllerDescriptor,
    blobs: HashMap<&'static str, &'static [u8]>,
}

impl EmbeddedController {
    /// Creates a controller over `(path, contents)` pairs, typically built with
    /// `include_bytes!`.
    pub fn new(
        name: ControllerName,
        blobs: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> Self {
        let mut descriptor = ControllerDescriptor::new(name)
            .with_scheme("embedded")
            .with_capabilities(Capabilities::READ_ONLY);
        if let Some(tag) = ControllerTag::new("readonly") {
            descriptor = descriptor.with_tag(tag);
        }
        Self {
            descriptor,
            blobs: blobs.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Controller for EmbeddedController {
    fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    async fn read(&self, request: &Request) -> Result<Response, ControllerError> {
        Ok(match self.blobs.get(request.resource().path()) {
            Some(blob) => Response::success(request, Bytes::from_static(blob)),
            None => Response::not_found(request),
        })
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{Method, ResourceName, StatusCode};

    use super::*;

    #[tokio::test]
    async fn test_read_blob() {
        let c = EmbeddedController::new(
            ControllerName::new("embedded").unwrap(),
            [("logo.txt", b"<logo>".as_slice())],
        );
        let hit = c
            .read(&Request::read(ResourceName::new("embedded:logo.txt").unwrap()))
            .await
            .unwrap();
        assert_eq!(hit.status, StatusCode::Success);

        let miss = c
            .read(&Request::read(ResourceName::new("embedded:nope").unwrap()))
            .await
            .unwrap();
        assert_eq!(miss.status, StatusCode::NotFound);
    }

    #[test]
    fn test_declares_read_only() {
        let c = EmbeddedController::new(
            ControllerName::new("embedded").unwrap(),
            Vec::<(&str, &[u8])>::new(),
        );
        let caps = c.descriptor().capabilities;
        assert!(caps.contains(Method::Read));
        assert!(!caps.contains(Method::Create));
    }
}
