use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use pipeline::{
    Body, Controller, ControllerDescriptor, ControllerError, ControllerName, ControllerTag,
    Request, Response,
};
use tracing::debug;

use crate::body_bytes;

/// Volatile resources held in a process-local map, keyed by the name's path.
pub struct MemoryController {
    descriptor: ControllerDescriptor,
    entries: RwLock<HashMap<String, Bytes>>,
}

impl MemoryController {
    /// Creates an empty controller serving the `mem` scheme.
    pub fn new(name: ControllerName) -> Self {
        let mut descriptor = ControllerDescriptor::new(name).with_scheme("mem");
        if let Some(tag) = ControllerTag::new("volatile") {
            descriptor = descriptor.with_tag(tag);
        }
        Self {
            descriptor,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `value` under `key` directly, bypassing the pipeline.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Bytes>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Controller for MemoryController {
    fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    async fn read(&self, request: &Request) -> Result<Response, ControllerError> {
        let value = self.entries.read().get(request.resource().path()).cloned();
        Ok(match value {
            Some(bytes) => Response::success(request, bytes),
            None => Response::not_found(request),
        })
    }

    async fn create(&self, request: &Request) -> Result<Response, ControllerError> {
        let bytes = body_bytes(request)?;
        let key = request.resource().path().to_owned();
        debug!(key = %key, len = bytes.len(), "storing entry");
        self.entries.write().insert(key, bytes);
        Ok(Response::success(request, Body::Empty))
    }

    async fn update(&self, request: &Request) -> Result<Response, ControllerError> {
        let bytes = body_bytes(request)?;
        let mut entries = self.entries.write();
        match entries.get_mut(request.resource().path()) {
            Some(slot) => {
                *slot = bytes;
                Ok(Response::success(request, Body::Empty))
            }
            None => Ok(Response::not_found(request)),
        }
    }

    async fn delete(&self, request: &Request) -> Result<Response, ControllerError> {
        Ok(match self.entries.write().remove(request.resource().path()) {
            Some(_) => Response::success(request, Body::Empty),
            None => Response::not_found(request),
        })
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{ResourceName, StatusCode};

    use super::*;

    fn controller() -> MemoryController {
        MemoryController::new(ControllerName::new("memory").unwrap())
    }

    fn name(value: &str) -> ResourceName {
        ResourceName::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let c = controller();
        c.create(&Request::create(name("mem:greeting"), "hello"))
            .await
            .unwrap();

        let response = c.read(&Request::read(name("mem:greeting"))).await.unwrap();
        assert_eq!(response.status, StatusCode::Success);
        assert!(matches!(response.body, Body::Bytes(b) if &b[..] == b"hello"));
        assert_eq!(c.len(), 1);
    }

    #[tokio::test]
    async fn test_update_requires_existing_entry() {
        let c = controller();
        let response = c
            .update(&Request::update(name("mem:x"), "v"))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NotFound);

        c.insert("x", "old");
        c.update(&Request::update(name("mem:x"), "new"))
            .await
            .unwrap();
        assert_eq!(c.entries.read().get("x").unwrap().as_ref(), b"new");
    }

    #[tokio::test]
    async fn test_delete() {
        let c = controller();
        c.insert("x", "v");
        let first = c.delete(&Request::delete(name("mem:x"))).await.unwrap();
        let second = c.delete(&Request::delete(name("mem:x"))).await.unwrap();
        assert_eq!(first.status, StatusCode::Success);
        assert_eq!(second.status, StatusCode::NotFound);
        assert!(c.is_empty());
    }

    #[tokio::test]
    async fn test_typed_body_is_rejected() {
        let c = controller();
        let err = c
            .create(&Request::create(name("mem:x"), Body::typed(5_u8)))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Backend(_)));
    }
}
