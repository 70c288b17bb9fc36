use std::collections::BTreeMap;

use async_trait::async_trait;
use pipeline::{
    Body, Capabilities, Controller, ControllerDescriptor, ControllerError, ControllerName,
    ControllerTag, Request, Response,
};

/// Application settings, read-only, served under `settings:<key>`.
pub struct SettingsController {
    descriptor: ControllerDescriptor,
    values: BTreeMap<String, String>,
}

impl SettingsController {
    pub fn new(name: ControllerName, values: BTreeMap<String, String>) -> Self {
        let mut descriptor = ControllerDescriptor::new(name)
            .with_scheme("settings")
            .with_capabilities(Capabilities::READ_ONLY);
        if let Some(tag) = ControllerTag::new("readonly") {
            descriptor = descriptor.with_tag(tag);
        }
        Self { descriptor, values }
    }
}

#[async_trait]
impl Controller for SettingsController {
    fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    async fn read(&self, request: &Request) -> Result<Response, ControllerError> {
        Ok(match self.values.get(request.resource().path()) {
            Some(value) => Response::success(request, Body::Text(value.clone())),
            None => Response::not_found(request),
        })
    }
}

#[cfg(test)]
mod tests {
    use pipeline::{ResourceName, StatusCode};

    use super::*;

    #[tokio::test]
    async fn test_lookup() {
        let values = BTreeMap::from([("mode".to_string(), "fast".to_string())]);
        let c = SettingsController::new(ControllerName::new("settings").unwrap(), values);

        let hit = c
            .read(&Request::read(ResourceName::new("settings:mode").unwrap()))
            .await
            .unwrap();
        assert!(matches!(hit.body, Body::Text(ref t) if t == "fast"));

        let miss = c
            .read(&Request::read(ResourceName::new("settings:other").unwrap()))
            .await
            .unwrap();
        assert_eq!(miss.status, StatusCode::NotFound);
    }
}
