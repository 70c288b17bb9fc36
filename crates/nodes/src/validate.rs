//! Required-resource validation.

use async_trait::async_trait;
use pipeline::{Method, Next, Node, Request, ResourceError, Response, StatusCode};

/// Turns a not-found read into [`ResourceError::ResourceNotFound`] when the
/// request is marked required.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateRequiredResource;

#[async_trait]
impl Node for ValidateRequiredResource {
    fn name(&self) -> &'static str {
        "validate_required_resource"
    }

    async fn invoke(&self, request: Request, next: Next<'_>) -> Result<Response, ResourceError> {
        let required = request.method == Method::Read && request.required;
        let response = next.run(request).await?;
        if required && response.status == StatusCode::NotFound {
            return Err(ResourceError::ResourceNotFound {
                name: response.name,
            });
        }
        Ok(response)
    }
}
