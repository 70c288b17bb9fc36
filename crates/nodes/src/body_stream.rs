//! Materialization of deferred request bodies.

use async_trait::async_trait;
use pipeline::{Body, Method, Next, Node, Request, ResourceError, Response};
use tracing::trace;

/// Runs a [`Body::Deferred`] producer and replaces the body with its bytes
/// before a `Create` or `Update` reaches a controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateBodyStream;

#[async_trait]
impl Node for CreateBodyStream {
    fn name(&self) -> &'static str {
        "create_body_stream"
    }

    async fn invoke(&self, mut request: Request, next: Next<'_>) -> Result<Response, ResourceError> {
        if matches!(request.method, Method::Create | Method::Update) {
            if let Body::Deferred(producer) = &request.body {
                let bytes = producer
                    .produce()
                    .map_err(|e| ResourceError::serialization(request.resource(), e))?;
                trace!(len = bytes.len(), "materialized deferred body");
                request.body = Body::Bytes(bytes);
            }
        }
        next.run(request).await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pipeline::{ResourceName, Terminal};

    use super::*;

    /// Reports the body variant the controller side received.
    struct Inspect;

    #[async_trait]
    impl Terminal for Inspect {
        async fn dispatch(&self, request: Request) -> Result<Response, ResourceError> {
            let kind = match &request.body {
                Body::Bytes(b) => format!("bytes:{}", String::from_utf8_lossy(b)),
                Body::Deferred(_) => "deferred".to_string(),
                _ => "other".to_string(),
            };
            Ok(Response::success(&request, kind))
        }
    }

    fn name() -> ResourceName {
        ResourceName::new("mem:x").unwrap()
    }

    async fn run(request: Request) -> Result<String, ResourceError> {
        let response = CreateBodyStream
            .invoke(request, Next::new(&[], &Inspect))
            .await?;
        Ok(response.body.to_text(Default::default()).unwrap())
    }

    #[tokio::test]
    async fn test_producer_is_materialized_for_create() {
        let body = Body::deferred(|| Ok(Bytes::from_static(b"lazy")));
        let seen = run(Request::create(name(), body)).await.unwrap();
        assert_eq!(seen, "bytes:lazy");
    }

    #[tokio::test]
    async fn test_producer_failure_is_reported() {
        let body = Body::deferred(|| Err("producer exploded".into()));
        let err = run(Request::create(name(), body)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Serialization { .. }));
    }

    #[tokio::test]
    async fn test_other_methods_pass_through() {
        let body = Body::deferred(|| Ok(Bytes::new()));
        let seen = run(Request::delete(name()).with_body(body)).await.unwrap();
        assert_eq!(seen, "deferred");
    }
}
