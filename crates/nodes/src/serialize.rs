//! JSON (de)serialization of structured bodies.

use std::marker::PhantomData;

use async_trait::async_trait;
use pipeline::{Body, BodyType, Next, Node, Request, ResourceError, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

/// Encodes `T` request bodies to JSON and decodes JSON responses into `T`.
///
/// Before delegating, a [`Body::Typed`] request body holding a `T` becomes
/// [`Body::Bytes`]. After delegating, if the request declared
/// [`Request::expecting::<T>`](Request::expecting), a byte or text response
/// body becomes a [`Body::Typed`] `T`. Bodies of other types pass through, so
/// several instances for different `T` can share a pipeline.
///
/// JSON text is converted to and from bytes with the request's
/// [`pipeline::Encoding`].
pub struct SerializeJson<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerializeJson<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerializeJson<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Node for SerializeJson<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "serialize_json"
    }

    async fn invoke(&self, mut request: Request, next: Next<'_>) -> Result<Response, ResourceError> {
        let encoding = request.encoding;
        let encoded = match request.body.downcast_ref::<T>() {
            Some(value) => Some(
                serde_json::to_string(value)
                    .map(|json| encoding.encode(&json))
                    .map_err(|e| ResourceError::serialization(request.resource(), e))?,
            ),
            None => None,
        };
        if let Some(bytes) = encoded {
            trace!(len = bytes.len(), "encoded request body");
            request.body = Body::Bytes(bytes);
        }

        let decode = request.expects == Some(BodyType::of::<T>());
        let mut response = next.run(request).await?;
        if !decode || !response.exists() {
            return Ok(response);
        }

        let decoded: Option<T> = match &response.body {
            Body::Bytes(bytes) => {
                let text = encoding
                    .decode(bytes)
                    .map_err(|e| ResourceError::serialization(&response.name, e))?;
                Some(
                    serde_json::from_str(&text)
                        .map_err(|e| ResourceError::serialization(&response.name, e))?,
                )
            }
            Body::Text(text) => Some(
                serde_json::from_str(text)
                    .map_err(|e| ResourceError::serialization(&response.name, e))?,
            ),
            _ => None,
        };
        if let Some(value) = decoded {
            response.body = Body::typed(value);
        }
        Ok(response)
    }
}
