use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use pipeline::{
    Body, Controller, ControllerDescriptor, ControllerError, ControllerName, ControllerTag,
    Request, ResourceName, Response,
};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::body_bytes;

/// Physical files under the `file` scheme.
///
/// `file:/abs/path` and `file:///abs/path` address absolute paths. Relative
/// names (no scheme) are resolved against the configured root directory.
pub struct FileController {
    descriptor: ControllerDescriptor,
    root: PathBuf,
}

impl FileController {
    pub fn new(name: ControllerName, root: impl Into<PathBuf>) -> Self {
        let mut descriptor = ControllerDescriptor::new(name)
            .with_scheme("file")
            .with_relative(true);
        if let Some(tag) = ControllerTag::new("disk") {
            descriptor = descriptor.with_tag(tag);
        }
        Self {
            descriptor,
            root: root.into(),
        }
    }

    fn path_of(&self, name: &ResourceName) -> PathBuf {
        if name.is_relative() {
            return self.root.join(name.as_str());
        }
        let path = name.path();
        let path = path.strip_prefix("//").unwrap_or(path);
        PathBuf::from(path)
    }
}

#[async_trait]
impl Controller for FileController {
    fn descriptor(&self) -> &ControllerDescriptor {
        &self.descriptor
    }

    async fn read(&self, request: &Request) -> Result<Response, ControllerError> {
        let path = self.path_of(request.resource());
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Response::success(request, Body::Bytes(contents.into()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Response::not_found(request)),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, request: &Request) -> Result<Response, ControllerError> {
        let bytes = body_bytes(request)?;
        let path = self.path_of(request.resource());
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path.display(), len = bytes.len(), "creating file");
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(Response::success(request, Body::Empty))
    }

    async fn update(&self, request: &Request) -> Result<Response, ControllerError> {
        let bytes = body_bytes(request)?;
        let path = self.path_of(request.resource());
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Response::not_found(request)),
            Err(e) => return Err(e.into()),
        };
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(Response::success(request, Body::Empty))
    }

    async fn delete(&self, request: &Request) -> Result<Response, ControllerError> {
        let path = self.path_of(request.resource());
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(Response::success(request, Body::Empty)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Response::not_found(request)),
            Err(e) => Err(e.into()),
        }
    }
}
