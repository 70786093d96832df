use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::{decode, encode, Sink, SinkError};
use crate::core::value::Value;

/// Stores each destination as a JSON file under a root directory.
///
/// Destinations are relative paths confined to the root: absolute paths and
/// `..` segments are refused.
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, destination: &str) -> Result<PathBuf, SinkError> {
        let relative = Path::new(destination);
        if destination.is_empty() {
            return Err(refused(destination, "empty destination"));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(refused(destination, "'..' escapes the sink root"))
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(refused(destination, "absolute paths are not allowed"))
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

fn refused(destination: &str, reason: &str) -> SinkError {
    tracing::warn!(destination, reason, "destination refused");
    SinkError::Unavailable {
        destination: destination.to_string(),
        reason: reason.to_string(),
    }
}

fn unavailable(destination: &str, e: std::io::Error) -> SinkError {
    SinkError::Unavailable {
        destination: destination.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn write(&self, destination: &str, value: &Value) -> Result<(), SinkError> {
        let path = self.path_for(destination)?;
        let bytes = encode(destination, value)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| unavailable(destination, e))
    }

    async fn read(&self, destination: &str) -> Result<Value, SinkError> {
        let path = self.path_for(destination)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| unavailable(destination, e))?;
        decode(destination, &bytes)
    }
}
