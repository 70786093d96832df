use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{decode, encode, Sink, SinkError};
use crate::core::value::Value;

/// In-process sink holding encoded values; same encoding rules as [`super::FileSink`].
#[derive(Default)]
pub struct MemorySink {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(&self, destination: &str, value: &Value) -> Result<(), SinkError> {
        let bytes = encode(destination, value)?;
        self.entries.write().insert(destination.to_string(), bytes);
        Ok(())
    }

    async fn read(&self, destination: &str) -> Result<Value, SinkError> {
        let bytes = self
            .entries
            .read()
            .get(destination)
            .cloned()
            .ok_or_else(|| SinkError::Unavailable {
                destination: destination.to_string(),
                reason: "no such destination".to_string(),
            })?;
        decode(destination, &bytes)
    }
}
