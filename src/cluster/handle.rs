use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a locality (a processing node) in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalityId(pub u32);

impl fmt::Display for LocalityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "locality#{}", self.0)
    }
}

/// Identifies a primitive instance; unique across the whole cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// Location-transparent reference to a constructed primitive.
///
/// A plain value: copying it never touches the instance, and all calls go
/// through the substrate as messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimitiveHandle {
    pub locality: LocalityId,
    pub instance: InstanceId,
}

impl PrimitiveHandle {
    pub fn new(locality: LocalityId, instance: InstanceId) -> Self {
        Self { locality, instance }
    }
}

impl fmt::Display for PrimitiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.locality.0, self.instance.0)
    }
}
