//! # xtree: execution-tree core for distributed array computation
//!
//! `xtree` evaluates programs represented as trees of primitive instances
//! placed across a set of localities. It provides:
//!
//! - **Primitive contract**: one async [`Primitive::eval`] operation shared by
//!   every node kind, with operands evaluated concurrently.
//! - **Location transparency**: nodes are referenced through
//!   [`PrimitiveHandle`]s; a call to a node on another locality is a message
//!   to that locality's worker.
//! - **Rank-polymorphic kernels**: `generic` applies a named elementwise
//!   function to scalars, vectors or matrices via per-rank kernel tables.
//! - **Row splitting**: `vsplit` cuts a matrix into row blocks by section
//!   count or explicit indices.
//! - **Sinks**: `file_write` / `file_read` persist values through a pluggable
//!   [`Sink`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xtree::{Cluster, EngineConfig, Matrix, Operand, TreeBuilder, Value};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cluster = Cluster::from_config(EngineConfig::default()).unwrap();
//!     let here = cluster.here();
//!     let m = Matrix::from_rows(vec![vec![4.0, 9.0], vec![16.0, 25.0]]).unwrap();
//!
//!     let mut builder = TreeBuilder::new(&cluster);
//!     let root = builder
//!         .node(here, "sqrt", vec![Operand::Literal(Value::from(m))])
//!         .await
//!         .unwrap();
//!     let tree = builder.finish(root);
//!     println!("{}", tree.eval(&[]).await.unwrap());
//! }
//! ```

pub mod cluster;
pub mod core;
pub mod error;
pub mod primitives;
pub mod registry;
pub mod sink;

pub use crate::cluster::{
    Cluster, ExecutionTree, InstanceId, LocalityId, PrimitiveHandle, Substrate, TreeBuilder,
};
pub use crate::core::{
    parse_config, ConfigFormat, EngineConfig, EvalContext, LowerRankSplit, Matrix, Value,
};
pub use crate::error::{
    EngineError, EngineResult, ErrorCode, ErrorContext, PrimitiveError, PrimitiveResult,
};
pub use crate::primitives::{CtorArgs, Operand, Primitive, PrimitiveMeta};
pub use crate::registry::{MatchPattern, PatternRegistry};
pub use crate::sink::{FileSink, MemorySink, Sink, SinkError};
