//! Execution-tree primitives.
//!
//! [`Primitive`] is the contract every node implements; the submodules hold
//! the concrete kinds and the per-kind match patterns they register.

pub mod access;
pub mod file_read;
pub mod file_write;
pub mod generic;
pub mod kernels;
pub mod primitive;
pub mod vsplit;

pub use access::{Argument, Variable};
pub use file_read::FileRead;
pub use file_write::{create_file_write, FileWrite};
pub use generic::{create_generic_operation, GenericOperation};
pub use kernels::KernelTables;
pub use primitive::{
    evaluate_operands, ConstructorFn, CtorArgs, Operand, Primitive, PrimitiveEnv, PrimitiveMeta,
};
pub use vsplit::{create_vsplit_operation, VSplitOperation};

#[cfg(test)]
pub(crate) fn test_env() -> PrimitiveEnv {
    PrimitiveEnv::new(
        crate::core::config::EngineConfig::default(),
        std::sync::Arc::new(crate::sink::MemorySink::new()),
    )
}
