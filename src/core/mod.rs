pub mod config;
pub mod eval_context;
pub mod value;

pub use config::{parse_config, ConfigFormat, EngineConfig, LowerRankSplit};
pub use eval_context::EvalContext;
pub use value::{Matrix, Value};
