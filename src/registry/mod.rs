//! Pattern registry: primitive kind name -> match patterns and constructor.
//!
//! Built once per process from the `match_data()` tables each primitive module
//! exports, then only read. Adding a primitive kind means adding its table to
//! [`builtin_patterns`]; nothing in the factory or evaluation path changes.

mod match_pattern;

pub use match_pattern::MatchPattern;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::primitives::primitive::ConstructorFn;
use crate::primitives::{access, file_read, file_write, generic, vsplit};

/// Every built-in pattern, in registration order.
pub fn builtin_patterns() -> Vec<MatchPattern> {
    let mut patterns = Vec::new();
    patterns.extend(access::match_data());
    patterns.extend(generic::match_data());
    patterns.extend(vsplit::match_data());
    patterns.extend(file_write::match_data());
    patterns.extend(file_read::match_data());
    patterns
}

/// Read-only lookup from kind name to its ordered match patterns.
#[derive(Debug)]
pub struct PatternRegistry {
    by_kind: HashMap<String, Vec<MatchPattern>>,
    kinds: Vec<String>,
}

impl PatternRegistry {
    /// Group `patterns` by kind, keeping their order within each kind.
    pub fn from_patterns(patterns: impl IntoIterator<Item = MatchPattern>) -> Self {
        let mut by_kind: HashMap<String, Vec<MatchPattern>> = HashMap::new();
        let mut kinds = Vec::new();
        for pattern in patterns {
            if !by_kind.contains_key(&pattern.kind) {
                kinds.push(pattern.kind.clone());
            }
            by_kind.entry(pattern.kind.clone()).or_default().push(pattern);
        }
        Self { by_kind, kinds }
    }

    /// The process-wide registry of built-in kinds.
    pub fn global() -> Arc<PatternRegistry> {
        static REGISTRY: OnceLock<Arc<PatternRegistry>> = OnceLock::new();
        REGISTRY
            .get_or_init(|| Arc::new(PatternRegistry::from_patterns(builtin_patterns())))
            .clone()
    }

    pub fn find_constructor(&self, kind: &str) -> PrimitiveResult<ConstructorFn> {
        self.by_kind
            .get(kind)
            .and_then(|patterns| patterns.first())
            .map(|p| p.create)
            .ok_or_else(|| PrimitiveError::UnknownKind {
                kind: kind.to_string(),
            })
    }

    pub fn patterns(&self, kind: &str) -> &[MatchPattern] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.by_kind.contains_key(kind)
    }

    /// Kind names in registration order.
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }
}
