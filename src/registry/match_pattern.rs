use std::fmt;

use crate::primitives::primitive::ConstructorFn;

/// A syntactic form the frontend recognizes, paired with the constructor it maps to.
#[derive(Clone)]
pub struct MatchPattern {
    pub kind: String,
    pub pattern: String,
    pub create: ConstructorFn,
}

impl MatchPattern {
    pub fn new(kind: impl Into<String>, pattern: impl Into<String>, create: ConstructorFn) -> Self {
        Self {
            kind: kind.into(),
            pattern: pattern.into(),
            create,
        }
    }
}

impl fmt::Debug for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchPattern")
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}
