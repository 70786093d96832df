//! Engine configuration and its text formats.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

/// How `vsplit` treats rank-0 and rank-1 operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowerRankSplit {
    /// Fail with a type mismatch; only matrices can be split.
    #[default]
    Reject,
    /// Treat a vector as a 1xN matrix and a scalar as a 1x1 matrix.
    RowMatrix,
}

/// Supported configuration formats.
#[derive(Debug, Clone, Copy)]
pub enum ConfigFormat {
    Json,
    Toml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of in-process localities the cluster starts.
    pub localities: usize,
    pub lower_rank_split: LowerRankSplit,
    /// Root directory the file sink resolves destinations against.
    pub sink_root: PathBuf,
    /// Bounded message queue length per locality.
    pub mailbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            localities: 1,
            lower_rank_split: LowerRankSplit::Reject,
            sink_root: PathBuf::from("."),
            mailbox_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.localities == 0 {
            return Err(EngineError::InvalidConfig(
                "localities must be at least 1".to_string(),
            ));
        }
        if self.mailbox_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate an [`EngineConfig`].
pub fn parse_config(content: &str, format: ConfigFormat) -> EngineResult<EngineConfig> {
    let config: EngineConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| EngineError::ConfigParse(e.to_string()))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| EngineError::ConfigParse(e.to_string()))?
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_with_defaults() {
        let config = parse_config(
            r#"
localities = 3
lower_rank_split = "row_matrix"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.localities, 3);
        assert_eq!(config.lower_rank_split, LowerRankSplit::RowMatrix);
        assert_eq!(config.mailbox_capacity, 64);
        assert_eq!(config.sink_root, PathBuf::from("."));
    }

    #[test]
    fn test_json_empty_object_is_default() {
        let config = parse_config("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_zero_localities_rejected() {
        let err = parse_config(r#"{"localities": 0}"#, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_bad_policy_is_parse_error() {
        let err = parse_config(r#"lower_rank_split = "column""#, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}
