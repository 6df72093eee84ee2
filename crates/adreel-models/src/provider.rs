//! Clip provider identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Image-to-video services the pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Task-queue service (submit task, poll task status)
    Runway,
    /// Generation service (submit generation, poll generation state)
    Luma,
    /// Prediction service (create prediction, poll prediction URL)
    Replicate,
}

impl ProviderKind {
    /// Default priority order.
    pub const ALL: &'static [ProviderKind] = &[
        ProviderKind::Runway,
        ProviderKind::Luma,
        ProviderKind::Replicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Runway => "runway",
            ProviderKind::Luma => "luma",
            ProviderKind::Replicate => "replicate",
        }
    }

    /// Parse a comma-separated priority list, dropping unknown and repeated names.
    pub fn parse_priority(list: &str) -> Vec<ProviderKind> {
        let mut result = Vec::new();
        for name in list.split(',') {
            if let Ok(kind) = name.parse::<ProviderKind>() {
                if !result.contains(&kind) {
                    result.push(kind);
                }
            }
        }
        result
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "runway" => Ok(ProviderKind::Runway),
            "luma" => Ok(ProviderKind::Luma),
            "replicate" => Ok(ProviderKind::Replicate),
            _ => Err(ProviderKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown clip provider: {0}")]
pub struct ProviderKindParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_priority() {
        let order = ProviderKind::parse_priority("luma, runway,unknown,luma");
        assert_eq!(order, vec![ProviderKind::Luma, ProviderKind::Runway]);
    }

    #[test]
    fn test_display_roundtrip() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), *kind);
        }
    }
}
