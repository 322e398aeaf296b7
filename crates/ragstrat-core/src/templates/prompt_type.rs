//! Question categories used to pick Hyde templates

use crate::error::RagStratError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which template family a question is answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    General,
    Technical,
    Business,
    Academic,
    /// Fallback for anything unrecognized
    #[default]
    Enhanced,
}

/// Labels a classifier may answer with, English tags first
const LABELS: &[(&str, PromptType)] = &[
    ("technical", PromptType::Technical),
    ("business", PromptType::Business),
    ("academic", PromptType::Academic),
    ("enhanced", PromptType::Enhanced),
    ("general", PromptType::General),
    ("技术", PromptType::Technical),
    ("商业", PromptType::Business),
    ("学术", PromptType::Academic),
    ("通用", PromptType::Enhanced),
];

impl PromptType {
    pub const ALL: [PromptType; 5] = [
        PromptType::General,
        PromptType::Technical,
        PromptType::Business,
        PromptType::Academic,
        PromptType::Enhanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptType::General => "general",
            PromptType::Technical => "technical",
            PromptType::Business => "business",
            PromptType::Academic => "academic",
            PromptType::Enhanced => "enhanced",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PromptType::General => "通用prompt，适用于大多数问题",
            PromptType::Technical => "技术类prompt，适用于编程、算法、系统架构等技术问题",
            PromptType::Business => "商业类prompt，适用于市场、管理、策略等商业问题",
            PromptType::Academic => "学术类prompt，适用于研究、理论、实验等学术问题",
            PromptType::Enhanced => "增强版prompt，包含更详细的引导信息",
        }
    }

    /// Map free classifier output onto a type; never fails
    ///
    /// Exact tags win, then the earliest known label inside the text
    /// (handles "分类结果：technical"), then [`PromptType::Enhanced`].
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_lowercase();
        if let Ok(exact) = normalized.parse() {
            return exact;
        }

        LABELS
            .iter()
            .filter_map(|(name, ty)| normalized.find(name).map(|pos| (pos, *ty)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, ty)| ty)
            .unwrap_or_default()
    }
}

impl fmt::Display for PromptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptType {
    type Err = RagStratError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RagStratError::InvalidInput(format!("Unknown prompt type: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_exact() {
        assert_eq!(PromptType::from_label("technical"), PromptType::Technical);
        assert_eq!(PromptType::from_label("  Business\n"), PromptType::Business);
        assert_eq!(PromptType::from_label("general"), PromptType::General);
    }

    #[test]
    fn test_from_label_embedded() {
        assert_eq!(
            PromptType::from_label("分类结果：academic\n分类理由：研究方法"),
            PromptType::Academic
        );
        assert_eq!(PromptType::from_label("这是技术类问题"), PromptType::Technical);
    }

    #[test]
    fn test_from_label_unknown_falls_back() {
        assert_eq!(PromptType::from_label("medical"), PromptType::Enhanced);
        assert_eq!(PromptType::from_label(""), PromptType::Enhanced);
    }

    #[test]
    fn test_from_str_is_strict() {
        assert!("medical".parse::<PromptType>().is_err());
        assert_eq!("academic".parse::<PromptType>().unwrap(), PromptType::Academic);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PromptType::Technical).unwrap();
        assert_eq!(json, "\"technical\"");
        let parsed: PromptType = serde_json::from_str("\"enhanced\"").unwrap();
        assert_eq!(parsed, PromptType::Enhanced);
    }
}
