//! Prompt types for tender.
//!
//! Response categories produced by the query classifier and the prompt
//! dialects the library is written in.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of response categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    Greeting,
    Thanks,
    Document,
    OutOfScope,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 4] = [
        QueryCategory::Greeting,
        QueryCategory::Thanks,
        QueryCategory::Document,
        QueryCategory::OutOfScope,
    ];

    /// Parse a category name as emitted by classifiers.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "greeting" => Some(Self::Greeting),
            "thanks" => Some(Self::Thanks),
            "document" => Some(Self::Document),
            "out_of_scope" => Some(Self::OutOfScope),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Thanks => "thanks",
            Self::Document => "document",
            Self::OutOfScope => "out_of_scope",
        }
    }

    /// Whether answering this category needs document retrieval.
    pub fn needs_retrieval(&self) -> bool {
        matches!(self, Self::Document)
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt phrasing tuned for a model family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptDialect {
    /// English instructions with worked examples, for instruction-following models
    #[default]
    Instructional,
    /// Terse Korean-only phrasing for small local models
    Native,
}

impl PromptDialect {
    pub const ALL: [PromptDialect; 2] = [PromptDialect::Instructional, PromptDialect::Native];

    /// Parse a dialect name. "gpt" and "gguf" are accepted as aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "instructional" | "gpt" => Some(Self::Instructional),
            "native" | "gguf" => Some(Self::Native),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instructional => "instructional",
            Self::Native => "native",
        }
    }
}

impl fmt::Display for PromptDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parsing() {
        assert_eq!(QueryCategory::parse("greeting"), Some(QueryCategory::Greeting));
        assert_eq!(QueryCategory::parse(" Document "), Some(QueryCategory::Document));
        assert_eq!(QueryCategory::parse("out_of_scope"), Some(QueryCategory::OutOfScope));
        assert_eq!(QueryCategory::parse("weather"), None);
    }

    #[test]
    fn test_category_serde_names() {
        let name = yaml_name(QueryCategory::OutOfScope);
        assert_eq!(name, "out_of_scope");
        for category in QueryCategory::ALL {
            assert_eq!(QueryCategory::parse(category.as_str()), Some(category));
        }
    }

    #[test]
    fn test_only_documents_need_retrieval() {
        assert!(QueryCategory::Document.needs_retrieval());
        assert!(!QueryCategory::Greeting.needs_retrieval());
        assert!(!QueryCategory::Thanks.needs_retrieval());
        assert!(!QueryCategory::OutOfScope.needs_retrieval());
    }

    #[test]
    fn test_dialect_aliases() {
        assert_eq!(PromptDialect::parse("gpt"), Some(PromptDialect::Instructional));
        assert_eq!(PromptDialect::parse("GGUF"), Some(PromptDialect::Native));
        assert_eq!(PromptDialect::parse("native"), Some(PromptDialect::Native));
        assert_eq!(PromptDialect::parse("verbose"), None);
    }

    fn yaml_name(category: QueryCategory) -> String {
        serde_yaml::to_string(&category).unwrap().trim().to_string()
    }
}
