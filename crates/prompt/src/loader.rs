//! Prompt pack loader.
//!
//! A prompt pack is a YAML file mapping dialect names to category prompts:
//!
//! ```yaml
//! native:
//!   greeting: "..."
//!   thanks: "..."
//!   document: "..."
//!   out_of_scope: "..."
//! ```
//!
//! Each dialect listed must define all four categories, so a pack can never
//! leave one dialect with a smaller category set than the other.

use crate::library::PromptLibrary;
use crate::types::{PromptDialect, QueryCategory};
use std::collections::BTreeMap;
use std::path::Path;
use tender_core::{AppError, AppResult};

type RawPack = BTreeMap<String, BTreeMap<String, String>>;

/// Load a prompt pack from `path` and overlay it on the built-in prompts.
///
/// # Example
/// ```no_run
/// use tender_prompt::load_prompt_pack;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = load_prompt_pack(Path::new("prompts.yaml"))?;
/// # Ok(())
/// # }
/// ```
pub fn load_prompt_pack(path: &Path) -> AppResult<PromptLibrary> {
    tracing::debug!("Loading prompt pack from: {:?}", path);

    if !path.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt pack not found: {:?}",
            path
        )));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Prompt(format!("Failed to read prompt pack {:?}: {}", path, e))
    })?;

    let library = parse_prompt_pack(&contents, PromptLibrary::builtin())
        .map_err(|e| AppError::Prompt(format!("Invalid prompt pack {:?}: {}", path, e)))?;

    tracing::info!("Loaded prompt pack: {:?}", path);
    Ok(library)
}

/// Parse pack YAML and apply it on top of `base`.
pub fn parse_prompt_pack(contents: &str, mut base: PromptLibrary) -> AppResult<PromptLibrary> {
    let raw: RawPack = serde_yaml::from_str(contents)?;

    for (dialect_name, entries) in &raw {
        let dialect = PromptDialect::parse(dialect_name)
            .ok_or_else(|| AppError::Prompt(format!("unknown dialect '{}'", dialect_name)))?;

        for category_name in entries.keys() {
            if QueryCategory::parse(category_name).is_none() {
                return Err(AppError::UnknownCategory {
                    category: category_name.clone(),
                    dialect: dialect.to_string(),
                });
            }
        }

        let missing: Vec<&str> = QueryCategory::ALL
            .iter()
            .filter(|c| !entries.keys().any(|k| QueryCategory::parse(k) == Some(**c)))
            .map(|c| c.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Prompt(format!(
                "dialect '{}' is missing categories: {}",
                dialect,
                missing.join(", ")
            )));
        }

        for (category_name, text) in entries {
            if text.trim().is_empty() {
                return Err(AppError::Prompt(format!(
                    "empty prompt for {}/{}",
                    dialect, category_name
                )));
            }
            if let Some(category) = QueryCategory::parse(category_name) {
                base.set_prompt(category, dialect, text.clone());
            }
        }
    }

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tender_core::ErrorKind;

    const FULL_NATIVE: &str = r#"
native:
  greeting: "인사하세요."
  thanks: "감사에 답하세요."
  document: "문서로만 답하세요."
  out_of_scope: "정중히 거절하세요."
"#;

    #[test]
    fn test_pack_overlays_dialect() {
        let library = parse_prompt_pack(FULL_NATIVE, PromptLibrary::builtin()).unwrap();

        assert_eq!(
            library.prompt(QueryCategory::Document, PromptDialect::Native),
            "문서로만 답하세요."
        );
        // Untouched dialect keeps built-ins
        assert!(library
            .prompt(QueryCategory::Document, PromptDialect::Instructional)
            .contains("Instructions:"));
    }

    #[test]
    fn test_pack_missing_category_rejected() {
        let yaml = "gpt:\n  greeting: hi\n  thanks: thanks\n";
        let err = parse_prompt_pack(yaml, PromptLibrary::builtin()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Prompt);
        assert!(err.to_string().contains("document"));
        assert!(err.to_string().contains("out_of_scope"));
    }

    #[test]
    fn test_pack_unknown_category_rejected() {
        let yaml = format!("{}  weather: \"날씨\"\n", FULL_NATIVE);
        let err = parse_prompt_pack(&yaml, PromptLibrary::builtin()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCategory);
    }

    #[test]
    fn test_pack_unknown_dialect_rejected() {
        let yaml = "klingon:\n  greeting: nuqneH\n";
        assert!(parse_prompt_pack(yaml, PromptLibrary::builtin()).is_err());
    }

    #[test]
    fn test_load_prompt_pack_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", FULL_NATIVE).unwrap();

        let library = load_prompt_pack(file.path()).unwrap();
        assert_eq!(
            library.prompt(QueryCategory::Greeting, PromptDialect::Native),
            "인사하세요."
        );
    }

    #[test]
    fn test_load_missing_pack() {
        let result = load_prompt_pack(Path::new("/nonexistent/prompts.yaml"));
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }
}
