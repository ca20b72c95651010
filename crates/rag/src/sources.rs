//! Source normalization and usage estimates.

use crate::types::{RetrievedDocument, SourceRecord, TokenUsage};

/// Placeholder for a missing filename or organization.
pub const NOT_AVAILABLE: &str = "N/A";

/// Convert retrieved documents to caller-facing sources, preserving order.
///
/// The reported score follows the document's retrieval mode: rerank, then
/// hybrid, then embedding relevance, otherwise `unknown` with score 0.
pub fn normalize_sources(documents: &[RetrievedDocument]) -> Vec<SourceRecord> {
    documents
        .iter()
        .map(|doc| SourceRecord {
            content: doc.content.clone(),
            metadata: doc.metadata.clone(),
            filename: doc
                .filename
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            organization: doc
                .organization
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            score: doc.score.value(),
            score_type: doc.score.score_type(),
        })
        .collect()
}

/// Rough token estimate: two tokens per whitespace-separated word.
pub fn estimate_usage(query: &str, answer: &str) -> TokenUsage {
    let prompt_tokens = query.split_whitespace().count() * 2;
    let completion_tokens = answer.split_whitespace().count() * 2;
    TokenUsage::new(prompt_tokens, completion_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RetrievalScore, ScoreType};
    use serde_json::json;

    #[test]
    fn test_score_priority() {
        let docs: Vec<RetrievedDocument> = serde_json::from_value(json!([
            {"content": "a", "rerank_score": 0.9, "hybrid_score": 0.3},
            {"content": "b", "hybrid_score": 0.4, "relevance_score": 0.8},
            {"content": "c", "relevance_score": 0.8},
            {"content": "d"}
        ]))
        .unwrap();

        let sources = normalize_sources(&docs);
        let types: Vec<ScoreType> = sources.iter().map(|s| s.score_type).collect();
        assert_eq!(
            types,
            vec![
                ScoreType::Rerank,
                ScoreType::Hybrid,
                ScoreType::Embedding,
                ScoreType::Unknown
            ]
        );
        assert_eq!(sources[0].score, 0.9);
        assert_eq!(sources[1].score, 0.4);
        assert_eq!(sources[3].score, 0.0);
    }

    #[test]
    fn test_missing_names_default() {
        let doc = RetrievedDocument::new("x", RetrievalScore::Unscored).with_filename("rfp.hwp");
        let sources = normalize_sources(&[doc]);
        assert_eq!(sources[0].filename, "rfp.hwp");
        assert_eq!(sources[0].organization, NOT_AVAILABLE);
    }

    #[test]
    fn test_score_type_serializes_lowercase() {
        let doc = RetrievedDocument::new("x", RetrievalScore::Hybrid { hybrid: 0.5 });
        let value = serde_json::to_value(&normalize_sources(&[doc])[0]).unwrap();
        assert_eq!(value["score_type"], "hybrid");
    }

    #[test]
    fn test_estimate_usage_doubles_words() {
        let usage = estimate_usage("예산은 얼마인가요?", "5억원 입니다 .");
        assert_eq!(usage.prompt_tokens, 4);
        assert_eq!(usage.completion_tokens, 6);
        assert_eq!(usage.total_tokens, 10);
        assert_eq!(estimate_usage("", "").total_tokens, 0);
    }
}
